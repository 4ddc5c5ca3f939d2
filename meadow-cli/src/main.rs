use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meadow", version, about = "Meadow template tools")]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the parsed template tree.
    Parse {
        /// Template or .mdw component file
        file: PathBuf,
    },
    /// Render a template to HTML on stdout.
    Render {
        /// Template or .mdw component file
        file: PathBuf,
        /// JSON file with the initial state
        #[arg(long)]
        state: Option<PathBuf>,
        /// TOML runtime config
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse { file } => {
            let (outline, diagnostics) = meadow_cli::parse_cmd(&file)?;
            print!("{outline}");
            for d in diagnostics {
                eprintln!("{d}");
            }
        }
        Commands::Render { file, state, config } => {
            let rendered = meadow_cli::render_cmd(&file, state.as_deref(), config.as_deref())?;
            println!("{}", rendered.html);
            for d in rendered.diagnostics {
                eprintln!("{d}");
            }
        }
    }
    Ok(())
}
