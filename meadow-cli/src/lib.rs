use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use meadow_core::diagnostics::{self, Diagnostic};
use meadow_core::{RuntimeConfig, Value, config, scheduler};
use meadow_dom::Document;
use meadow_runtime::{Component, ComponentDef, mount};

/// A template read from disk: either a bare template file or the blocks of
/// a `.mdw` single-file component.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub name: String,
    pub template: String,
    pub state: Option<serde_json::Value>,
}

/// Read `input`. `.mdw` files are split into blocks and their `<state>`
/// block parsed as JSON; anything else is taken as template text.
pub fn load_source(input: &Path) -> Result<Source> {
    let src =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;
    let name = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("component")
        .to_string();

    if input.extension().and_then(|e| e.to_str()) != Some("mdw") {
        return Ok(Source {
            name,
            template: src,
            state: None,
        });
    }

    let sfc = meadow_sfc::parse_sfc(&src).map_err(|e| anyhow::anyhow!(e))?;
    let template = sfc.template.map(|t| t.content).unwrap_or_default();
    let state = match sfc.state {
        Some(block) if !block.content.trim().is_empty() => Some(
            serde_json::from_str(&block.content)
                .with_context(|| format!("invalid <state> JSON in {}", input.display()))?,
        ),
        _ => None,
    };
    Ok(Source {
        name,
        template,
        state,
    })
}

/// Read a TOML runtime config; missing keys keep their defaults.
pub fn load_config(path: &Path) -> Result<RuntimeConfig> {
    let txt =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: RuntimeConfig =
        toml::from_str(&txt).with_context(|| format!("invalid config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// `meadow parse`: the template's AST outline.
pub fn parse_cmd(input: &Path) -> Result<(String, Vec<Diagnostic>)> {
    let source = load_source(input)?;
    diagnostics::clear();
    let ast = meadow_sfc::parse_template(&source.template, &source.name)
        .map_err(|e| anyhow::anyhow!(e))?;
    Ok((ast.outline(), diagnostics::take()))
}

/// Output of `meadow render`.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub html: String,
    pub diagnostics: Vec<Diagnostic>,
}

struct FileComponent {
    template: String,
    state: Value,
}

impl Component for FileComponent {
    fn template(&self) -> String {
        self.template.clone()
    }

    fn initial_state(&self, _props: &Value) -> Value {
        self.state.clone()
    }
}

/// `meadow render`: mount the template with its initial state into an empty
/// document and serialise the result. A `--state` file overrides the
/// `<state>` block.
pub fn render_cmd(input: &Path, state: Option<&Path>, config_path: Option<&Path>) -> Result<Rendered> {
    if let Some(path) = config_path {
        config::install(load_config(path)?)?;
    }
    let source = load_source(input)?;
    let state = match state {
        Some(path) => {
            let txt = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&txt).with_context(|| format!("invalid JSON in {}", path.display()))?
        }
        None => source.state.clone().unwrap_or_else(|| serde_json::json!({})),
    };
    if !state.is_object() {
        bail!("initial state must be a JSON object");
    }

    diagnostics::clear();
    let def = ComponentDef::stateful(
        source.name.clone(),
        FileComponent {
            template: source.template,
            state: state.into(),
        },
    );
    let doc = Document::shared();
    let body = doc.borrow().body();
    let cx = mount(&doc, body, def).with_context(|| format!("failed to render {}", input.display()))?;
    scheduler::run_microtasks();
    let html = cx.html().unwrap_or_default();
    tracing::debug!(component = %source.name, bytes = html.len(), "rendered");
    Ok(Rendered {
        html,
        diagnostics: diagnostics::take(),
    })
}
