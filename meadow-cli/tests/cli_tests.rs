use meadow_cli::{load_source, parse_cmd, render_cmd};
use meadow_core::diagnostics::DiagnosticKind;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

#[test]
fn mdw_blocks_are_split() {
    let source = load_source(&fixture("counter.mdw")).unwrap();
    assert_eq!(source.name, "counter");
    assert!(source.template.trim().starts_with("<div class=\"counter\">"));
    assert_eq!(source.state.unwrap()["title"], "Clicks");
}

#[test]
fn plain_files_are_whole_templates() {
    let source = load_source(&fixture("greeting.html")).unwrap();
    assert_eq!(source.name, "greeting");
    assert_eq!(source.template.trim(), "<p class=\"greet\">Hello {{ name }}</p>");
    assert!(source.state.is_none());
}

#[test]
fn parse_prints_outline() {
    let (outline, diagnostics) = parse_cmd(&fixture("counter.mdw")).unwrap();
    assert!(outline.starts_with("<div class=\"counter\">\n"));
    assert!(outline.contains("  <p> [v-if=\"count > 0\"]\n"));
    assert!(outline.contains("_s(item)"));
    assert!(diagnostics.is_empty());
}

#[test]
fn render_uses_state_block() {
    let rendered = render_cmd(&fixture("counter.mdw"), None, None).unwrap();
    assert_eq!(
        rendered.html,
        "<div class=\"counter\"><h1>Clicks</h1><p>Count: 2</p><ul><li>a</li><li>b</li></ul></div>"
    );
    assert!(rendered.diagnostics.is_empty());
}

#[test]
fn render_with_state_file() {
    let rendered =
        render_cmd(&fixture("greeting.html"), Some(&fixture("greeting.json")), None).unwrap();
    assert_eq!(rendered.html, "<p class=\"greet\">Hello Ann</p>");
}

#[test]
fn missing_state_is_reported_not_fatal() {
    let rendered = render_cmd(&fixture("greeting.html"), None, None).unwrap();
    assert!(rendered.html.starts_with("<p class=\"greet\">"));
    assert!(rendered
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::Expression && d.component == "greeting"));
}

#[test]
fn config_file_caps_loops() {
    let rendered =
        render_cmd(&fixture("counter.mdw"), None, Some(&fixture("limit.toml"))).unwrap();
    meadow_core::config::install(meadow_core::RuntimeConfig::default()).unwrap();
    assert!(rendered.html.ends_with("<ul><li>a</li></ul></div>"));
    assert!(rendered.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Directive));
}

#[test]
fn invalid_inputs_fail() {
    assert!(render_cmd(&fixture("counter.mdw"), None, Some(&fixture("zero.toml"))).is_err());
    assert!(render_cmd(&fixture("greeting.html"), Some(&fixture("list.json")), None).is_err());
    let err = render_cmd(&fixture("nope.html"), None, None).unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}
