use meadow_core::diagnostics::{self, DiagnosticKind};
use meadow_sfc::{AstNode, ForAlias, ParseError, Segment, parse_template};

#[test]
fn parse_element_with_text() {
    let ast = parse_template("<div>hi</div>", "App").unwrap();
    let root = ast.root_element().unwrap();
    assert_eq!(root.tag, "div");
    assert!(root.is_root);
    assert!(root.is_html_tag);
    assert_eq!(root.children.len(), 1);
    assert!(matches!(ast.node(root.children[0]), Some(AstNode::Static(t)) if t.content == "hi"));
}

#[test]
fn parse_text_and_interpolation() {
    let ast = parse_template("<p>Hello {{ name }}!</p>", "App").unwrap();
    let root = ast.root_element().unwrap();
    match ast.node(root.children[0]) {
        Some(AstNode::Interpolated(t)) => {
            assert_eq!(
                t.interpolation.segments,
                vec![
                    Segment::Literal("Hello ".into()),
                    Segment::Expr("name".into()),
                    Segment::Literal("!".into()),
                ]
            );
            assert_eq!(t.content, "Hello {{ name }}!");
        }
        other => panic!("expected interpolation, got {other:?}"),
    }
}

#[test]
fn attributes_and_directives_are_separated() {
    let ast = parse_template(
        r#"<input class="x" :value="count" @input="onInput" ::title="t" v-show="ok"/>"#,
        "App",
    )
    .unwrap();
    let root = ast.root_element().unwrap();
    assert_eq!(root.attrs.get("class").map(String::as_str), Some("x"));
    let keys: Vec<_> = root.directives.iter().map(|d| d.key.as_str()).collect();
    assert_eq!(keys, vec!["v-bind:value", "v-on:input", "v-bind:title", "v-show"]);
    assert!(root.children.is_empty());
}

#[test]
fn void_and_self_closing_tags_take_no_children() {
    let ast = parse_template("<div><br><img src=a.png><span/>text</div>", "App").unwrap();
    let root = ast.root_element().unwrap();
    assert_eq!(root.children.len(), 4);
    let br = ast.element(root.children[0]).unwrap();
    assert!(br.is_void && br.children.is_empty());
    let img = ast.element(root.children[1]).unwrap();
    assert_eq!(img.attrs.get("src").map(String::as_str), Some("a.png"));
    let span = ast.element(root.children[2]).unwrap();
    assert_eq!(span.parent, Some(ast.root()));
}

#[test]
fn comments_and_doctype_are_stripped() {
    let ast = parse_template(
        "<!DOCTYPE html><!-- lead --><ul><!-- inner --><li>a</li><![if IE]></ul>",
        "App",
    )
    .unwrap();
    let root = ast.root_element().unwrap();
    assert_eq!(root.tag, "ul");
    assert_eq!(root.children.len(), 1);
}

#[test]
fn v_for_header_is_parsed() {
    let ast = parse_template(
        r#"<ul><li v-for="(item, i) of list.items">{{ item }}</li></ul>"#,
        "App",
    )
    .unwrap();
    let li = ast.element(ast.children(ast.root())[0]).unwrap();
    assert!(li.is_for());
    let args = li.for_args.as_ref().unwrap();
    assert_eq!(args.alias, ForAlias::Pair("item".into(), "i".into()));
    assert_eq!(args.source, "list.items");
    {
        let _suspended = li.suspend_for();
        assert!(!li.is_for());
    }
    assert!(li.is_for());
}

#[test]
fn malformed_v_for_is_dropped_with_a_diagnostic() {
    diagnostics::clear();
    let ast = parse_template(r#"<ul><li v-for="item list">x</li></ul>"#, "App").unwrap();
    let li = ast.element(ast.children(ast.root())[0]).unwrap();
    assert!(!li.is_for());
    assert!(li.directives.is_empty());
    let reported = diagnostics::take();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].kind, DiagnosticKind::Parse);
    assert_eq!(reported[0].directive.as_deref(), Some("v-for"));
}

#[test]
fn multiple_roots_keep_the_first() {
    diagnostics::clear();
    let ast = parse_template("<div>a</div><p>b</p><span>c</span>", "App").unwrap();
    assert_eq!(ast.root_element().unwrap().tag, "div");
    assert_eq!(ast.len(), 2);
    let reported = diagnostics::take();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].kind, DiagnosticKind::Template);
}

#[test]
fn stray_closing_tags_are_ignored() {
    let ast = parse_template("<div>a</span>b</div>", "App").unwrap();
    assert_eq!(ast.children(ast.root()).len(), 2);
}

#[test]
fn missing_end_tag_fails() {
    let err = parse_template("<div><span>text</div>", "App").unwrap_err();
    assert!(matches!(err, ParseError::MissingEndTag { ref tag, .. } if tag == "span"));

    let err = parse_template("<div><p>open", "App").unwrap_err();
    assert!(matches!(err, ParseError::MissingEndTag { ref tag, .. } if tag == "p"));
}

#[test]
fn unclosed_trailing_root_is_discarded() {
    diagnostics::clear();
    let ast = parse_template("<div><p>x</p></div><p>unclosed", "App").unwrap();
    assert_eq!(ast.outline(), "<div>\n  <p>\n    \"x\"\n");
    let reported = diagnostics::take();
    assert!(reported.iter().any(|d| d.kind == DiagnosticKind::Parse && d.message.contains("<p>")));
    assert!(reported.iter().any(|d| d.kind == DiagnosticKind::Template));
}

#[test]
fn empty_and_rootless_templates_fail() {
    assert!(matches!(parse_template("   ", "App"), Err(ParseError::Empty { .. })));
    assert!(matches!(
        parse_template("just text", "App"),
        Err(ParseError::NoRoot { .. })
    ));
}

#[test]
fn attribute_entities_are_decoded() {
    let ast = parse_template(r#"<div title="a &lt;b&gt; &quot;c&quot;"></div>"#, "App").unwrap();
    assert_eq!(
        ast.root_element().unwrap().attrs.get("title").map(String::as_str),
        Some("a <b> \"c\"")
    );
}

#[test]
fn components_and_svg_are_classified() {
    let ast = parse_template("<div><TodoItem/><svg><rect/></svg></div>", "App").unwrap();
    let kids = ast.children(ast.root());
    let todo = ast.element(kids[0]).unwrap();
    assert!(!todo.is_reserved());
    let svg = ast.element(kids[1]).unwrap();
    assert!(svg.is_svg_tag);
}

#[test]
fn outline_lists_every_node() {
    let ast = parse_template(r#"<div id="a" v-if="ok"><b>x</b>{{ y }}</div>"#, "App").unwrap();
    let outline = ast.outline();
    assert_eq!(
        outline,
        "<div id=\"a\"> [v-if=\"ok\"]\n  <b>\n    \"x\"\n  {{ _s(y) }}\n"
    );
}
