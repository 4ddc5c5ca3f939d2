use meadow_core::diagnostics::{self, DiagnosticKind};
use meadow_core::{RuntimeConfig, Value, config, scope};
use meadow_dom::{Document, NodeId};
use meadow_runtime::{Component, ComponentDef, Context, VNodeConfig, directive, mount, unregister};
use serde_json::json;

struct Page {
    template: &'static str,
    state: serde_json::Value,
}

impl Component for Page {
    fn template(&self) -> String {
        self.template.to_string()
    }

    fn initial_state(&self, _props: &Value) -> Value {
        self.state.clone().into()
    }
}

fn page(template: &'static str, state: serde_json::Value) -> ComponentDef {
    ComponentDef::stateful("App", Page { template, state })
}

fn render(template: &'static str, state: serde_json::Value) -> String {
    let doc = Document::shared();
    let body = doc.borrow().body();
    let cx = mount(&doc, body, page(template, state)).unwrap();
    cx.html().unwrap()
}

fn keys(conf: &VNodeConfig) -> Vec<String> {
    conf.as_element()
        .unwrap()
        .live_children()
        .filter_map(|c| c.as_element())
        .map(|el| el.attrs["key"].to_display())
        .collect()
}

#[test]
fn interpolation_keeps_trailing_literal() {
    assert_eq!(render("<p>A {{x}} B</p>", json!({ "x": 1 })), "<p>A 1 B</p>");
    assert_eq!(
        render("<p>{{ user.name }} has {{ items.length }} items</p>", json!({ "user": { "name": "Ann" }, "items": [1, 2] })),
        "<p>Ann has 2 items</p>"
    );
}

#[test]
fn false_condition_leaves_tombstone_and_skips_children() {
    diagnostics::clear();
    let cx = Context::new(
        page("<ul><li>a</li><li v-if=\"show\">{{ missing.prop }}</li><li>c</li></ul>", json!({ "show": false })),
        Value::object(),
    );
    let conf = cx.compile().unwrap();
    let root = conf.as_element().unwrap();
    assert_eq!(root.children.len(), 3);
    assert!(root.children[1].live().is_none());
    assert_eq!(root.live_children().count(), 2);
    assert!(diagnostics::take().iter().all(|d| d.kind != DiagnosticKind::Expression));

    let shown = Context::new(
        page("<ul><li>a</li><li v-if=\"show\">b</li><li>c</li></ul>", json!({ "show": true })),
        Value::object(),
    );
    assert_eq!(shown.compile().unwrap().as_element().unwrap().live_children().count(), 3);
}

#[test]
fn loop_keys_are_stable_across_compiles() {
    let cx = Context::new(
        page("<ul><li v-for=\"item of items\">{{ item }}</li></ul>", json!({ "items": ["a", "b", "c"] })),
        Value::object(),
    );
    let first = keys(&cx.compile().unwrap());
    assert_eq!(first, ["App_0", "App_1", "App_2"]);
    assert_eq!(keys(&cx.compile().unwrap()), first);

    let changed = Context::new(
        page("<ul><li v-for=\"item of items\">{{ item }}</li></ul>", json!({ "items": ["a", "z", "c"] })),
        Value::object(),
    );
    assert_eq!(keys(&changed.compile().unwrap()), first);
}

#[test]
fn loops_over_arrays_and_objects() {
    assert_eq!(
        render("<ul><li v-for=\"item of items\">{{ item }}</li></ul>", json!({ "items": ["a", "b"] })),
        "<ul><li>a</li><li>b</li></ul>"
    );
    assert_eq!(
        render("<ul><li v-for=\"(item, i) in items\">{{ i }}:{{ item }}</li></ul>", json!({ "items": ["a", "b"] })),
        "<ul><li>0:a</li><li>1:b</li></ul>"
    );
    assert_eq!(
        render("<ul><li v-for=\"(v, k) of obj\">{{ k }}={{ v }}</li></ul>", json!({ "obj": { "x": 1, "y": 2 } })),
        "<ul><li>x=1</li><li>y=2</li></ul>"
    );
    assert_eq!(render("<ul><li v-for=\"item of nothing\">x</li></ul>", json!({ "nothing": null })), "<ul></ul>");
}

#[test]
fn nested_loops_see_outer_variables() {
    let template = "<div><p v-for=\"row of rows\"><span v-for=\"cell of row\">{{ cell }}{{ tag }}</span></p></div>";
    let state = json!({ "rows": [[1, 2], [3]], "tag": "!" });
    assert_eq!(
        render(template, state.clone()),
        "<div><p><span>1!</span><span>2!</span></p><p><span>3!</span></p></div>"
    );

    let cx = Context::new(page(template, state), Value::object());
    let conf = cx.compile().unwrap();
    let rows: Vec<_> = conf.as_element().unwrap().live_children().collect();
    assert_eq!(keys(rows[0]), ["App_0_0", "App_0_1"]);
    assert_eq!(keys(rows[1]), ["App_1_0"]);
}

#[test]
fn sibling_loops_reuse_position_keys() {
    let template = "<ul><li v-for=\"a of xs\">{{ a }}</li><li v-for=\"b of ys\">{{ b }}</li></ul>";
    let state = json!({ "xs": [1, 2], "ys": [3, 4] });
    let cx = Context::new(page(template, state.clone()), Value::object());
    assert_eq!(keys(&cx.compile().unwrap()), ["App_0", "App_1", "App_0", "App_1"]);
    assert_eq!(render(template, state), "<ul><li>1</li><li>2</li><li>3</li><li>4</li></ul>");
}

#[test]
fn loop_with_condition_keeps_positions() {
    let cx = Context::new(
        page("<ul><li v-for=\"n of nums\" v-if=\"n > 1\">{{ n }}</li></ul>", json!({ "nums": [1, 2, 3] })),
        Value::object(),
    );
    let conf = cx.compile().unwrap();
    let root = conf.as_element().unwrap();
    assert_eq!(root.children.len(), 3);
    assert!(root.children[0].live().is_none());
    assert_eq!(keys(&conf), ["App_1", "App_2"]);
}

#[test]
fn bound_attribute_overwrites_static_one() {
    assert_eq!(render("<p class=\"y\" :class=\"'x'\">t</p>", json!({})), "<p class=\"x\">t</p>");
    assert_eq!(render("<input :disabled=\"off\" :value=\"v\">", json!({ "off": false, "v": 3 })), "<input value=\"3\">");
}

#[test]
fn style_bindings_append() {
    assert_eq!(
        render("<p style=\"color: red\" :style=\"{ fontSize: size }\">t</p>", json!({ "size": "12px" })),
        "<p style=\"color: red; font-size: 12px;\">t</p>"
    );
    assert_eq!(render("<p :style=\"margin: 0;\">t</p>", json!({})), "<p style=\"margin: 0;\">t</p>");
}

#[test]
fn show_and_text() {
    assert_eq!(
        render("<div><p v-show=\"visible\">x</p><p v-show=\"!visible\">y</p></div>", json!({ "visible": false })),
        "<div><p style=\"display: none;\">x</p><p>y</p></div>"
    );
    assert_eq!(render("<div><p v-text=\"msg\">old</p></div>", json!({ "msg": "hi" })), "<div><p>hi</p></div>");
    assert_eq!(render("<div><p v-text=\"nothing\">old</p></div>", json!({ "nothing": null })), "<div><p></p></div>");
}

#[test]
fn free_form_attributes_follow_named_props() {
    assert_eq!(
        render("<a href=\"/x\" id=\"l\" title=\"t\">go</a>", json!({})),
        "<a id=\"l\" href=\"/x\" title=\"t\">go</a>"
    );
}

#[test]
fn loop_on_root_is_reported_and_ignored() {
    diagnostics::clear();
    assert_eq!(render("<div v-for=\"x of xs\">hi</div>", json!({ "xs": [1, 2] })), "<div>hi</div>");
    let reported = diagnostics::take();
    assert!(
        reported
            .iter()
            .any(|d| d.kind == DiagnosticKind::Template && d.directive.as_deref() == Some("v-for"))
    );
}

#[test]
fn expression_errors_stay_local() {
    diagnostics::clear();
    assert_eq!(render("<div><p>{{ nope.deep }}</p><p>ok</p></div>", json!({})), "<div><p></p><p>ok</p></div>");
    let reported = diagnostics::take();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].kind, DiagnosticKind::Expression);
    assert_eq!(reported[0].tag.as_deref(), Some("p"));
    assert_eq!(reported[0].component, "App");
}

#[test]
fn scope_is_balanced_after_render() {
    let before = scope::depth();
    render(
        "<ul><li v-for=\"item of items\">{{ item.missing.deeper }}<b v-for=\"x of item\">{{ x }}</b></li></ul>",
        json!({ "items": [1, [2, 3]] }),
    );
    assert_eq!(scope::depth(), before);
}

#[test]
fn custom_directive_runs_on_created_node() {
    directive("mark", |_cx: &Context, doc: &mut Document, node: NodeId, value: &Value| {
        let _ = doc.set_attribute(node, "data-mark", &value.to_display());
    })
    .unwrap();
    assert_eq!(
        render("<div><input v-mark=\"'yes'\"><i v-mark=\"n + 1\"></i></div>", json!({ "n": 1 })),
        "<div><input data-mark=\"yes\"><i data-mark=\"2\"></i></div>"
    );
    assert!(unregister("mark"));
    assert_eq!(render("<div><i v-mark=\"1\"></i></div>", json!({})), "<div><i></i></div>");
}

#[test]
fn duplicate_directives_keep_the_last_and_are_reported() {
    diagnostics::clear();
    assert_eq!(
        render("<div><p v-if=\"true\" v-if=\"false\">x</p><b>y</b></div>", json!({})),
        "<div><b>y</b></div>"
    );
    let reported = diagnostics::take();
    assert!(reported.iter().any(|d| d.kind == DiagnosticKind::Directive
        && d.directive.as_deref() == Some("v-if")
        && d.tag.as_deref() == Some("p")));

    directive("stamp", |_cx: &Context, doc: &mut Document, node: NodeId, value: &Value| {
        let _ = doc.set_attribute(node, "data-stamp", &value.to_display());
    })
    .unwrap();
    diagnostics::clear();
    assert_eq!(
        render("<div><i v-stamp=\"'a'\" v-stamp=\"'b'\"></i></div>", json!({})),
        "<div><i data-stamp=\"b\"></i></div>"
    );
    assert!(diagnostics::take().iter().any(|d| d.kind == DiagnosticKind::Directive
        && d.directive.as_deref() == Some("v-stamp")
        && d.message.contains("last one wins")));

    assert!(unregister("stamp"));
    diagnostics::clear();
    assert_eq!(render("<div><i v-stamp=\"1\"></i></div>", json!({})), "<div><i></i></div>");
    assert!(diagnostics::take().iter().any(|d| d.message.contains("unregistered")));
}

#[test]
fn builtin_names_cannot_be_registered() {
    let noop = |_: &Context, _: &mut Document, _: NodeId, _: &Value| {};
    assert!(directive("if", noop).is_err());
    assert!(directive("v-for", noop).is_err());
    assert!(directive("beforeEnter", noop).is_err());
    assert!(directive("", noop).is_err());
}

#[test]
fn loop_limit_truncates() {
    config::install(RuntimeConfig {
        loop_iteration_limit: 2,
        ..RuntimeConfig::default()
    })
    .unwrap();
    diagnostics::clear();
    let html = render("<ul><li v-for=\"n of nums\">{{ n }}</li></ul>", json!({ "nums": [1, 2, 3] }));
    config::install(RuntimeConfig::default()).unwrap();
    assert_eq!(html, "<ul><li>1</li><li>2</li></ul>");
    assert!(diagnostics::take().iter().any(|d| d.kind == DiagnosticKind::Directive));
}
