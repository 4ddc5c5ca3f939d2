use std::cell::Cell;
use std::rc::Rc;

use meadow_core::diagnostics::{self, DiagnosticKind};
use meadow_core::{Map, Value, scheduler};
use meadow_dom::{Document, NodeId, SharedDocument, dispatch};
use meadow_runtime::{Component, ComponentDef, Context, RenderError, mount};
use serde_json::json;

#[derive(Default)]
struct Counts {
    renders: Cell<usize>,
    created: Cell<usize>,
    destroyed: Cell<usize>,
    updated: Cell<usize>,
}

struct Probe {
    template: &'static str,
    state: serde_json::Value,
    counts: Rc<Counts>,
    allow_update: bool,
}

impl Probe {
    fn new(template: &'static str, state: serde_json::Value) -> (Self, Rc<Counts>) {
        let counts = Rc::new(Counts::default());
        let probe = Probe {
            template,
            state,
            counts: Rc::clone(&counts),
            allow_update: true,
        };
        (probe, counts)
    }
}

impl Component for Probe {
    fn template(&self) -> String {
        self.counts.renders.set(self.counts.renders.get() + 1);
        self.template.to_string()
    }

    fn initial_state(&self, _props: &Value) -> Value {
        self.state.clone().into()
    }

    fn create(&self, _cx: &Context, _doc: &mut Document, _node: NodeId) {
        self.counts.created.set(self.counts.created.get() + 1);
    }

    fn will_update(&self, _cx: &Context, _next_state: &Value, _props: &Value) -> bool {
        self.allow_update
    }

    fn did_update(&self, _cx: &Context, _doc: &mut Document, _node: NodeId) {
        self.counts.updated.set(self.counts.updated.get() + 1);
    }

    fn destroy(&self, _cx: &Context, _doc: &mut Document, _node: NodeId) {
        self.counts.destroyed.set(self.counts.destroyed.get() + 1);
    }
}

fn mounted(def: ComponentDef) -> (SharedDocument, Context) {
    let doc = Document::shared();
    let body = doc.borrow().body();
    let cx = mount(&doc, body, def).unwrap();
    (doc, cx)
}

fn obj(value: serde_json::Value) -> Value {
    value.into()
}

#[test]
fn set_state_calls_in_one_turn_render_once() {
    let (probe, counts) = Probe::new("<p>{{ a }}</p>", json!({ "a": 0 }));
    let (_doc, cx) = mounted(ComponentDef::stateful("Counter", probe));
    assert_eq!(counts.renders.get(), 1);

    cx.set_state(obj(json!({ "a": 1 })));
    cx.set_state(obj(json!({ "a": 2 })));
    assert_eq!(cx.state().get("a"), Some(&Value::from(0)));
    assert_eq!(scheduler::pending(), 1);

    scheduler::run_microtasks();
    assert_eq!(counts.renders.get(), 2);
    assert_eq!(counts.updated.get(), 1);
    assert_eq!(cx.state().get("a"), Some(&Value::from(2)));
    assert_eq!(cx.html().unwrap(), "<p>2</p>");
}

#[test]
fn updaters_fold_in_call_order() {
    let (probe, _) = Probe::new("<p>{{ n }}</p>", json!({ "n": 1 }));
    let (_doc, cx) = mounted(ComponentDef::stateful("Folder", probe));
    cx.update_state(|s| {
        let mut next = s.clone();
        let n = s.get("n").map_or(0.0, Value::to_number);
        if let Some(map) = next.as_object_mut() {
            map.insert("n".into(), Value::from(n * 10.0));
        }
        next
    });
    cx.set_state(obj(json!({ "n": 5 })));
    cx.update_state(|_| Value::from("not an object"));
    scheduler::run_microtasks();
    assert_eq!(cx.state().get("n"), Some(&Value::from(5)));
    assert_eq!(cx.html().unwrap(), "<p>5</p>");
}

#[test]
fn will_update_false_keeps_dom() {
    let (mut probe, counts) = Probe::new("<p>{{ a }}</p>", json!({ "a": 0 }));
    probe.allow_update = false;
    let (_doc, cx) = mounted(ComponentDef::stateful("Frozen", probe));
    cx.set_state(obj(json!({ "a": 9 })));
    scheduler::run_microtasks();
    assert_eq!(cx.state().get("a"), Some(&Value::from(9)));
    assert_eq!(cx.html().unwrap(), "<p>0</p>");
    assert_eq!(counts.renders.get(), 1);

    cx.force_update();
    scheduler::run_microtasks();
    assert_eq!(cx.html().unwrap(), "<p>9</p>");
}

#[test]
fn click_handler_updates_the_dom() {
    let (probe, _) = Probe::new(
        "<div><button id=\"inc\" @click=\"inc\">{{ n }}</button><button id=\"add\" @click=\"add(5)\">add</button></div>",
        json!({ "n": 0 }),
    );
    let bump = |cx: &Context, by: f64| {
        let n = cx.state().get("n").map_or(0.0, Value::to_number);
        let mut partial = Map::new();
        partial.insert("n".into(), Value::from(n + by));
        cx.set_state(partial);
    };
    let def = ComponentDef::stateful("Clicker", probe)
        .method("inc", move |cx, _| {
            bump(cx, 1.0);
            Value::Undefined
        })
        .method("add", move |cx, args| {
            bump(cx, args.first().map_or(0.0, Value::to_number));
            Value::Undefined
        });
    let (doc, cx) = mounted(def);

    let inc = doc.borrow().get_element_by_id("inc").unwrap();
    assert_eq!(dispatch(&doc, inc, "click", None), 1);
    assert_eq!(cx.state().get("n"), Some(&Value::from(1)));

    let add = doc.borrow().get_element_by_id("add").unwrap();
    dispatch(&doc, add, "click", None);
    assert_eq!(cx.state().get("n"), Some(&Value::from(6)));
    assert_eq!(
        cx.html().unwrap(),
        "<div><button id=\"inc\">6</button><button id=\"add\">add</button></div>"
    );
}

#[test]
fn event_object_is_bound_for_inline_handlers() {
    let (probe, _) = Probe::new("<div><i id=\"t\" @ping=\"got($event.type)\"></i><b>{{ seen }}</b></div>", json!({ "seen": "" }));
    let def = ComponentDef::stateful("Events", probe).method("got", |cx, args| {
        let mut partial = Map::new();
        partial.insert("seen".into(), args.first().cloned().unwrap_or_default());
        cx.set_state(partial);
        Value::Undefined
    });
    let (doc, cx) = mounted(def);
    let target = doc.borrow().get_element_by_id("t").unwrap();
    dispatch(&doc, target, "ping", None);
    assert_eq!(cx.html().unwrap(), "<div><i id=\"t\"></i><b>ping</b></div>");
}

#[test]
fn component_tags_hand_event_directives_to_the_child() {
    let seen = Rc::new(std::cell::RefCell::new(String::new()));
    let record = Rc::clone(&seen);
    let (editor, _) = Probe::new("<button id=\"save\" @click=\"save\">save</button>", json!({}));
    let editor = ComponentDef::stateful("Editor", editor).method("save", move |cx, _| {
        if let Some(directive) = cx.parent_events().get("save") {
            *record.borrow_mut() = directive.expression.clone();
        }
        assert!(cx.call_parent("missing", &[]).is_none());
        cx.call_parent("save", &[Value::from("draft")]).unwrap_or_default()
    });
    let (parent, _) = Probe::new("<div><Editor @save=\"onSave\"></Editor><p>{{ saved }}</p></div>", json!({ "saved": "" }));
    let def = ComponentDef::stateful("Page", parent).child(editor).method("onSave", |cx, args| {
        let mut partial = Map::new();
        partial.insert("saved".into(), args.first().cloned().unwrap_or_default());
        cx.set_state(partial);
        Value::Undefined
    });
    let (doc, cx) = mounted(def);
    assert_eq!(cx.html().unwrap(), "<div><button id=\"save\">save</button><p></p></div>");

    let button = doc.borrow().get_element_by_id("save").unwrap();
    dispatch(&doc, button, "click", None);
    assert_eq!(seen.borrow().as_str(), "onSave");
    assert_eq!(cx.html().unwrap(), "<div><button id=\"save\">save</button><p>draft</p></div>");
}

#[test]
fn child_receives_required_props_only() {
    diagnostics::clear();
    let item = ComponentDef::stateless("Item", |_| "<span>{{ title }}{{ extra }}</span>".into())
        .required_props(["title", "subtitle"]);
    let (probe, _) = Probe::new("<div><Item title=\"hello\" extra=\"x\"></Item></div>", json!({}));
    let (_doc, cx) = mounted(ComponentDef::stateful("List", probe).child(item));
    assert_eq!(cx.html().unwrap(), "<div><span>hello</span></div>");
    let reported = diagnostics::take();
    assert!(
        reported
            .iter()
            .any(|d| d.kind == DiagnosticKind::Props && d.component == "Item" && d.message.contains("subtitle"))
    );
}

#[test]
fn unknown_tags_are_reported_and_omitted() {
    diagnostics::clear();
    let (probe, _) = Probe::new("<div><Nope></Nope><p>ok</p></div>", json!({}));
    let (_doc, cx) = mounted(ComponentDef::stateful("Host", probe));
    assert_eq!(cx.html().unwrap(), "<div><p>ok</p></div>");
    assert!(
        diagnostics::take()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Template && d.tag.as_deref() == Some("Nope"))
    );
}

#[test]
fn self_reference_is_rejected() {
    diagnostics::clear();
    let tree = ComponentDef::stateless("Tree", |_| "<div><Tree></Tree></div>".into());
    let tree = tree.clone().child(tree);
    let (_doc, cx) = mounted(tree);
    assert_eq!(cx.html().unwrap(), "<div></div>");
    assert!(diagnostics::take().iter().any(|d| d.message.contains("cannot render itself")));
}

#[test]
fn removed_child_is_destroyed() {
    let (child, counts) = Probe::new("<em>child</em>", json!({}));
    let (parent, _) = Probe::new("<div><Child v-if=\"on\"></Child></div>", json!({ "on": true }));
    let (_doc, cx) = mounted(ComponentDef::stateful("Parent", parent).child(ComponentDef::stateful("Child", child)));
    assert_eq!(cx.html().unwrap(), "<div><em>child</em></div>");
    assert_eq!(counts.created.get(), 1);

    cx.set_state(obj(json!({ "on": false })));
    scheduler::run_microtasks();
    assert_eq!(cx.html().unwrap(), "<div></div>");
    assert_eq!(counts.destroyed.get(), 1);
}

#[test]
fn cached_child_survives_parent_updates() {
    let (child, counts) = Probe::new("<em>{{ c }}</em>", json!({ "c": 5 }));
    let (parent, _) = Probe::new("<div><p>{{ n }}</p><Child></Child></div>", json!({ "n": 0 }));
    let (_doc, cx) = mounted(ComponentDef::stateful("Parent", parent).child(ComponentDef::stateful("Child", child)));
    for n in 1..=2 {
        cx.set_state(obj(json!({ "n": n })));
        scheduler::run_microtasks();
    }
    assert_eq!(cx.html().unwrap(), "<div><p>2</p><em>5</em></div>");
    assert_eq!(counts.created.get(), 1);
    assert_eq!(counts.destroyed.get(), 0);
}

#[test]
fn child_props_follow_parent_state() {
    let label = ComponentDef::stateless("Label", |_| "<b>{{ label }}</b>".into());
    let (parent, _) = Probe::new("<div><Label :label=\"n\"></Label></div>", json!({ "n": 0 }));
    let (_doc, cx) = mounted(ComponentDef::stateful("Parent", parent).child(label));
    assert_eq!(cx.html().unwrap(), "<div><b>0</b></div>");
    cx.set_state(obj(json!({ "n": 1 })));
    scheduler::run_microtasks();
    assert_eq!(cx.html().unwrap(), "<div><b>1</b></div>");
}

#[test]
fn looped_children_grow_with_the_list() {
    let item = ComponentDef::stateless("Item", |_| "<li>{{ title }}</li>".into());
    let (parent, _) = Probe::new("<ul><Item v-for=\"t of items\" :title=\"t\"></Item></ul>", json!({ "items": ["a", "b"] }));
    let (_doc, cx) = mounted(ComponentDef::stateful("List", parent).child(item));
    assert_eq!(cx.html().unwrap(), "<ul><li>a</li><li>b</li></ul>");
    cx.set_state(obj(json!({ "items": ["a", "b", "c"] })));
    scheduler::run_microtasks();
    assert_eq!(cx.html().unwrap(), "<ul><li>a</li><li>b</li><li>c</li></ul>");
}

#[test]
fn text_and_show_cross_the_component_boundary() {
    let inner = ComponentDef::stateless("Inner", |_| "<p>body</p>".into());
    let (parent, _) = Probe::new("<div><Inner v-text=\"msg\" v-show=\"visible\"></Inner></div>", json!({ "msg": "hi ", "visible": false }));
    let (_doc, cx) = mounted(ComponentDef::stateful("Outer", parent).child(inner));
    assert_eq!(cx.html().unwrap(), "<div><p style=\"display: none;\">hi body</p></div>");
}

#[test]
fn transition_hooks_run_on_enter() {
    let entered = Rc::new(Cell::new(0));
    let seen = Rc::clone(&entered);
    let (probe, _) = Probe::new("<div><p v-transition=\"fade\" v-afterEnter=\"entered\">x</p></div>", json!({}));
    let def = ComponentDef::stateful("Fade", probe).method("entered", move |_, _| {
        seen.set(seen.get() + 1);
        Value::Undefined
    });
    let (_doc, cx) = mounted(def);
    assert_eq!(entered.get(), 1);
    assert_eq!(cx.html().unwrap(), "<div><p>x</p></div>");
}

#[test]
fn stateless_components_have_no_state() {
    diagnostics::clear();
    let cx = Context::new(ComponentDef::stateless("Pure", |_| "<p>{{ x }}</p>".into()), obj(json!({ "x": 1 })));
    cx.set_state(obj(json!({ "x": 2 })));
    assert_eq!(scheduler::pending(), 0);
    assert!(diagnostics::take().iter().any(|d| d.component == "Pure"));
    assert!(cx.events().is_none());
}

#[test]
fn non_object_initial_state_is_replaced() {
    diagnostics::clear();
    let (probe, _) = Probe::new("<p>x</p>", json!(3));
    let cx = Context::new(ComponentDef::stateful("Odd", probe), Value::object());
    assert_eq!(*cx.state(), Value::object());
    assert_eq!(diagnostics::count(), 1);
}

#[test]
fn broken_template_fails_to_mount() {
    let (probe, _) = Probe::new("<div><p></div>", json!({}));
    let doc = Document::shared();
    let body = doc.borrow().body();
    let result = mount(&doc, body, ComponentDef::stateful("Broken", probe));
    assert!(matches!(result, Err(RenderError::NoAst(name)) if name == "Broken"));
}

#[test]
fn completion_events_latch() {
    let (probe, _) = Probe::new("<p>x</p>", json!({}));
    let def = ComponentDef::stateful("Job", probe);
    let events = def.events().unwrap();
    let hits = Rc::new(Cell::new(0));
    let h = Rc::clone(&hits);
    events.on_done(move |_| h.set(h.get() + 1));
    assert!(events.emit(&Value::from(1)));
    assert!(events.done(&Value::Null));
    assert!(!events.done(&Value::Null));
    assert!(!events.emit(&Value::from(2)));
    assert!(events.is_finished());
    assert_eq!(hits.get(), 1);
}
