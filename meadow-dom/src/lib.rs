use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

pub mod diff;
pub mod document;
pub mod patch;
pub mod style;

pub use diff::{Patch, diff};
pub use document::{Document, DomError, NodeId, SharedDocument, dispatch};
pub use patch::{create_element, patch};

/// Event delivered to handlers by `dispatch`.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
    pub current_target: NodeId,
    pub data: Option<String>,
}

/// A DOM listener. Equality is identity.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler")
    }
}

/// Callback run against a freshly created DOM node: custom directives and
/// transition phases. For `beforeEnter`/`beforeLeave`, returning false
/// skips the rest of that phase.
#[derive(Clone)]
pub struct Hook(Rc<dyn Fn(&mut Document, NodeId) -> bool>);

impl Hook {
    pub fn new(f: impl Fn(&mut Document, NodeId) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, doc: &mut Document, node: NodeId) -> bool {
        (self.0)(doc, node)
    }
}

impl PartialEq for Hook {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Transition,
    Animation,
}

/// Enter/leave hooks of a `v-transition` / `v-animation` element. CSS class
/// timing is left to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub kind: TransitionKind,
    pub name: String,
    /// Keyed `beforeEnter`, `enter`, `afterEnter`, `beforeLeave`, `leave`, `afterLeave`.
    pub hooks: IndexMap<String, Hook>,
}

impl Transition {
    pub const ENTER: [&'static str; 3] = ["beforeEnter", "enter", "afterEnter"];
    pub const LEAVE: [&'static str; 3] = ["beforeLeave", "leave", "afterLeave"];

    pub(crate) fn run(&self, phases: [&str; 3], doc: &mut Document, node: NodeId) {
        for (i, phase) in phases.iter().enumerate() {
            let Some(hook) = self.hooks.get(*phase) else { continue };
            if !hook.call(doc, node) && i == 0 {
                return;
            }
        }
    }
}

/// A node that manages its own DOM subtree (a child component).
pub trait Widget {
    fn name(&self) -> &str;

    /// Widgets with the same identity are updated in place; otherwise the
    /// old one is destroyed and the new one initialised.
    fn identity(&self) -> usize;

    fn init(&self, doc: &mut Document) -> NodeId;

    /// Returns the node now standing for the widget (possibly a new one).
    fn update(&self, previous: &WidgetRef, node: NodeId, doc: &mut Document) -> NodeId;

    fn destroy(&self, node: NodeId, doc: &mut Document);

    /// Diffable children; always zero for widgets.
    fn count(&self) -> usize {
        0
    }
}

#[derive(Clone)]
pub struct WidgetRef(pub Rc<dyn Widget>);

impl WidgetRef {
    pub fn new(widget: impl Widget + 'static) -> Self {
        Self(Rc::new(widget))
    }
}

impl std::ops::Deref for WidgetRef {
    type Target = dyn Widget;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl PartialEq for WidgetRef {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for WidgetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Widget({})", self.0.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Element {
        tag: String,
        props: Props,
        children: Vec<VNode>,
        key: Option<String>,
        custom_direction: IndexMap<String, Hook>,
        transition: Option<Transition>,
    },
    Text(String),
    Widget(WidgetRef),
}

impl VNode {
    pub fn with_directive(mut self, name: impl Into<String>, hook: Hook) -> Self {
        if let VNode::Element {
            custom_direction, ..
        } = &mut self
        {
            custom_direction.insert(name.into(), hook);
        }
        self
    }

    pub fn with_transition(mut self, t: Transition) -> Self {
        if let VNode::Element { transition, .. } = &mut self {
            *transition = Some(t);
        }
        self
    }
}

/// Element props: named properties (`class`, `id`, `style`, ...), a free-form
/// `attributes` bag and `on*` handlers. Both maps render as DOM attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Props {
    pub properties: IndexMap<String, String>,
    pub attributes: IndexMap<String, String>,
    pub handlers: IndexMap<String, EventHandler>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.properties.insert(k.into(), v.into());
        self
    }

    pub fn attr(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.attributes.insert(k.into(), v.into());
        self
    }

    pub fn on(mut self, event: impl Into<String>, handler: EventHandler) -> Self {
        self.handlers.insert(event.into(), handler);
        self
    }

    /// Attributes as they land on the DOM node: `className` becomes `class`,
    /// `key` is dropped and the bag overrides same-named properties.
    pub fn dom_attributes(&self) -> IndexMap<&str, &str> {
        let mut out = IndexMap::new();
        for (k, v) in &self.properties {
            match k.as_str() {
                "key" => {}
                "className" => {
                    out.insert("class", v.as_str());
                }
                name => {
                    out.insert(name, v.as_str());
                }
            }
        }
        for (k, v) in &self.attributes {
            out.insert(k.as_str(), v.as_str());
        }
        out
    }
}

// Allow concise props creation
impl From<()> for Props {
    fn from(_: ()) -> Self {
        Props::default()
    }
}
impl From<Vec<(&str, &str)>> for Props {
    fn from(v: Vec<(&str, &str)>) -> Self {
        v.into_iter().fold(Props::new(), |p, (k, v)| p.set(k, v))
    }
}

pub fn h(tag: impl Into<String>, props: impl Into<Props>, children: Vec<VNode>) -> VNode {
    let props = props.into();
    VNode::Element {
        tag: tag.into(),
        key: props.properties.get("key").cloned(),
        props,
        children,
        custom_direction: IndexMap::new(),
        transition: None,
    }
}

pub fn text(t: impl Into<String>) -> VNode {
    VNode::Text(t.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tree() {
        let node = h(
            "div",
            vec![("class", "app"), ("key", "k1")],
            vec![text("hello"), h("span", (), vec![text("world")])],
        );
        let VNode::Element {
            tag,
            props,
            children,
            key,
            ..
        } = node
        else {
            panic!("expected element");
        };
        assert_eq!(tag, "div");
        assert_eq!(props.properties.get("class").map(String::as_str), Some("app"));
        assert_eq!(key.as_deref(), Some("k1"));
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn dom_attributes_merge_properties_and_bag() {
        let props = Props::new()
            .set("className", "a")
            .set("key", "1")
            .attr("title", "t")
            .attr("data-x", "y");
        let attrs: Vec<_> = props.dom_attributes().into_iter().collect();
        assert_eq!(attrs, vec![("class", "a"), ("title", "t"), ("data-x", "y")]);
    }
}
