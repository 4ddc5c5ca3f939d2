//! Per-render configuration tree produced by the directive compiler.
//!
//! Mirrors the template but holds resolved values. A fresh tree is built on
//! every render; nothing in it is shared with the previous pass.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use meadow_core::Value;
use meadow_dom::{Document, Hook, NodeId, TransitionKind};
use meadow_sfc::{AstId, ElementNode};

use crate::instance::Context;

#[derive(Debug, Clone, PartialEq)]
pub enum VNodeConfig {
    Element(ElementConfig),
    Text(TextConfig),
}

impl VNodeConfig {
    pub fn as_element(&self) -> Option<&ElementConfig> {
        match self {
            VNodeConfig::Element(el) => Some(el),
            VNodeConfig::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            VNodeConfig::Text(t) => Some(&t.content),
            VNodeConfig::Element(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextConfig {
    pub content: String,
}

/// A child position. Removed children leave a tombstone so loop siblings
/// and cached child components keep their positions.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Live(VNodeConfig),
    Tombstone,
}

impl Slot {
    pub fn live(&self) -> Option<&VNodeConfig> {
        match self {
            Slot::Live(conf) => Some(conf),
            Slot::Tombstone => None,
        }
    }
}

pub type DirectiveHandler = Rc<dyn Fn(&Context, &mut Document, NodeId, &Value)>;

/// A registered custom directive with its evaluated value, run once the
/// element exists.
#[derive(Clone)]
pub struct CustomThunk {
    pub handler: DirectiveHandler,
    pub value: Value,
}

impl CustomThunk {
    /// Bind to `owner`, the component whose template holds the directive.
    pub(crate) fn hook(&self, owner: &Context) -> Hook {
        let weak = owner.downgrade();
        let handler = Rc::clone(&self.handler);
        let value = self.value.clone();
        Hook::new(move |doc, node| {
            if let Some(cx) = weak.upgrade() {
                handler(&cx, doc, node, &value);
            }
            true
        })
    }
}

impl PartialEq for CustomThunk {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.handler), Rc::as_ptr(&other.handler)) && self.value == other.value
    }
}

impl fmt::Debug for CustomThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomThunk").field("value", &self.value).finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionData {
    pub kind: TransitionKind,
    pub name: String,
    /// `beforeEnter` .. `afterLeave`, evaluated.
    pub hooks: IndexMap<String, Value>,
}

/// A `v-on` entry on a component tag. The child receives it as-is and wires
/// its own handling.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDirective {
    pub expression: String,
    /// The expression resolved in the parent, as for a DOM listener.
    pub handler: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementConfig {
    pub tag: String,
    pub ast: AstId,
    /// Standard HTML/SVG tag, as opposed to a child component.
    pub reserved: bool,
    pub attrs: IndexMap<String, Value>,
    /// Free-form DOM attributes, filled for standard tags.
    pub attributes: IndexMap<String, Value>,
    /// `on<event>` -> handler.
    pub events: IndexMap<String, Value>,
    /// Event name -> directive, filled for component tags.
    pub component_events: IndexMap<String, EventDirective>,
    pub custom_direction: IndexMap<String, CustomThunk>,
    pub index_key: String,
    pub children: Vec<Slot>,
    /// `v-text` / `v-show` results carried across a component boundary.
    pub text_result: Option<String>,
    pub show_result: Option<bool>,
    pub transition: Option<TransitionData>,
}

impl ElementConfig {
    pub(crate) fn new(id: AstId, el: &ElementNode, index_key: String) -> Self {
        Self {
            tag: el.tag.clone(),
            ast: id,
            reserved: el.is_reserved(),
            attrs: el
                .attrs
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
            attributes: IndexMap::new(),
            events: IndexMap::new(),
            component_events: IndexMap::new(),
            custom_direction: IndexMap::new(),
            index_key,
            children: Vec::new(),
            text_result: None,
            show_result: None,
            transition: None,
        }
    }

    pub fn live_children(&self) -> impl Iterator<Item = &VNodeConfig> {
        self.children.iter().filter_map(Slot::live)
    }

    /// Display form of an attribute, looking in the `attributes` bag too.
    pub fn attr(&self, name: &str) -> Option<String> {
        self.attrs
            .get(name)
            .or_else(|| self.attributes.get(name))
            .map(Value::to_display)
    }
}
