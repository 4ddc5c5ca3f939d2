//! `VNodeConfig` -> `meadow_dom::VNode`.
//!
//! Standard tags become plain elements. Any other tag is a child component:
//! its instance is looked up in the parent's cache by tag and slot path,
//! created on first sight, and dropped from the cache when a render no
//! longer produces it.

use std::rc::Rc;

use indexmap::IndexMap;
use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_core::{Function, Map, Value};
use meadow_dom::{
    Document, EventHandler, Hook, NodeId, Props, Transition, VNode, Widget, WidgetRef, h, text,
};

use crate::directives::hide;
use crate::error::RenderError;
use crate::instance::{Context, ParentLink};
use crate::vconf::{ElementConfig, Slot, TextConfig, TransitionData, VNodeConfig};

/// Compile `cx`'s template and build its virtual tree.
pub fn render_tree(cx: &Context) -> Result<VNode, RenderError> {
    let mut conf = cx.compile()?;
    // `v-text` / `v-show` from the parent's tag land on a standard root.
    match &mut conf {
        VNodeConfig::Element(root) if root.reserved => {
            let (text_result, show_result) = cx.link_results();
            if let Some(content) = text_result {
                root.children.insert(0, Slot::Live(VNodeConfig::Text(TextConfig { content })));
            }
            if show_result == Some(false) {
                hide(root);
            }
        }
        _ => {}
    }

    let mut builder = Builder {
        cx,
        cached: cx.take_children(),
        next: IndexMap::new(),
    };
    let tree = builder.node(&conf, "0").unwrap_or_else(|| text(""));
    if !builder.cached.is_empty() {
        tracing::debug!(component = cx.name(), evicted = builder.cached.len(), "child components evicted");
    }
    cx.set_children(builder.next);
    Ok(tree)
}

struct Builder<'a> {
    cx: &'a Context,
    cached: IndexMap<String, Context>,
    next: IndexMap<String, Context>,
}

impl Builder<'_> {
    fn report(&self, kind: DiagnosticKind, tag: &str, message: impl Into<String>) {
        diagnostics::report(Diagnostic::new(kind, self.cx.name(), message).tag(tag));
    }

    fn node(&mut self, conf: &VNodeConfig, path: &str) -> Option<VNode> {
        match conf {
            VNodeConfig::Text(t) if t.content.trim().is_empty() => None,
            VNodeConfig::Text(t) => Some(text(t.content.clone())),
            VNodeConfig::Element(el) if el.reserved => Some(self.element(el, path)),
            VNodeConfig::Element(el) => self.component(el, path),
        }
    }

    fn element(&mut self, conf: &ElementConfig, path: &str) -> VNode {
        let mut props = Props::new();
        for (k, v) in &conf.attrs {
            if let Some(s) = attr_string(v) {
                props.properties.insert(k.clone(), s);
            }
        }
        for (k, v) in &conf.attributes {
            if let Some(s) = attr_string(v) {
                props.attributes.insert(k.clone(), s);
            }
        }
        for (k, v) in &conf.events {
            match v {
                Value::Function(f) => {
                    props.handlers.insert(k.clone(), self.listener(&conf.tag, f.clone()));
                }
                Value::Undefined => {}
                other => self.report(
                    DiagnosticKind::Directive,
                    &conf.tag,
                    format!("`{k}` handler is a {}, not a function", other.type_name()),
                ),
            }
        }

        let mut children = Vec::new();
        for (i, slot) in conf.children.iter().enumerate() {
            if let Some(child) = slot.live().and_then(|c| self.node(c, &format!("{path}.{i}"))) {
                children.push(child);
            }
        }

        let mut node = h(conf.tag.clone(), props, children);
        for (name, thunk) in &conf.custom_direction {
            node = node.with_directive(name.clone(), thunk.hook(self.cx));
        }
        if let Some(t) = &conf.transition {
            node = node.with_transition(self.transition(&conf.tag, t));
        }
        node
    }

    fn listener(&self, tag: &str, f: Function) -> EventHandler {
        let (component, tag) = (self.cx.name().to_string(), tag.to_string());
        EventHandler::new(move |event| {
            let mut e = Map::new();
            e.insert("type".into(), Value::from(event.name.as_str()));
            e.insert("target".into(), Value::from(event.target.0));
            e.insert("currentTarget".into(), Value::from(event.current_target.0));
            e.insert("data".into(), event.data.clone().map_or(Value::Null, Value::String));
            if let Err(err) = f.call(&[Value::Object(e)]) {
                diagnostics::report(
                    Diagnostic::new(DiagnosticKind::Expression, component.clone(), err.to_string())
                        .tag(tag.clone())
                        .directive("v-on"),
                );
            }
        })
    }

    fn transition(&self, tag: &str, data: &TransitionData) -> Transition {
        let mut hooks = IndexMap::new();
        for (phase, value) in &data.hooks {
            let Value::Function(f) = value else { continue };
            let (f, component, tag, phase_name) =
                (f.clone(), self.cx.name().to_string(), tag.to_string(), phase.clone());
            let hook = Hook::new(move |_doc: &mut Document, node: NodeId| match f.call(&[Value::from(node.0)]) {
                Ok(Value::Bool(false)) => false,
                Ok(_) => true,
                Err(err) => {
                    diagnostics::report(
                        Diagnostic::new(DiagnosticKind::Expression, component.clone(), err.to_string())
                            .tag(tag.clone())
                            .directive(format!("v-{phase_name}")),
                    );
                    true
                }
            });
            hooks.insert(phase.clone(), hook);
        }
        Transition {
            kind: data.kind,
            name: data.name.clone(),
            hooks,
        }
    }

    fn component(&mut self, conf: &ElementConfig, path: &str) -> Option<VNode> {
        let cache_key = format!("{}@{path}", conf.tag);
        let (child, props) = match self.cached.shift_remove(&cache_key) {
            Some(child) => {
                let props = child.def().props_from(&conf.attrs, false);
                (child, props)
            }
            None => {
                let Some(def) = self.cx.def().child_components().resolve(&conf.tag) else {
                    self.report(DiagnosticKind::Template, &conf.tag, "unknown custom element; register it as a child component");
                    return None;
                };
                if def.id() == self.cx.def().id() {
                    self.report(DiagnosticKind::Template, &conf.tag, "a component cannot render itself");
                    return None;
                }
                let props = def.props_from(&conf.attrs, true);
                let child = Context::build(def, props.clone(), self.cx.document_weak());
                tracing::debug!(parent = self.cx.name(), child = child.name(), key = %cache_key, "child component created");
                (child, props)
            }
        };

        let link = ParentLink {
            key: conf.attrs.get("key").map(Value::to_display),
            text_result: conf.text_result.clone(),
            show_result: conf.show_result,
            directives: conf
                .custom_direction
                .iter()
                .map(|(name, thunk)| (name.clone(), thunk.hook(self.cx)))
                .collect(),
            events: conf.component_events.clone(),
        };
        child.relink(link, props);
        self.next.insert(cache_key, child.clone());
        Some(VNode::Widget(WidgetRef::new(ComponentWidget { instance: child })))
    }
}

/// DOM form of an attribute value; `None` leaves the attribute off.
fn attr_string(value: &Value) -> Option<String> {
    match value {
        Value::Undefined | Value::Null | Value::Bool(false) | Value::Function(_) => None,
        Value::Bool(true) => Some(String::new()),
        other => Some(other.to_display()),
    }
}

/// A child component standing in the parent's virtual tree.
struct ComponentWidget {
    instance: Context,
}

impl Widget for ComponentWidget {
    fn name(&self) -> &str {
        self.instance.name()
    }

    fn identity(&self) -> usize {
        Rc::as_ptr(&self.instance.0) as *const () as usize
    }

    fn init(&self, doc: &mut Document) -> NodeId {
        self.instance.init(doc).unwrap_or_else(|err| {
            diagnostics::report(Diagnostic::new(DiagnosticKind::Template, self.instance.name(), err.to_string()));
            doc.create_text("")
        })
    }

    fn update(&self, _previous: &WidgetRef, node: NodeId, doc: &mut Document) -> NodeId {
        self.instance.refresh(doc).unwrap_or_else(|err| {
            tracing::warn!(component = self.instance.name(), %err, "child refresh failed");
            node
        })
    }

    fn destroy(&self, node: NodeId, doc: &mut Document) {
        self.instance.destroy(doc, node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_strings() {
        assert_eq!(attr_string(&Value::Bool(true)).as_deref(), Some(""));
        assert_eq!(attr_string(&Value::Bool(false)), None);
        assert_eq!(attr_string(&Value::Null), None);
        assert_eq!(attr_string(&Value::from(2)).as_deref(), Some("2"));
        assert_eq!(attr_string(&Value::from("x")).as_deref(), Some("x"));
    }
}
