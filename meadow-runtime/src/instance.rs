//! Live component instances and the batched update queue.
//!
//! `set_state` only queues. The first queued update of a synchronous turn
//! schedules one microtask; when it runs, every queued entry is folded into
//! the state in call order and the component re-renders and patches once.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_core::observer::ComponentEvents;
use meadow_core::{CallError, Function, Map, Value, config, scheduler};
use meadow_dom::{Document, Hook, NodeId, SharedDocument, VNode, create_element, diff, patch};

use crate::component::{ComponentDef, ComponentKind};
use crate::directives;
use crate::error::RenderError;
use crate::registry;
use crate::render;
use crate::vconf::{EventDirective, VNodeConfig};

/// What the parent's template said about this child's tag.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParentLink {
    pub key: Option<String>,
    pub text_result: Option<String>,
    pub show_result: Option<bool>,
    pub directives: IndexMap<String, Hook>,
    pub events: IndexMap<String, EventDirective>,
}

enum Update {
    Merge(Map),
    Apply(Box<dyn FnOnce(&Value) -> Value>),
}

impl Update {
    fn fold(self, mut acc: Value) -> Value {
        match self {
            Update::Merge(partial) => {
                if let Some(state) = acc.as_object_mut() {
                    state.extend(partial);
                }
                acc
            }
            Update::Apply(f) => match f(&acc) {
                next @ Value::Object(_) => next,
                other => {
                    tracing::debug!(returned = other.type_name(), "state updater returned a non-object; ignored");
                    acc
                }
            },
        }
    }
}

struct InstanceState {
    state: Rc<Value>,
    props: Rc<Value>,
    link: ParentLink,
    dom: Option<NodeId>,
    vtree: Option<VNode>,
    queue: VecDeque<Update>,
    flush_scheduled: bool,
    force: bool,
    /// Child instances by `tag@path`, refreshed on every render.
    children: IndexMap<String, Context>,
    document: Weak<RefCell<Document>>,
    destroyed: bool,
}

pub(crate) struct Instance {
    def: ComponentDef,
    /// Methods as callable values bound to this instance.
    bound: IndexMap<String, Function>,
    inner: RefCell<InstanceState>,
}

/// Handle to a component instance. Cloning shares the instance.
#[derive(Clone)]
pub struct Context(pub(crate) Rc<Instance>);

#[derive(Clone)]
pub struct WeakContext(Weak<Instance>);

impl WeakContext {
    pub fn upgrade(&self) -> Option<Context> {
        self.0.upgrade().map(Context)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("component", &self.name())
            .field("state", &*self.state())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// An instance that is not attached to any document. Its updates
    /// re-render the virtual tree but patch nothing.
    pub fn new(def: ComponentDef, props: Value) -> Self {
        Self::build(def, props, Weak::new())
    }

    pub(crate) fn build(def: ComponentDef, props: Value, document: Weak<RefCell<Document>>) -> Self {
        let state = match def.kind() {
            ComponentKind::Stateful(component) => match component.initial_state(&props) {
                state @ Value::Object(_) => state,
                other => {
                    diagnostics::report(Diagnostic::new(
                        DiagnosticKind::Template,
                        def.name(),
                        format!("initial state must be an object, got {}", other.type_name()),
                    ));
                    Value::object()
                }
            },
            ComponentKind::Stateless(_) => Value::object(),
        };
        let instance = Rc::new_cyclic(|weak: &Weak<Instance>| {
            let bound = def
                .methods()
                .iter()
                .map(|(name, method)| {
                    let (weak, method) = (weak.clone(), Rc::clone(method));
                    let f = Function::new(move |args| {
                        let instance = weak
                            .upgrade()
                            .ok_or_else(|| CallError("component has been dropped".into()))?;
                        Ok(method(&Context(instance), args))
                    });
                    (name.clone(), f)
                })
                .collect();
            Instance {
                def,
                bound,
                inner: RefCell::new(InstanceState {
                    state: Rc::new(state),
                    props: Rc::new(props),
                    link: ParentLink::default(),
                    dom: None,
                    vtree: None,
                    queue: VecDeque::new(),
                    flush_scheduled: false,
                    force: false,
                    children: IndexMap::new(),
                    document,
                    destroyed: false,
                }),
            }
        });
        Context(instance)
    }

    pub fn name(&self) -> &str {
        self.0.def.name()
    }

    pub fn def(&self) -> &ComponentDef {
        &self.0.def
    }

    pub fn is_stateful(&self) -> bool {
        self.0.def.is_stateful()
    }

    pub fn state(&self) -> Rc<Value> {
        Rc::clone(&self.0.inner.borrow().state)
    }

    pub fn props(&self) -> Rc<Value> {
        Rc::clone(&self.0.inner.borrow().props)
    }

    /// The object template identifiers resolve against: state for stateful
    /// components, props for stateless ones.
    pub fn data(&self) -> Rc<Value> {
        if self.is_stateful() { self.state() } else { self.props() }
    }

    pub fn events(&self) -> Option<&ComponentEvents> {
        self.0.def.events()
    }

    /// Root DOM node, once mounted.
    pub fn dom(&self) -> Option<NodeId> {
        self.0.inner.borrow().dom
    }

    pub fn document(&self) -> Option<SharedDocument> {
        self.0.inner.borrow().document.upgrade()
    }

    pub(crate) fn document_weak(&self) -> Weak<RefCell<Document>> {
        self.0.inner.borrow().document.clone()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.inner.borrow().destroyed
    }

    /// Outer HTML of the mounted root.
    pub fn html(&self) -> Option<String> {
        let (doc, node) = (self.document()?, self.dom()?);
        let html = doc.try_borrow().ok()?.to_html(node);
        Some(html)
    }

    pub fn downgrade(&self) -> WeakContext {
        WeakContext(Rc::downgrade(&self.0))
    }

    /// Queue a partial state. An object is merged into the state; a function
    /// receives the accumulated state and returns its replacement.
    pub fn set_state(&self, partial: impl Into<Value>) {
        match partial.into() {
            Value::Object(map) => self.enqueue(Some(Update::Merge(map))),
            Value::Function(f) => {
                let name = self.name().to_string();
                self.enqueue(Some(Update::Apply(Box::new(move |state| {
                    f.call(&[state.clone()]).unwrap_or_else(|err| {
                        tracing::warn!(component = %name, %err, "state updater failed");
                        Value::Undefined
                    })
                }))));
            }
            other => diagnostics::report(Diagnostic::new(
                DiagnosticKind::Template,
                self.name(),
                format!("set_state expects an object or a function, got {}", other.type_name()),
            )),
        }
    }

    /// Queue `f`; a non-object return leaves the state unchanged.
    pub fn update_state(&self, f: impl FnOnce(&Value) -> Value + 'static) {
        self.enqueue(Some(Update::Apply(Box::new(f))));
    }

    /// Re-render on the next flush even if no state was queued.
    pub fn force_update(&self) {
        self.0.inner.borrow_mut().force = true;
        self.enqueue(None);
    }

    fn enqueue(&self, update: Option<Update>) {
        if update.is_some() && !self.is_stateful() {
            diagnostics::report(Diagnostic::new(
                DiagnosticKind::Template,
                self.name(),
                "stateless components have no state to update",
            ));
            return;
        }
        let schedule = {
            let mut inner = self.0.inner.borrow_mut();
            inner.queue.extend(update);
            !std::mem::replace(&mut inner.flush_scheduled, true)
        };
        if schedule {
            let weak = self.downgrade();
            scheduler::queue_microtask(move || {
                if let Some(cx) = weak.upgrade() {
                    cx.flush();
                }
            });
        }
    }

    fn flush(&self) {
        let compaction = config::current().queue_compaction;
        let mut next = (*self.state()).clone();
        let mut drained = 0usize;
        loop {
            // Updaters may queue more updates; they land in this same flush.
            let update = self.0.inner.borrow_mut().queue.pop_front();
            let Some(update) = update else { break };
            next = update.fold(next);
            drained += 1;
            if drained % compaction == 0 {
                self.0.inner.borrow_mut().queue.shrink_to_fit();
            }
        }
        let (force, destroyed, props) = {
            let mut inner = self.0.inner.borrow_mut();
            inner.flush_scheduled = false;
            if drained > 0 {
                inner.state = Rc::new(next);
            }
            (std::mem::take(&mut inner.force), inner.destroyed, Rc::clone(&inner.props))
        };
        tracing::debug!(component = self.name(), drained, force, "flushing state queue");
        if (drained == 0 && !force) || destroyed {
            return;
        }
        let proceed = match self.0.def.kind() {
            ComponentKind::Stateful(component) => force || component.will_update(self, &self.state(), &props),
            ComponentKind::Stateless(_) => true,
        };
        if !proceed {
            return;
        }

        let Some(shared) = self.document() else {
            // Not attached: keep the virtual tree current.
            match render::render_tree(self) {
                Ok(tree) => self.0.inner.borrow_mut().vtree = Some(tree),
                Err(err) => tracing::warn!(component = self.name(), %err, "re-render failed"),
            }
            return;
        };
        let Ok(mut doc) = shared.try_borrow_mut() else {
            tracing::warn!(component = self.name(), "document busy; re-render deferred");
            self.0.inner.borrow_mut().force = true;
            return;
        };
        if let Err(err) = self.repatch(&mut doc) {
            tracing::warn!(component = self.name(), %err, "re-render failed");
            return;
        }
        if let (ComponentKind::Stateful(component), Some(node)) = (self.0.def.kind(), self.dom()) {
            component.did_update(self, &mut doc, node);
        }
    }

    /// Render, diff against the previous tree and patch the mounted root.
    fn repatch(&self, doc: &mut Document) -> Result<NodeId, RenderError> {
        let tree = render::render_tree(self)?;
        let (old_node, old_tree) = {
            let mut inner = self.0.inner.borrow_mut();
            (inner.dom, inner.vtree.take())
        };
        let node = match (old_node, old_tree) {
            (Some(node), Some(old)) => {
                let patches = diff(&old, &tree);
                let new = patch(doc, node, &patches)?;
                if new != node {
                    // A replaced child root keeps its widget mark.
                    if let Some(widget) = doc.widget(node).cloned() {
                        doc.mark_widget(node, None)?;
                        doc.mark_widget(new, Some(widget))?;
                    }
                }
                new
            }
            _ => create_element(doc, &tree)?,
        };
        let mut inner = self.0.inner.borrow_mut();
        inner.dom = Some(node);
        inner.vtree = Some(tree);
        Ok(node)
    }

    /// Call a method by name.
    pub fn call(&self, method: &str, args: &[Value]) -> Option<Value> {
        let method = self.0.def.methods().get(method)?;
        Some(method(self, args))
    }

    /// `v-on` directives the parent wrote on this component's tag, by event
    /// name.
    pub fn parent_events(&self) -> IndexMap<String, EventDirective> {
        self.0.inner.borrow().link.events.clone()
    }

    /// Call the parent's `@name` handler. `None` when the parent attached
    /// none or it is not callable; a failing handler is reported and yields
    /// `Undefined`.
    pub fn call_parent(&self, name: &str, args: &[Value]) -> Option<Value> {
        let handler = self.0.inner.borrow().link.events.get(name)?.handler.clone();
        let Value::Function(f) = handler else {
            return None;
        };
        Some(f.call(args).unwrap_or_else(|err| {
            diagnostics::report(
                Diagnostic::new(DiagnosticKind::Expression, self.name(), err.0)
                    .tag(self.name())
                    .directive(format!("v-on:{name}")),
            );
            Value::Undefined
        }))
    }

    pub(crate) fn method_value(&self, name: &str) -> Option<Value> {
        self.0.bound.get(name).cloned().map(Value::Function)
    }

    /// `this` in template expressions.
    pub(crate) fn this_value(&self) -> Value {
        let (state, props) = {
            let inner = self.0.inner.borrow();
            ((*inner.state).clone(), (*inner.props).clone())
        };
        let mut this = Map::new();
        this.insert("state".into(), state);
        this.insert("props".into(), props);
        for (name, f) in &self.0.bound {
            this.insert(name.clone(), Value::Function(f.clone()));
        }
        Value::Object(this)
    }

    /// Key the root element's index keys grow from.
    pub(crate) fn root_key(&self) -> String {
        let key = self.0.inner.borrow().link.key.clone();
        key.unwrap_or_else(|| self.name().to_string())
    }

    pub(crate) fn template_source(&self) -> String {
        match self.0.def.kind() {
            ComponentKind::Stateful(component) => component.template(),
            ComponentKind::Stateless(render) => render(&self.props()),
        }
    }

    /// Compile the template against the current state.
    pub fn compile(&self) -> Result<VNodeConfig, RenderError> {
        let ast = registry::ast_for(&self.0.def, &self.template_source())?;
        directives::compile(&ast, self)
    }

    /// Build the virtual tree without touching the document.
    pub fn render(&self) -> Result<VNode, RenderError> {
        render::render_tree(self)
    }

    pub(crate) fn link_results(&self) -> (Option<String>, Option<bool>) {
        let inner = self.0.inner.borrow();
        (inner.link.text_result.clone(), inner.link.show_result)
    }

    pub(crate) fn relink(&self, link: ParentLink, props: Value) {
        let mut inner = self.0.inner.borrow_mut();
        inner.link = link;
        inner.props = Rc::new(props);
    }

    pub(crate) fn take_children(&self) -> IndexMap<String, Context> {
        std::mem::take(&mut self.0.inner.borrow_mut().children)
    }

    pub(crate) fn set_children(&self, children: IndexMap<String, Context>) {
        self.0.inner.borrow_mut().children = children;
    }

    /// Create the DOM for this instance and run its creation hooks.
    pub(crate) fn init(&self, doc: &mut Document) -> Result<NodeId, RenderError> {
        {
            let mut inner = self.0.inner.borrow_mut();
            inner.destroyed = false;
            inner.dom = None;
            inner.vtree = None;
        }
        let component = match self.0.def.kind() {
            ComponentKind::Stateful(component) => Some(Rc::clone(component)),
            ComponentKind::Stateless(_) => None,
        };
        if let Some(component) = &component {
            component.create_before(self);
        }
        let node = self.repatch(doc)?;
        let hooks: Vec<Hook> = self.0.inner.borrow().link.directives.values().cloned().collect();
        for hook in hooks {
            hook.call(doc, node);
        }
        if let Some(component) = &component {
            component.create(self, doc, node);
        }
        tracing::debug!(component = self.name(), ?node, "component created");
        Ok(node)
    }

    /// Re-render after the parent changed this instance's props.
    pub(crate) fn refresh(&self, doc: &mut Document) -> Result<NodeId, RenderError> {
        if self.dom().is_none() {
            return self.init(doc);
        }
        self.repatch(doc)
    }

    pub(crate) fn destroy(&self, doc: &mut Document, node: NodeId) {
        if std::mem::replace(&mut self.0.inner.borrow_mut().destroyed, true) {
            return;
        }
        if let ComponentKind::Stateful(component) = self.0.def.kind() {
            component.destroy(self, doc, node);
        }
        tracing::debug!(component = self.name(), "component destroyed");
    }
}

/// Create `def` and append its DOM to `parent`.
pub fn mount(doc: &SharedDocument, parent: NodeId, def: ComponentDef) -> Result<Context, RenderError> {
    let cx = Context::build(def, Value::object(), Rc::downgrade(doc));
    let mut d = doc.try_borrow_mut().map_err(|_| RenderError::DocumentBusy)?;
    let node = cx.init(&mut d)?;
    d.append_child(parent, node)?;
    tracing::debug!(component = cx.name(), "mounted");
    Ok(cx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updater_returning_non_object_keeps_state() {
        let mut state = Map::new();
        state.insert("a".into(), Value::from(1));
        let kept = Update::Apply(Box::new(|_| Value::from(5))).fold(Value::Object(state.clone()));
        assert_eq!(kept, Value::Object(state));
    }

    #[test]
    fn merge_overwrites_existing_keys_in_place() {
        let mut state = Map::new();
        state.insert("a".into(), Value::from(1));
        state.insert("b".into(), Value::from(2));
        let mut partial = Map::new();
        partial.insert("a".into(), Value::from(3));
        let merged = Update::Merge(partial).fold(Value::Object(state));
        let keys: Vec<_> = merged.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(merged.get("a"), Some(&Value::from(3)));
    }
}
