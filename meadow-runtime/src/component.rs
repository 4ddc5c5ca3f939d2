//! Component definitions.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_core::observer::ComponentEvents;
use meadow_core::{Map, Value};
use meadow_dom::{Document, NodeId};

use crate::instance::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(usize);

impl ComponentId {
    fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A stateful component. State lives on its `Context`; implementors only
/// describe the template and react to lifecycle points.
pub trait Component {
    fn template(&self) -> String;

    /// Must be an object; anything else is reported and replaced by `{}`.
    fn initial_state(&self, _props: &Value) -> Value {
        Value::object()
    }

    fn create_before(&self, _cx: &Context) {}

    fn create(&self, _cx: &Context, _doc: &mut Document, _node: NodeId) {}

    /// Returning false skips the re-render. The new state is kept either way.
    fn will_update(&self, _cx: &Context, _next_state: &Value, _props: &Value) -> bool {
        true
    }

    fn did_update(&self, _cx: &Context, _doc: &mut Document, _node: NodeId) {}

    fn destroy(&self, _cx: &Context, _doc: &mut Document, _node: NodeId) {}
}

pub type Method = Rc<dyn Fn(&Context, &[Value]) -> Value>;

#[derive(Clone)]
pub enum ComponentKind {
    Stateful(Rc<dyn Component>),
    /// A pure function from props to template source.
    Stateless(Rc<dyn Fn(&Value) -> String>),
}

/// How a component finds the definitions behind custom tags in its template.
#[derive(Clone, Default)]
pub enum ChildComponents {
    #[default]
    None,
    Map(IndexMap<String, ComponentDef>),
    /// Matched against each definition's name.
    List(Vec<ComponentDef>),
    Factory(Rc<dyn Fn(&str) -> Option<ComponentDef>>),
}

impl ChildComponents {
    pub fn resolve(&self, tag: &str) -> Option<ComponentDef> {
        match self {
            ChildComponents::None => None,
            ChildComponents::Map(map) => map.get(tag).cloned(),
            ChildComponents::List(list) => list.iter().find(|d| d.name() == tag).cloned(),
            ChildComponents::Factory(f) => f(tag),
        }
    }
}

#[derive(Clone)]
pub struct ComponentDef {
    id: ComponentId,
    name: String,
    kind: ComponentKind,
    children: ChildComponents,
    methods: IndexMap<String, Method>,
    required_props: Option<Vec<String>>,
    events: Option<Rc<ComponentEvents>>,
}

impl ComponentDef {
    pub fn stateful(name: impl Into<String>, component: impl Component + 'static) -> Self {
        Self::with_kind(
            name.into(),
            ComponentKind::Stateful(Rc::new(component)),
            Some(Rc::new(ComponentEvents::new())),
        )
    }

    pub fn stateless(name: impl Into<String>, render: impl Fn(&Value) -> String + 'static) -> Self {
        Self::with_kind(name.into(), ComponentKind::Stateless(Rc::new(render)), None)
    }

    fn with_kind(name: String, kind: ComponentKind, events: Option<Rc<ComponentEvents>>) -> Self {
        Self {
            id: ComponentId::next(),
            name,
            kind,
            children: ChildComponents::None,
            methods: IndexMap::new(),
            required_props: None,
            events,
        }
    }

    /// Register `def` under its own name.
    pub fn child(mut self, def: ComponentDef) -> Self {
        match &mut self.children {
            ChildComponents::Map(map) => {
                map.insert(def.name.clone(), def);
            }
            ChildComponents::List(list) => list.push(def),
            children @ (ChildComponents::None | ChildComponents::Factory(_)) => {
                if matches!(children, ChildComponents::Factory(_)) {
                    tracing::warn!(component = %self.name, "child() replaces the child factory");
                }
                *children = ChildComponents::Map(IndexMap::from([(def.name.clone(), def)]));
            }
        }
        self
    }

    pub fn children(mut self, children: ChildComponents) -> Self {
        self.children = children;
        self
    }

    pub fn method(mut self, name: impl Into<String>, f: impl Fn(&Context, &[Value]) -> Value + 'static) -> Self {
        self.methods.insert(name.into(), Rc::new(f));
        self
    }

    pub fn required_props<I, S>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_props = Some(props.into_iter().map(Into::into).collect());
        self
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn is_stateful(&self) -> bool {
        matches!(self.kind, ComponentKind::Stateful(_))
    }

    pub fn child_components(&self) -> &ChildComponents {
        &self.children
    }

    pub fn methods(&self) -> &IndexMap<String, Method> {
        &self.methods
    }

    /// Completion events shared by every instance. Stateless components have none.
    pub fn events(&self) -> Option<&ComponentEvents> {
        self.events.as_deref()
    }

    /// Props from a parent's attributes: `key` is dropped, and when a
    /// required list is declared only listed names pass. Missing required
    /// props are reported when `report` is set.
    pub(crate) fn props_from(&self, attrs: &IndexMap<String, Value>, report: bool) -> Value {
        let mut props = Map::new();
        for (k, v) in attrs {
            if k == "key" {
                continue;
            }
            let wanted = self.required_props.as_ref().is_none_or(|req| req.contains(k));
            if wanted {
                props.insert(k.clone(), v.clone());
            }
        }
        if report {
            for missing in self.required_props.iter().flatten().filter(|r| !props.contains_key(*r)) {
                diagnostics::report(Diagnostic::new(
                    DiagnosticKind::Props,
                    self.name.clone(),
                    format!("parent does not pass required prop `{missing}`"),
                ));
            }
        }
        Value::Object(props)
    }
}

impl fmt::Debug for ComponentDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("stateful", &self.is_stateful())
            .finish_non_exhaustive()
    }
}
