//! User-registered directives (`v-focus="expr"`).

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use meadow_core::Value;
use meadow_core::diagnostics::{Fatal, fatal};
use meadow_dom::{Document, NodeId};
use meadow_sfc::{DirectiveEntry, ElementNode};

use super::Compiler;
use super::weight::Weight;
use crate::eval;
use crate::instance::Context;
use crate::vconf::{CustomThunk, DirectiveHandler, ElementConfig};

thread_local! {
    static REGISTRY: RefCell<IndexMap<String, DirectiveHandler>> = RefCell::new(IndexMap::new());
}

fn registry_key(name: &str) -> String {
    let bare = name.strip_prefix("v-").unwrap_or(name);
    format!("v-{bare}")
}

/// Register `handler` for `v-<name>`. It receives the component owning the
/// template, the document, the element and the evaluated expression.
/// Registering a name again replaces the earlier handler.
pub fn directive(
    name: &str,
    handler: impl Fn(&Context, &mut Document, NodeId, &Value) + 'static,
) -> Result<(), Fatal> {
    let key = registry_key(name);
    let bare = &key[2..];
    if bare.is_empty() || bare.contains(':') {
        return Err(fatal(format!("`{name}` is not a valid directive name")));
    }
    if Weight::of(&key).is_some() || super::weight::is_transition_hook(&key) {
        return Err(fatal(format!("`{key}` is a built-in directive")));
    }
    REGISTRY.with(|r| r.borrow_mut().insert(key, Rc::new(handler)));
    Ok(())
}

pub fn unregister(name: &str) -> bool {
    let key = registry_key(name);
    REGISTRY.with(|r| r.borrow_mut().shift_remove(&key).is_some())
}

pub(crate) fn lookup(key: &str) -> Option<DirectiveHandler> {
    REGISTRY.with(|r| r.borrow().get(key).cloned())
}

/// Evaluate each custom directive and store it on the config.
pub(super) fn apply(
    c: &Compiler<'_>,
    el: &ElementNode,
    custom: &IndexMap<&str, (DirectiveHandler, &DirectiveEntry)>,
    conf: &mut ElementConfig,
) {
    for (key, (handler, entry)) in custom {
        let value = if entry.value.trim().is_empty() {
            Value::Undefined
        } else {
            eval::evaluate(&entry.value, key, &el.tag, c.cx)
        };
        conf.custom_direction.insert(
            key.to_string(),
            CustomThunk {
                handler: Rc::clone(handler),
                value,
            },
        );
    }
}
