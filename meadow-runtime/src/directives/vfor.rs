use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_core::scope::{self, ScopeError};
use meadow_core::{Value, config};
use meadow_sfc::{AstId, ElementNode, ForAlias};

use super::{Compiled, Compiler};
use crate::eval;
use crate::vconf::Slot;

/// Expand a loop template into one slot per item. Each clone is compiled
/// with the loop flag suspended and its variables bound in a fresh frame.
pub(super) fn expand(c: &Compiler<'_>, id: AstId, el: &ElementNode, parent_key: &str) -> Compiled {
    let Some(args) = &el.for_args else {
        return Compiled::Expanded(Vec::new());
    };
    let report = |message: String| {
        diagnostics::report(
            Diagnostic::new(DiagnosticKind::Directive, c.cx.name(), message)
                .tag(el.tag.clone())
                .directive("v-for"),
        );
    };

    let mut items: Vec<(Value, Value)> = match eval::evaluate(&args.source, "v-for", &el.tag, c.cx) {
        Value::Array(values) => values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (Value::from(i), v))
            .collect(),
        Value::Object(map) => map.into_iter().map(|(k, v)| (Value::String(k), v)).collect(),
        Value::Undefined | Value::Null => Vec::new(),
        other => {
            report(format!("cannot iterate over a {}", other.type_name()));
            Vec::new()
        }
    };

    let limit = config::current().loop_iteration_limit;
    if items.len() > limit {
        report(format!("{} items exceed the loop limit of {limit}; truncated", items.len()));
        items.truncate(limit);
    }

    let _suspended = el.suspend_for();
    let mut slots = Vec::with_capacity(items.len());
    for (position, (key, value)) in items.into_iter().enumerate() {
        let _frame = scope::push(None);
        if let Err(err) = bind_alias(&args.alias, value, key) {
            report(err.to_string());
            slots.push(Slot::Tombstone);
            continue;
        }
        // Sibling loops under one parent share these keys; children are
        // diffed by index, so keys only need to be stable per position.
        let item_key = format!("{parent_key}_{position}");
        match c.element(id, el, item_key, true) {
            Compiled::Node(conf) => slots.push(Slot::Live(conf)),
            Compiled::Removed => slots.push(Slot::Tombstone),
            Compiled::Expanded(more) => slots.extend(more),
        }
    }
    tracing::trace!(tag = %el.tag, items = slots.len(), "loop expanded");
    Compiled::Expanded(slots)
}

fn bind_alias(alias: &ForAlias, value: Value, key: Value) -> Result<(), ScopeError> {
    match alias {
        ForAlias::Single(name) => scope::bind(name, value),
        ForAlias::Pair(item, index) => {
            scope::bind(item, value)?;
            scope::bind(index, key)
        }
    }
}

