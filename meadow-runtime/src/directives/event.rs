use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_sfc::{DirectiveEntry, ElementNode};

use super::Compiler;
use crate::eval;
use crate::vconf::{ElementConfig, EventDirective};

/// `@click="save"` stores the handler under `onclick`. Only standard tags
/// get DOM listeners; on a component tag the directive is kept under its
/// event name for the child.
pub(super) fn apply(c: &Compiler<'_>, el: &ElementNode, entries: &[&DirectiveEntry], conf: &mut ElementConfig) {
    for entry in entries {
        let Some(name) = entry.arg().map(str::trim).filter(|n| !n.is_empty()) else {
            diagnostics::report(
                Diagnostic::new(DiagnosticKind::Directive, c.cx.name(), "`v-on` needs an event name")
                    .tag(el.tag.clone())
                    .directive("v-on"),
            );
            continue;
        };
        let handler = eval::handler(&entry.value, "v-on", &el.tag, c.cx);
        if conf.reserved {
            conf.events.insert(format!("on{name}"), handler);
        } else {
            conf.component_events.insert(
                name.to_string(),
                EventDirective {
                    expression: entry.value.clone(),
                    handler,
                },
            );
        }
    }
}
