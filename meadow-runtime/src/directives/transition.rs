use indexmap::IndexMap;
use meadow_core::Value;
use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_dom::TransitionKind;
use meadow_sfc::{DirectiveEntry, ElementNode};

use super::Compiler;
use crate::eval;
use crate::vconf::{ElementConfig, TransitionData};

/// `v-transition="fade"` names the transition; the hook directives
/// (`v-beforeEnter="onBefore"`, ...) are evaluated to functions.
pub(super) fn apply(
    c: &Compiler<'_>,
    el: &ElementNode,
    kind: TransitionKind,
    entry: &DirectiveEntry,
    hooks: &IndexMap<&str, &str>,
    conf: &mut ElementConfig,
) {
    let mut resolved = IndexMap::new();
    for (hook, source) in hooks {
        let label = format!("v-{hook}");
        match eval::evaluate(source, &label, &el.tag, c.cx) {
            value @ Value::Function(_) => {
                resolved.insert(hook.to_string(), value);
            }
            Value::Undefined => {}
            other => diagnostics::report(
                Diagnostic::new(
                    DiagnosticKind::Directive,
                    c.cx.name(),
                    format!("transition hook must be a function, got {}", other.type_name()),
                )
                .tag(el.tag.clone())
                .directive(label),
            ),
        }
    }
    conf.transition = Some(TransitionData {
        kind,
        name: entry.value.trim().to_string(),
        hooks: resolved,
    });
}
