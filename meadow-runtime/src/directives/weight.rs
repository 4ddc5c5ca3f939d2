use std::collections::BTreeMap;

use indexmap::IndexMap;
use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_sfc::{DirectiveEntry, ElementNode};

use super::custom;
use crate::vconf::DirectiveHandler;

/// Reserved directive kinds, lowest priority first. The compiler runs them
/// highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weight {
    Transition,
    Animation,
    Text,
    Show,
    Event,
    Bind,
    If,
    For,
}

impl Weight {
    pub fn of(name: &str) -> Option<Self> {
        Some(match name {
            "v-transition" => Weight::Transition,
            "v-animation" => Weight::Animation,
            "v-text" => Weight::Text,
            "v-show" => Weight::Show,
            "v-on" => Weight::Event,
            "v-bind" => Weight::Bind,
            "v-if" => Weight::If,
            "v-for" => Weight::For,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            Weight::Transition => "v-transition",
            Weight::Animation => "v-animation",
            Weight::Text => "v-text",
            Weight::Show => "v-show",
            Weight::Event => "v-on",
            Weight::Bind => "v-bind",
            Weight::If => "v-if",
            Weight::For => "v-for",
        }
    }

    /// Bind and event accumulate; every other kind keeps its last entry.
    pub fn is_multiple(self) -> bool {
        matches!(self, Weight::Event | Weight::Bind)
    }
}

pub const TRANSITION_HOOKS: [&str; 6] = [
    "v-beforeEnter",
    "v-enter",
    "v-afterEnter",
    "v-beforeLeave",
    "v-leave",
    "v-afterLeave",
];

pub fn is_transition_hook(key: &str) -> bool {
    TRANSITION_HOOKS.contains(&key)
}

/// An element's directives, partitioned.
pub(crate) struct Plan<'a> {
    pub reserved: BTreeMap<Weight, Vec<&'a DirectiveEntry>>,
    pub custom: IndexMap<&'a str, (DirectiveHandler, &'a DirectiveEntry)>,
    /// Hook name without the `v-` prefix -> expression source.
    pub hooks: IndexMap<&'a str, &'a str>,
}

impl<'a> Plan<'a> {
    /// Duplicates of a single-valued kind and unregistered names are
    /// reported against `component` and dropped; the last entry wins.
    pub fn partition(el: &'a ElementNode, component: &str) -> Self {
        let report = |key: &str, message: &str| {
            diagnostics::report(
                Diagnostic::new(DiagnosticKind::Directive, component, message)
                    .tag(el.tag.clone())
                    .directive(key),
            );
        };
        let mut plan = Plan {
            reserved: BTreeMap::new(),
            custom: IndexMap::new(),
            hooks: IndexMap::new(),
        };
        for entry in &el.directives {
            let key = entry.key.as_str();
            if is_transition_hook(key) {
                plan.hooks.insert(&key[2..], entry.value.as_str());
                continue;
            }
            let Some(weight) = Weight::of(entry.name()) else {
                match custom::lookup(entry.name()) {
                    Some(handler) => {
                        if plan.custom.insert(entry.name(), (handler, entry)).is_some() {
                            report(key, "duplicate directive, the last one wins");
                        }
                    }
                    None => report(key, "unregistered directive ignored"),
                }
                continue;
            };
            let slot = plan.reserved.entry(weight).or_default();
            if !weight.is_multiple() && !slot.is_empty() {
                report(key, "duplicate directive, the last one wins");
                slot.clear();
            }
            slot.push(entry);
        }
        plan
    }
}
