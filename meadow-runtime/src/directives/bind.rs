use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_core::value::kebab_case;
use meadow_core::Value;
use meadow_dom::style::splice_style;
use meadow_sfc::{DirectiveEntry, ElementNode};

use super::Compiler;
use crate::eval;
use crate::vconf::ElementConfig;

/// Bound values overwrite static attributes of the same name, except
/// `style`, which is appended to.
pub(super) fn apply(c: &Compiler<'_>, el: &ElementNode, entries: &[&DirectiveEntry], conf: &mut ElementConfig) {
    for entry in entries {
        match entry.arg() {
            Some("style") => style(c, el, entry, conf),
            Some(name) => {
                let value = eval::evaluate(&entry.value, "v-bind", &el.tag, c.cx);
                conf.attrs.insert(name.to_string(), value);
            }
            None => match eval::evaluate(&entry.value, "v-bind", &el.tag, c.cx) {
                Value::Object(map) => conf.attrs.extend(map),
                Value::Undefined | Value::Null => {}
                other => diagnostics::report(
                    Diagnostic::new(
                        DiagnosticKind::Directive,
                        c.cx.name(),
                        format!("`v-bind` without an argument needs an object, got {}", other.type_name()),
                    )
                    .tag(el.tag.clone())
                    .directive("v-bind"),
                ),
            },
        }
    }
}

/// `{ ... }` somewhere in the source means an object expression; anything
/// else is CSS text.
fn is_object_source(source: &str) -> bool {
    source
        .find('{')
        .is_some_and(|open| source[open + 1..].contains('}'))
}

fn style(c: &Compiler<'_>, el: &ElementNode, entry: &DirectiveEntry, conf: &mut ElementConfig) {
    let source = entry.value.trim();
    let addition = if is_object_source(source) {
        match eval::evaluate(source, "v-bind", &el.tag, c.cx) {
            Value::Object(map) => format_style(&map),
            Value::Undefined | Value::Null => String::new(),
            other => other.to_display(),
        }
    } else {
        source.to_string()
    };
    let existing = conf.attrs.get("style").map(Value::to_display).unwrap_or_default();
    conf.attrs
        .insert("style".into(), Value::String(splice_style(&existing, &addition)));
}

/// `{ backgroundColor: 'red' }` -> `background-color: red;`
pub(crate) fn format_style(map: &meadow_core::Map) -> String {
    map.iter()
        .filter(|(_, v)| !v.is_nullish())
        .map(|(k, v)| format!("{}: {};", kebab_case(k), v.to_display()))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_sources() {
        assert!(is_object_source("{ color: c }"));
        assert!(!is_object_source("color: red"));
        assert!(!is_object_source("a { b"));
    }

    #[test]
    fn style_objects_are_kebab_cased() {
        let mut map = meadow_core::Map::new();
        map.insert("backgroundColor".into(), "red".into());
        map.insert("gap".into(), Value::Null);
        map.insert("zIndex".into(), 2.into());
        assert_eq!(format_style(&map), "background-color: red; z-index: 2;");
    }
}
