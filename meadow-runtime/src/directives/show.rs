use meadow_core::Value;
use meadow_dom::style::splice_style;
use meadow_sfc::{DirectiveEntry, ElementNode};

use super::Compiler;
use crate::eval;
use crate::vconf::ElementConfig;

pub(crate) const HIDDEN: &str = "display: none;";

/// Hidden standard elements get `display: none` merged into their style.
/// Component tags carry the result to the child's root element.
pub(super) fn apply(c: &Compiler<'_>, el: &ElementNode, entry: &DirectiveEntry, conf: &mut ElementConfig) {
    let visible = eval::evaluate(&entry.value, "v-show", &el.tag, c.cx).truthy();
    if !conf.reserved {
        conf.show_result = Some(visible);
        return;
    }
    if !visible {
        hide(conf);
    }
}

pub(crate) fn hide(conf: &mut ElementConfig) {
    let existing = conf.attrs.get("style").map(Value::to_display).unwrap_or_default();
    conf.attrs
        .insert("style".into(), Value::String(splice_style(&existing, HIDDEN)));
}
