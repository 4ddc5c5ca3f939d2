use meadow_sfc::{DirectiveEntry, ElementNode};

use super::Compiler;
use crate::eval;
use crate::vconf::{ElementConfig, Slot, TextConfig, VNodeConfig};

/// Returns true when the element's children were replaced.
pub(super) fn apply(c: &Compiler<'_>, el: &ElementNode, entry: &DirectiveEntry, conf: &mut ElementConfig) -> bool {
    let content = eval::evaluate(&entry.value, "v-text", &el.tag, c.cx).to_display();
    if conf.reserved {
        conf.children = vec![Slot::Live(VNodeConfig::Text(TextConfig { content }))];
        true
    } else {
        conf.text_result = Some(content);
        false
    }
}
