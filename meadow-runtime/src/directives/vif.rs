use meadow_sfc::{DirectiveEntry, ElementNode};

use super::Compiler;
use crate::eval;

/// False removes the element: no further directives, no children.
pub(super) fn holds(c: &Compiler<'_>, el: &ElementNode, entry: &DirectiveEntry) -> bool {
    eval::evaluate(&entry.value, "v-if", &el.tag, c.cx).truthy()
}
