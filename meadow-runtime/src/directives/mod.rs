//! Template AST -> `VNodeConfig`.
//!
//! Each element's directives are partitioned (reserved kinds, registered
//! custom directives, transition hooks) and the reserved kinds run highest
//! weight first: a loop expands the element into clones that re-enter the
//! pipeline on their own, and a false conditional drops the element before
//! anything else is evaluated.

mod bind;
pub mod custom;
mod event;
mod show;
mod text;
mod transition;
mod vfor;
mod vif;
pub mod weight;

use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_core::{Value, scope};
use meadow_dom::TransitionKind;
use meadow_sfc::{AstId, AstNode, ElementNode, TemplateAst};

pub use custom::{directive, unregister};
pub(crate) use show::hide;
pub use weight::Weight;

use crate::error::RenderError;
use crate::eval;
use crate::instance::Context;
use crate::vconf::{ElementConfig, Slot, TextConfig, VNodeConfig};
use weight::Plan;

/// Outcome of compiling one AST node.
pub(crate) enum Compiled {
    Node(VNodeConfig),
    /// A false `v-if`.
    Removed,
    /// A loop template's clones.
    Expanded(Vec<Slot>),
}

pub(crate) struct Compiler<'a> {
    pub ast: &'a TemplateAst,
    pub cx: &'a Context,
}

/// Compile `ast` against `cx`'s current data. The scope chain is left at the
/// depth it had on entry.
pub fn compile(ast: &TemplateAst, cx: &Context) -> Result<VNodeConfig, RenderError> {
    let _data = scope::graft_external(cx.data())?;
    let depth = scope::depth();
    let compiler = Compiler { ast, cx };
    let root = ast
        .root_element()
        .map(|el| compiler.element(ast.root(), el, cx.root_key(), false));
    if depth == 0 {
        scope::reset();
    }
    match root {
        Some(Compiled::Node(conf)) => Ok(conf),
        _ => Err(RenderError::NoAst(cx.name().to_string())),
    }
}

/// Attributes that stay top-level props on standard tags; the rest move into
/// the `attributes` bag.
const PROP_ATTRS: [&str; 7] = ["namespace", "className", "styleName", "style", "class", "key", "id"];

fn remap_attributes(conf: &mut ElementConfig) {
    let nested = conf.attrs.shift_remove("attributes");
    let mut bag = std::mem::take(&mut conf.attributes);
    conf.attrs.retain(|k, v| {
        if PROP_ATTRS.contains(&k.as_str()) || k.starts_with("on") {
            return true;
        }
        bag.insert(k.clone(), std::mem::take(v));
        false
    });
    if let Some(nested) = nested {
        bag.insert("attributes".into(), nested);
    }
    conf.attributes = bag;
}

impl Compiler<'_> {
    fn report(&self, el: &ElementNode, directive: &str, message: impl Into<String>) {
        diagnostics::report(
            Diagnostic::new(DiagnosticKind::Template, self.cx.name(), message)
                .tag(el.tag.clone())
                .directive(directive),
        );
    }

    pub fn node(&self, id: AstId, parent_key: &str) -> Compiled {
        match self.ast.node(id) {
            Some(AstNode::Element(el)) => self.element(id, el, parent_key.to_string(), false),
            Some(AstNode::Interpolated(t)) => {
                let tag = self.ast.element(t.parent).map_or("", |p| p.tag.as_str());
                let content = eval::interpolate(&t.interpolation, tag, self.cx);
                Compiled::Node(VNodeConfig::Text(TextConfig { content }))
            }
            Some(AstNode::Static(t)) => Compiled::Node(VNodeConfig::Text(TextConfig {
                content: t.content.clone(),
            })),
            None => Compiled::Removed,
        }
    }

    /// `seed_key` marks a loop clone: its `key` attribute starts out as its
    /// index key, which a bound `:key` may still overwrite.
    pub fn element(&self, id: AstId, el: &ElementNode, index_key: String, seed_key: bool) -> Compiled {
        let mut conf = ElementConfig::new(id, el, index_key);
        if seed_key {
            conf.attrs
                .insert("key".into(), Value::String(conf.index_key.clone()));
        }

        let mut plan = Plan::partition(el, self.cx.name());
        if el.is_root {
            for weight in [Weight::For, Weight::If] {
                if plan.reserved.remove(&weight).is_some() {
                    self.report(el, weight.label(), "cannot be used on the root element");
                }
            }
        }
        if el.is_for() && plan.reserved.contains_key(&Weight::For) {
            return vfor::expand(self, id, el, &conf.index_key);
        }

        let mut replaced_children = false;
        for (weight, entries) in plan.reserved.iter().rev() {
            let Some(last) = entries.last() else { continue };
            match weight {
                Weight::For => {}
                Weight::If => {
                    if !vif::holds(self, el, last) {
                        return Compiled::Removed;
                    }
                }
                Weight::Bind => bind::apply(self, el, entries, &mut conf),
                Weight::Event => event::apply(self, el, entries, &mut conf),
                Weight::Show => show::apply(self, el, last, &mut conf),
                Weight::Text => replaced_children = text::apply(self, el, last, &mut conf),
                Weight::Transition => {
                    transition::apply(self, el, TransitionKind::Transition, last, &plan.hooks, &mut conf);
                }
                Weight::Animation => {
                    transition::apply(self, el, TransitionKind::Animation, last, &plan.hooks, &mut conf);
                }
            }
        }
        custom::apply(self, el, &plan.custom, &mut conf);

        if !replaced_children {
            self.children(el, &mut conf);
        }
        if conf.reserved {
            remap_attributes(&mut conf);
        }
        Compiled::Node(VNodeConfig::Element(conf))
    }

    fn children(&self, el: &ElementNode, conf: &mut ElementConfig) {
        for &child in &el.children {
            match self.node(child, &conf.index_key) {
                Compiled::Node(c) => conf.children.push(Slot::Live(c)),
                Compiled::Removed => conf.children.push(Slot::Tombstone),
                Compiled::Expanded(slots) => conf.children.extend(slots),
            }
        }
    }
}
