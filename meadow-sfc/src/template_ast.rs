use std::cell::Cell;
use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::expr::ForAlias;

/// Index of a node inside its `TemplateAst` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstId(pub usize);

/// A parsed template. Exactly one root element; nodes live in an arena and
/// refer to each other by `AstId`.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateAst {
    pub(crate) nodes: Vec<AstNode>,
    pub(crate) root: AstId,
    pub(crate) source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Element(ElementNode),
    Interpolated(InterpolatedText),
    Static(StaticText),
}

/// One raw directive as written, after prefix normalisation
/// (`:x` is stored as `v-bind:x`, `@x` as `v-on:x`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveEntry {
    pub key: String,
    pub value: String,
}

impl DirectiveEntry {
    /// `v-bind:class` -> `v-bind`.
    pub fn name(&self) -> &str {
        self.key.split_once(':').map_or(&self.key, |(name, _)| name)
    }

    /// `v-bind:class` -> `class`.
    pub fn arg(&self) -> Option<&str> {
        self.key.split_once(':').map(|(_, arg)| arg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForArgs {
    pub alias: ForAlias,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: String,
    pub attrs: IndexMap<String, String>,
    pub directives: Vec<DirectiveEntry>,
    pub children: Vec<AstId>,
    pub parent: Option<AstId>,
    pub start: usize,
    pub end: Option<usize>,
    pub is_void: bool,
    pub is_root: bool,
    pub is_html_tag: bool,
    pub is_svg_tag: bool,
    pub for_args: Option<ForArgs>,
    pub has_if: bool,
    is_for: Cell<bool>,
}

impl ElementNode {
    pub(crate) fn new(tag: String, parent: Option<AstId>, start: usize) -> Self {
        Self {
            is_html_tag: crate::tags::is_html_tag(&tag),
            is_svg_tag: crate::tags::is_svg_tag(&tag),
            is_void: crate::tags::is_void_tag(&tag),
            tag,
            attrs: IndexMap::new(),
            directives: Vec::new(),
            children: Vec::new(),
            is_root: parent.is_none(),
            parent,
            start,
            end: None,
            for_args: None,
            has_if: false,
            is_for: Cell::new(false),
        }
    }

    pub fn is_reserved(&self) -> bool {
        self.is_html_tag || self.is_svg_tag
    }

    /// True while this element acts as a `v-for` template.
    pub fn is_for(&self) -> bool {
        self.is_for.get()
    }

    pub(crate) fn mark_for(&self) {
        self.is_for.set(true);
    }

    /// Treat the element as a plain node until the guard drops. Used while a
    /// loop clone runs through the directive pipeline.
    pub fn suspend_for(&self) -> SuspendFor<'_> {
        let previous = self.is_for.replace(false);
        SuspendFor {
            cell: &self.is_for,
            previous,
        }
    }

    pub fn has_directives(&self) -> bool {
        !self.directives.is_empty()
    }
}

pub struct SuspendFor<'a> {
    cell: &'a Cell<bool>,
    previous: bool,
}

impl Drop for SuspendFor<'_> {
    fn drop(&mut self) {
        self.cell.set(self.previous);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Expr(String),
}

/// Text split into literal and `{{ expr }}` segments, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpolation {
    pub segments: Vec<Segment>,
}

impl Interpolation {
    /// `None` when `text` holds no `{{ }}` pair.
    pub fn parse(text: &str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut rest = text;
        let mut found = false;
        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open + 2..].find("}}") else { break };
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let expr = rest[open + 2..open + 2 + close].trim();
            segments.push(Segment::Expr(expr.to_string()));
            rest = &rest[open + 2 + close + 2..];
            found = true;
        }
        if !found {
            return None;
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Some(Self { segments })
    }

    /// The spliced form, e.g. `"A " + _s(x) + " B"`.
    pub fn expression(&self) -> String {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(text) => format!("{text:?}"),
                Segment::Expr(expr) => format!("_s({expr})"),
            })
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedText {
    pub content: String,
    pub interpolation: Interpolation,
    pub parent: AstId,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticText {
    pub content: String,
    pub parent: AstId,
    pub start: usize,
    pub end: usize,
}

impl TemplateAst {
    pub fn root(&self) -> AstId {
        self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: AstId) -> Option<&AstNode> {
        self.nodes.get(id.0)
    }

    pub fn element(&self, id: AstId) -> Option<&ElementNode> {
        match self.nodes.get(id.0) {
            Some(AstNode::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn root_element(&self) -> Option<&ElementNode> {
        self.element(self.root)
    }

    pub fn children(&self, id: AstId) -> &[AstId] {
        self.element(id).map_or(&[], |el| &el.children)
    }

    /// Indented one-node-per-line dump used by `meadow parse`.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.outline_node(self.root, 0, &mut out);
        out
    }

    fn outline_node(&self, id: AstId, depth: usize, out: &mut String) {
        let pad = "  ".repeat(depth);
        match self.node(id) {
            Some(AstNode::Element(el)) => {
                let _ = write!(out, "{pad}<{}", el.tag);
                for (k, v) in &el.attrs {
                    let _ = write!(out, " {k}={v:?}");
                }
                out.push('>');
                for d in &el.directives {
                    let _ = write!(out, " [{}={:?}]", d.key, d.value);
                }
                out.push('\n');
                for child in &el.children {
                    self.outline_node(*child, depth + 1, out);
                }
            }
            Some(AstNode::Interpolated(t)) => {
                let _ = writeln!(out, "{pad}{{{{ {} }}}}", t.interpolation.expression());
            }
            Some(AstNode::Static(t)) => {
                let _ = writeln!(out, "{pad}{:?}", t.content.trim());
            }
            None => {}
        }
    }
}
