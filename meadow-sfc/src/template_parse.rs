use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};

use crate::expr::parse_for;
use crate::template_ast::{
    AstId, AstNode, DirectiveEntry, ElementNode, ForArgs, InterpolatedText, Interpolation,
    StaticText, TemplateAst,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("<{component}> has an empty template")]
    Empty { component: String },
    #[error("<{component}>: missing end tag for <{tag}> near offset {offset}")]
    MissingEndTag {
        component: String,
        tag: String,
        offset: usize,
    },
    #[error("<{component}>: template has no root element")]
    NoRoot { component: String },
}

/// Parse a template into its AST.
///
/// Single forward scan: an opening tag, then static content up to the next
/// tag, then a closing tag that must match the innermost open element.
/// Closing tags for elements that were never opened are skipped. A closing
/// tag for an outer element while an inner one is still open stalls the
/// scan; the stall counter turns that into `MissingEndTag`.
pub fn parse_template(src: &str, component: &str) -> Result<TemplateAst, ParseError> {
    let source = src.trim();
    if source.is_empty() {
        return Err(ParseError::Empty {
            component: component.to_string(),
        });
    }

    let mut p = Scanner {
        src: source,
        pos: 0,
        nodes: Vec::new(),
        scope: None,
        roots: Vec::new(),
        component,
    };

    let mut stalled = 0usize;
    p.filter();
    while p.pos < p.src.len() {
        let before = p.pos;
        p.parse_start();
        p.parse_end();
        if p.pos == before {
            p.parse_static();
        }
        if p.pos == before {
            stalled += 1;
            if stalled > (p.src.len() - p.pos) / 4 {
                p.abandon_trailing_root()?;
                break;
            }
        }
    }
    if p.scope.is_some() {
        p.abandon_trailing_root()?;
    }

    let Some(&root) = p.roots.first() else {
        return Err(ParseError::NoRoot {
            component: component.to_string(),
        });
    };
    if let Some(&second) = p.roots.get(1) {
        diagnostics::report(Diagnostic::new(
            DiagnosticKind::Template,
            component,
            format!(
                "template has {} root elements, only the first is kept",
                p.roots.len()
            ),
        ));
        // Later roots and their descendants were allocated after the first tree.
        p.nodes.truncate(second.0);
    }

    tracing::debug!(component, nodes = p.nodes.len(), "template parsed");
    Ok(TemplateAst {
        nodes: p.nodes,
        root,
        source: source.to_string(),
    })
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
    nodes: Vec<AstNode>,
    scope: Option<AstId>,
    roots: Vec<AstId>,
    component: &'a str,
}

impl<'a> Scanner<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.src.len());
    }

    fn element_mut(&mut self, id: AstId) -> Option<&mut ElementNode> {
        match self.nodes.get_mut(id.0) {
            Some(AstNode::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element(&self, id: AstId) -> Option<&ElementNode> {
        match self.nodes.get(id.0) {
            Some(AstNode::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn missing_end_tag(&self) -> ParseError {
        let tag = self
            .scope
            .and_then(|id| self.element(id))
            .map(|el| el.tag.clone())
            .unwrap_or_default();
        ParseError::MissingEndTag {
            component: self.component.to_string(),
            tag,
            offset: self.pos,
        }
    }

    /// An unclosed element fails the parse unless it sits under a later
    /// root, which is discarded anyway once the first root is complete.
    fn abandon_trailing_root(&mut self) -> Result<(), ParseError> {
        let err = self.missing_end_tag();
        let first_closed = self
            .roots
            .first()
            .and_then(|&id| self.element(id))
            .is_some_and(|el| el.end.is_some());
        if !first_closed {
            return Err(err);
        }
        diagnostics::report(Diagnostic::new(DiagnosticKind::Parse, self.component, err.to_string()));
        self.scope = None;
        self.pos = self.src.len();
        Ok(())
    }

    /// Drop comments, `<![ ... ]>` sections and a doctype at the cursor.
    fn filter(&mut self) {
        loop {
            let rest = self.rest();
            if rest.starts_with("<!--") {
                let n = rest.find("-->").map_or(rest.len(), |end| end + 3);
                self.advance(n);
            } else if rest.starts_with("<![") {
                let n = rest.find("]>").map_or(rest.len(), |end| end + 2);
                self.advance(n);
            } else if rest.get(..10).is_some_and(|head| head.eq_ignore_ascii_case("<!doctype ")) {
                let n = rest.find('>').map_or(rest.len(), |end| end + 1);
                self.advance(n);
            } else {
                break;
            }
        }
    }

    fn push_node(&mut self, node: AstNode) -> AstId {
        let id = AstId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn parse_start(&mut self) {
        let rest = self.rest();
        if !rest.starts_with('<') {
            return;
        }
        let name_len = qname_len(&rest[1..]);
        if name_len == 0 {
            return;
        }
        let tag = rest[1..1 + name_len].to_string();
        let start = self.pos;

        let parent = self.scope;
        let id = self.push_node(AstNode::Element(ElementNode::new(tag, parent, start)));
        match parent.and_then(|p| self.element_mut(p)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        self.scope = Some(id);
        self.advance(1 + name_len);

        let self_closing = loop {
            if let Some((len, closing)) = start_tag_close(self.rest()) {
                self.advance(len);
                break Some(closing);
            }
            if self.pos >= self.src.len() {
                break None;
            }
            match read_attribute(self.rest()) {
                Some((len, name, value)) => {
                    self.advance(len);
                    self.add_attribute(id, name, value);
                }
                None => {
                    let skip = self.rest().chars().next().map_or(1, char::len_utf8);
                    self.advance(skip);
                }
            }
        };

        let Some(self_closing) = self_closing else { return };
        let is_void = self.element(id).is_some_and(|el| el.is_void);
        if self_closing || is_void {
            let end = self.pos;
            if let Some(el) = self.element_mut(id) {
                el.end = Some(end);
            }
            self.scope = parent;
        }

        while self.parse_static() {}
    }

    fn add_attribute(&mut self, id: AstId, name: &str, value: Option<String>) {
        let value = decode_entities(value.as_deref().unwrap_or(""));
        let is_directive = name.starts_with("v-") || name.starts_with('@') || name.starts_with(':');
        if !is_directive {
            if let Some(el) = self.element_mut(id) {
                el.attrs.insert(name.to_string(), value);
            }
            return;
        }

        let key = if let Some(bound) = name.strip_prefix(':') {
            format!("v-bind:{}", bound.trim_start_matches(':'))
        } else if let Some(event) = name.strip_prefix('@') {
            format!("v-on:{event}")
        } else {
            name.to_string()
        };

        let component = self.component;
        let Some(el) = self.element_mut(id) else { return };
        match key.as_str() {
            "v-for" => match parse_for(&value) {
                Ok(header) => {
                    el.for_args = Some(ForArgs {
                        alias: header.alias,
                        source: header.source,
                    });
                    el.mark_for();
                }
                Err(err) => {
                    diagnostics::report(
                        Diagnostic::new(DiagnosticKind::Parse, component, err.to_string())
                            .tag(el.tag.clone())
                            .directive("v-for"),
                    );
                    return;
                }
            },
            "v-if" => el.has_if = true,
            _ => {}
        }
        el.directives.push(DirectiveEntry { key, value });
    }

    /// Consume one run of text at the cursor. Returns false when there is none.
    fn parse_static(&mut self) -> bool {
        self.filter();
        let len = text_run_len(self.rest());
        if len == 0 {
            return false;
        }
        let start = self.pos;
        let content = self.rest()[..len].to_string();
        self.advance(len);
        let end = self.pos;

        let Some(parent) = self.scope else {
            if !content.trim().is_empty() {
                diagnostics::report(Diagnostic::new(
                    DiagnosticKind::Template,
                    self.component,
                    format!("text outside the root element is ignored: {:?}", content.trim()),
                ));
            }
            return true;
        };

        let node = match Interpolation::parse(&content) {
            Some(interpolation) => AstNode::Interpolated(InterpolatedText {
                content,
                interpolation,
                parent,
                start,
                end,
            }),
            None => AstNode::Static(StaticText {
                content,
                parent,
                start,
                end,
            }),
        };
        let id = self.push_node(node);
        if let Some(el) = self.element_mut(parent) {
            el.children.push(id);
        }
        true
    }

    fn parse_end(&mut self) {
        let Some((len, tag)) = end_tag(self.rest()) else { return };
        let current = self.scope.and_then(|id| self.element(id).map(|el| (id, el)));
        match current {
            Some((id, el)) if el.tag == tag => {
                let parent = el.parent;
                self.advance(len);
                let end = self.pos;
                if let Some(el) = self.element_mut(id) {
                    el.end = Some(end);
                }
                self.scope = parent;
                while self.parse_static() {}
            }
            _ if !self.is_open(&tag) => {
                tracing::debug!(component = self.component, tag = %tag, "stray closing tag skipped");
                self.advance(len);
            }
            // Closes an outer element while an inner one is still open.
            _ => {}
        }
    }

    fn is_open(&self, tag: &str) -> bool {
        let mut cursor = self.scope;
        while let Some(el) = cursor.and_then(|id| self.element(id)) {
            if el.tag == tag {
                return true;
            }
            cursor = el.parent;
        }
        false
    }
}

/// `[a-zA-Z_][\w\-.]*` optionally prefixed by `ns:`.
fn qname_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let ncname = |from: usize| -> usize {
        match bytes.get(from) {
            Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
            _ => return 0,
        }
        let mut i = from + 1;
        while i < bytes.len()
            && (bytes[i].is_ascii_alphanumeric() || matches!(bytes[i], b'_' | b'-' | b'.'))
        {
            i += 1;
        }
        i - from
    };
    let first = ncname(0);
    if first > 0 && bytes.get(first) == Some(&b':') {
        let second = ncname(first + 1);
        if second > 0 {
            return first + 1 + second;
        }
    }
    first
}

/// `\s*(/?)>` at the start of `s`: consumed length and whether it self-closes.
fn start_tag_close(s: &str) -> Option<(usize, bool)> {
    let ws = s.len() - s.trim_start().len();
    let rest = &s[ws..];
    if rest.starts_with("/>") {
        Some((ws + 2, true))
    } else if rest.starts_with('>') {
        Some((ws + 1, false))
    } else {
        None
    }
}

/// `name[=("v"|'v'|bare)]`, leading whitespace allowed.
fn read_attribute(s: &str) -> Option<(usize, &str, Option<String>)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let name_start = i;
    while i < bytes.len()
        && !bytes[i].is_ascii_whitespace()
        && !matches!(bytes[i], b'"' | b'\'' | b'<' | b'>' | b'/' | b'=')
    {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = &s[name_start..i];

    let mut j = i;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }
    if bytes.get(j) != Some(&b'=') {
        return Some((i, name, None));
    }
    j += 1;
    while j < bytes.len() && bytes[j].is_ascii_whitespace() {
        j += 1;
    }
    match bytes.get(j) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let close = s[j + 1..].find(q as char)?;
            let value = s[j + 1..j + 1 + close].to_string();
            Some((j + 1 + close + 1, name, Some(value)))
        }
        Some(_) => {
            let start = j;
            while j < bytes.len()
                && !bytes[j].is_ascii_whitespace()
                && !matches!(bytes[j], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
            {
                j += 1;
            }
            if j == start {
                return Some((i, name, None));
            }
            Some((j, name, Some(s[start..j].to_string())))
        }
        None => Some((i, name, None)),
    }
}

/// `</name ...>`: consumed length and tag name.
fn end_tag(s: &str) -> Option<(usize, String)> {
    let rest = s.strip_prefix("</")?;
    let name_len = qname_len(rest);
    if name_len == 0 {
        return None;
    }
    let close = rest[name_len..].find('>')?;
    Some((2 + name_len + close + 1, rest[..name_len].to_string()))
}

/// Length of the text run at the start of `s`: up to the next `<` that opens
/// a tag, a closing tag or a comment. `{{ ... }}` is skipped whole, so
/// expressions may contain `<`.
fn text_run_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' && bytes.get(i + 1) == Some(&b'{') {
            if let Some(close) = s[i + 2..].find("}}") {
                i += 2 + close + 2;
                continue;
            }
        }
        if bytes[i] == b'<' {
            match bytes.get(i + 1) {
                Some(b) if b.is_ascii_alphabetic() || matches!(b, b'_' | b'/' | b'!') => break,
                _ => {}
            }
        }
        i += 1;
    }
    i
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#10;", "\n")
        .replace("&#9;", "\t")
        .replace("&amp;", "&")
}
