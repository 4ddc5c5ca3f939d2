//! In-memory DOM used as the patch target.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::{Event, EventHandler, Transition, WidgetRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

pub type SharedDocument = Rc<RefCell<Document>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
    #[error("index {index} is out of bounds for {parent:?}")]
    OutOfBounds { parent: NodeId, index: usize },
}

#[derive(Debug)]
enum NodeData {
    Element {
        tag: String,
        attrs: IndexMap<String, String>,
        handlers: IndexMap<String, EventHandler>,
    },
    Text(String),
}

#[derive(Debug)]
struct DomNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    widget: Option<WidgetRef>,
    transition: Option<Transition>,
}

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Arena of nodes rooted at a `<body>` element. Removed nodes stay in the
/// arena but are unreachable from the body.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<DomNode>,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            body: NodeId(0),
        };
        doc.body = doc.create_element("body");
        doc
    }

    pub fn shared() -> SharedDocument {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DomNode {
            data,
            parent: None,
            children: Vec::new(),
            widget: None,
            transition: None,
        });
        id
    }

    fn node(&self, id: NodeId) -> Result<&DomNode, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut DomNode, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element {
            tag: tag.to_string(),
            attrs: IndexMap::new(),
            handlers: IndexMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let len = self.node(parent)?.children.len();
        self.insert_child(parent, len, child)
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) -> Result<(), DomError> {
        if !matches!(self.node(parent)?.data, NodeData::Element { .. }) {
            return Err(DomError::NotAnElement(parent));
        }
        self.detach(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        if index > siblings.len() {
            return Err(DomError::OutOfBounds { parent, index });
        }
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Unlink `node` from its parent, if any. The subtree stays intact.
    pub fn detach(&mut self, node: NodeId) -> Result<(), DomError> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|c| *c != node);
        self.node_mut(node)?.parent = None;
        Ok(())
    }

    /// Put `new` where `old` is. `old` is detached.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), DomError> {
        if old == new {
            return Ok(());
        }
        let parent = self.node(old)?.parent.ok_or(DomError::Detached(old))?;
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|c| *c == old)
            .ok_or(DomError::Detached(old))?;
        self.detach(old)?;
        self.insert_child(parent, index, new)
    }

    /// Run leave hooks, then detach. Widgets mounted in the subtree are
    /// returned so the caller can destroy them.
    pub fn remove(&mut self, node: NodeId) -> Result<Vec<(NodeId, WidgetRef)>, DomError> {
        if let Some(t) = self.node(node)?.transition.clone() {
            t.run(Transition::LEAVE, self, node);
        }
        let widgets = self.widgets_in(node);
        self.detach(node)?;
        Ok(widgets)
    }

    /// Every widget mounted at `node` or below it, outermost first.
    pub fn widgets_in(&self, node: NodeId) -> Vec<(NodeId, WidgetRef)> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Ok(n) = self.node(id) else { continue };
            if let Some(w) = &n.widget {
                out.push((id, w.clone()));
            }
            stack.extend(n.children.iter().rev());
        }
        out
    }

    pub fn mark_widget(&mut self, node: NodeId, widget: Option<WidgetRef>) -> Result<(), DomError> {
        self.node_mut(node)?.widget = widget;
        Ok(())
    }

    pub fn widget(&self, node: NodeId) -> Option<&WidgetRef> {
        self.nodes.get(node.0)?.widget.as_ref()
    }

    pub(crate) fn set_transition(&mut self, node: NodeId, t: Option<Transition>) -> Result<(), DomError> {
        self.node_mut(node)?.transition = t;
        Ok(())
    }

    fn element_parts(
        &mut self,
        node: NodeId,
    ) -> Result<(&mut IndexMap<String, String>, &mut IndexMap<String, EventHandler>), DomError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Element {
                attrs, handlers, ..
            } => Ok((attrs, handlers)),
            NodeData::Text(_) => Err(DomError::NotAnElement(node)),
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.element_parts(node)?
            .0
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.element_parts(node)?.0.shift_remove(name);
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    /// `name` is the handler key, e.g. `onclick`.
    pub fn set_handler(&mut self, node: NodeId, name: &str, handler: EventHandler) -> Result<(), DomError> {
        self.element_parts(node)?.1.insert(name.to_string(), handler);
        Ok(())
    }

    pub fn remove_handler(&mut self, node: NodeId, name: &str) -> Result<(), DomError> {
        self.element_parts(node)?.1.shift_remove(name);
        Ok(())
    }

    pub fn handler(&self, node: NodeId, name: &str) -> Option<EventHandler> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { handlers, .. } => handlers.get(name).cloned(),
            NodeData::Text(_) => None,
        }
    }

    pub fn set_text(&mut self, node: NodeId, value: &str) -> Result<(), DomError> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(t) => {
                *t = value.to_string();
                Ok(())
            }
            NodeData::Element { .. } => Err(DomError::NotAnElement(node)),
        }
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(node.0)?.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(node.0).map_or(&[], |n| &n.children)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0)?.parent
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node.0) else { return };
        match &n.data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Element { .. } => {
                for c in &n.children {
                    self.collect_text(*c, out);
                }
            }
        }
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        let mut stack = vec![self.body];
        while let Some(node) = stack.pop() {
            if self.attribute(node, "id") == Some(id) {
                return Some(node);
            }
            stack.extend(self.children(node).iter().rev());
        }
        None
    }

    /// Outer HTML of `node`.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for c in self.children(node) {
            self.write_html(*c, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(node.0) else { return };
        match &n.data {
            NodeData::Text(t) => out.push_str(&escape(t, false)),
            NodeData::Element { tag, attrs, .. } => {
                let _ = write!(out, "<{tag}");
                for (k, v) in attrs {
                    if v.is_empty() {
                        let _ = write!(out, " {k}");
                    } else {
                        let _ = write!(out, " {k}=\"{}\"", escape(v, true));
                    }
                }
                out.push('>');
                if VOID.contains(&tag.as_str()) && n.children.is_empty() {
                    return;
                }
                for c in &n.children {
                    self.write_html(*c, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape(s: &str, attr: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Fire `name` at `target`, bubbling through its ancestors, then drain the
/// microtask queue so batched state updates flush. Returns how many handlers ran.
pub fn dispatch(doc: &SharedDocument, target: NodeId, name: &str, data: Option<String>) -> usize {
    let key = format!("on{name}");
    // Collect first: handlers may need the document themselves.
    let path: Vec<(NodeId, EventHandler)> = {
        let d = doc.borrow();
        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if let Some(h) = d.handler(node, &key) {
                path.push((node, h));
            }
            cursor = d.parent(node);
        }
        path
    };

    for (current_target, handler) in &path {
        handler.call(&Event {
            name: name.to_string(),
            target,
            current_target: *current_target,
            data: data.clone(),
        });
    }
    tracing::debug!(event = name, handlers = path.len(), "event dispatched");
    meadow_core::scheduler::run_microtasks();
    path.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_serialisation_escapes() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        doc.set_attribute(p, "title", "a\"b").unwrap();
        doc.set_attribute(p, "hidden", "").unwrap();
        let t = doc.create_text("1 < 2 & 3");
        doc.append_child(p, t).unwrap();
        let br = doc.create_element("br");
        doc.append_child(p, br).unwrap();
        assert_eq!(
            doc.to_html(p),
            "<p title=\"a&quot;b\" hidden>1 &lt; 2 &amp; 3<br></p>"
        );
    }
}
