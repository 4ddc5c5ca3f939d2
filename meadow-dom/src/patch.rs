use crate::diff::Patch;
use crate::document::{Document, DomError, NodeId};
use crate::{Transition, VNode};

/// Build DOM nodes for `vnode`. Custom-directive hooks run once the element
/// and its children exist, then the enter transition.
pub fn create_element(doc: &mut Document, vnode: &VNode) -> Result<NodeId, DomError> {
    match vnode {
        VNode::Text(t) => Ok(doc.create_text(t)),
        VNode::Widget(w) => {
            let node = w.init(doc);
            doc.mark_widget(node, Some(w.clone()))?;
            Ok(node)
        }
        VNode::Element {
            tag,
            props,
            children,
            custom_direction,
            transition,
            ..
        } => {
            let node = doc.create_element(tag);
            for (k, v) in props.dom_attributes() {
                doc.set_attribute(node, k, v)?;
            }
            for (k, h) in &props.handlers {
                doc.set_handler(node, k, h.clone())?;
            }
            for child in children {
                let c = create_element(doc, child)?;
                doc.append_child(node, c)?;
            }
            for hook in custom_direction.values() {
                hook.call(doc, node);
            }
            if let Some(t) = transition {
                t.run(Transition::ENTER, doc, node);
                doc.set_transition(node, Some(t.clone()))?;
            }
            Ok(node)
        }
    }
}

fn destroy_widgets(doc: &mut Document, widgets: Vec<(NodeId, crate::WidgetRef)>) {
    for (node, w) in widgets {
        w.destroy(node, doc);
    }
}

fn child_at(doc: &Document, parent: NodeId, index: usize) -> Result<NodeId, DomError> {
    doc.children(parent)
        .get(index)
        .copied()
        .ok_or(DomError::OutOfBounds { parent, index })
}

/// Apply `patches` to `node`; returns the node now standing in its place.
pub fn patch(doc: &mut Document, node: NodeId, patches: &[Patch]) -> Result<NodeId, DomError> {
    let mut node = node;
    for p in patches {
        match p {
            Patch::Replace(vnode) => {
                let widgets = doc.widgets_in(node);
                destroy_widgets(doc, widgets);
                let new = create_element(doc, vnode)?;
                if doc.parent(node).is_some() {
                    doc.replace(node, new)?;
                }
                node = new;
            }
            Patch::SetAttr(k, v) => doc.set_attribute(node, k, v)?,
            Patch::RemoveAttr(k) => doc.remove_attribute(node, k)?,
            Patch::SetHandler(k, h) => doc.set_handler(node, k, h.clone())?,
            Patch::RemoveHandler(k) => doc.remove_handler(node, k)?,
            Patch::UpdateWidget { previous, next } => {
                let new = next.update(previous, node, doc);
                if new != node {
                    if doc.parent(node).is_some() {
                        doc.replace(node, new)?;
                    }
                    doc.mark_widget(node, None)?;
                }
                doc.mark_widget(new, Some(next.clone()))?;
                node = new;
            }
            Patch::UpdateChild(i, child_patches) => {
                let child = child_at(doc, node, *i)?;
                patch(doc, child, child_patches)?;
            }
            Patch::InsertChild(i, vnode) => {
                let child = create_element(doc, vnode)?;
                doc.insert_child(node, *i, child)?;
            }
            Patch::RemoveChild(i) => {
                let child = child_at(doc, node, *i)?;
                let widgets = doc.remove(child)?;
                destroy_widgets(doc, widgets);
            }
        }
    }
    Ok(node)
}
