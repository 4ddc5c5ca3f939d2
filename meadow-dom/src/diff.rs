use crate::{EventHandler, Props, VNode, WidgetRef};

#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    Replace(VNode),
    SetAttr(String, String),
    RemoveAttr(String),
    SetHandler(String, EventHandler),
    RemoveHandler(String),
    UpdateWidget { previous: WidgetRef, next: WidgetRef },
    UpdateChild(usize, Vec<Patch>),
    InsertChild(usize, VNode),
    RemoveChild(usize),
}

pub fn diff(old: &VNode, new: &VNode) -> Vec<Patch> {
    match (old, new) {
        (VNode::Text(a), VNode::Text(b)) => {
            if a != b {
                vec![Patch::Replace(new.clone())]
            } else {
                vec![]
            }
        }
        (VNode::Widget(a), VNode::Widget(b)) => {
            if a.identity() == b.identity() {
                vec![Patch::UpdateWidget {
                    previous: a.clone(),
                    next: b.clone(),
                }]
            } else {
                vec![Patch::Replace(new.clone())]
            }
        }
        (
            VNode::Element {
                tag: tag_a,
                props: props_a,
                children: children_a,
                key: key_a,
                ..
            },
            VNode::Element {
                tag: tag_b,
                props: props_b,
                children: children_b,
                key: key_b,
                ..
            },
        ) => {
            if tag_a != tag_b || key_a != key_b {
                return vec![Patch::Replace(new.clone())];
            }
            let mut patches = Vec::new();
            patches.extend(diff_props(props_a, props_b));
            patches.extend(diff_handlers(props_a, props_b));
            patches.extend(diff_children(children_a, children_b));
            patches
        }
        _ => vec![Patch::Replace(new.clone())],
    }
}

fn diff_props(a: &Props, b: &Props) -> Vec<Patch> {
    let mut patches = Vec::new();
    let (old, new) = (a.dom_attributes(), b.dom_attributes());
    // Set new and changed
    for (k, v_new) in &new {
        match old.get(k) {
            Some(v_old) if v_old == v_new => {}
            _ => patches.push(Patch::SetAttr(k.to_string(), v_new.to_string())),
        }
    }
    // Remove missing
    for k in old.keys() {
        if !new.contains_key(k) {
            patches.push(Patch::RemoveAttr(k.to_string()));
        }
    }
    patches
}

fn diff_handlers(a: &Props, b: &Props) -> Vec<Patch> {
    let mut patches = Vec::new();
    for (k, h_new) in &b.handlers {
        match a.handlers.get(k) {
            Some(h_old) if h_old == h_new => {}
            _ => patches.push(Patch::SetHandler(k.clone(), h_new.clone())),
        }
    }
    for k in a.handlers.keys() {
        if !b.handlers.contains_key(k) {
            patches.push(Patch::RemoveHandler(k.clone()));
        }
    }
    patches
}

fn diff_children(a: &[VNode], b: &[VNode]) -> Vec<Patch> {
    let mut patches = Vec::new();
    let common = a.len().min(b.len());
    for i in 0..common {
        let child_patches = diff(&a[i], &b[i]);
        if !child_patches.is_empty() {
            patches.push(Patch::UpdateChild(i, child_patches));
        }
    }
    // Inserts
    if b.len() > a.len() {
        for (i, node) in b.iter().enumerate().skip(a.len()) {
            patches.push(Patch::InsertChild(i, node.clone()));
        }
    }
    // Removes, highest index first so earlier indices stay valid
    if a.len() > b.len() {
        for i in (b.len()..a.len()).rev() {
            patches.push(Patch::RemoveChild(i));
        }
    }
    patches
}
