//! Loop-variable scope chain.
//!
//! One chain exists per thread. Frames are layered: lookup walks from the
//! innermost frame outwards and finally falls through to the grafted
//! component data object.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::value::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScopeError {
    #[error("`{0}` is not a valid scope variable name")]
    InvalidName(String),
    #[error("no scope frame to bind `{0}` into")]
    NoFrame(String),
    #[error("only objects can be grafted into the scope chain, got {0}")]
    NotAnObject(&'static str),
}

#[derive(Default)]
struct ScopeChain {
    external: Option<Rc<Value>>,
    frames: Vec<Map>,
}

thread_local! {
    static CHAIN: RefCell<ScopeChain> = RefCell::new(ScopeChain::default());
}

/// Pops its frame (and any frame pushed above it) when dropped.
#[must_use = "the frame is popped as soon as the guard is dropped"]
pub struct FrameGuard {
    depth: usize,
    _local: PhantomData<*const ()>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        CHAIN.with(|c| c.borrow_mut().frames.truncate(self.depth));
        tracing::trace!(depth = self.depth, "scope frame popped");
    }
}

/// Restores the previously grafted data object when dropped.
#[must_use = "the graft is undone as soon as the guard is dropped"]
pub struct ExternalGuard {
    previous: Option<Rc<Value>>,
    _local: PhantomData<*const ()>,
}

impl Drop for ExternalGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CHAIN.with(|c| c.borrow_mut().external = previous);
    }
}

/// Push `frame` (or an empty one) on top of the chain.
pub fn push(frame: Option<Map>) -> FrameGuard {
    let depth = CHAIN.with(|c| {
        let mut c = c.borrow_mut();
        c.frames.push(frame.unwrap_or_default());
        c.frames.len() - 1
    });
    tracing::trace!(depth = depth + 1, "scope frame pushed");
    FrameGuard {
        depth,
        _local: PhantomData,
    }
}

/// Manually remove the top frame. Prefer dropping the `FrameGuard`.
pub fn pop() -> Option<Map> {
    CHAIN.with(|c| c.borrow_mut().frames.pop())
}

/// Bind `name` in the innermost frame.
pub fn bind(name: &str, value: Value) -> Result<(), ScopeError> {
    if !is_identifier(name) {
        return Err(ScopeError::InvalidName(name.to_string()));
    }
    CHAIN.with(|c| {
        let mut c = c.borrow_mut();
        let top = c
            .frames
            .last_mut()
            .ok_or_else(|| ScopeError::NoFrame(name.to_string()))?;
        top.insert(name.to_string(), value);
        Ok(())
    })
}

/// Innermost frame first, then the grafted data object.
pub fn lookup(name: &str) -> Option<Value> {
    CHAIN.with(|c| {
        let c = c.borrow();
        c.frames
            .iter()
            .rev()
            .find_map(|f| f.get(name))
            .or_else(|| c.external.as_deref().and_then(|data| data.get(name)))
            .cloned()
    })
}

/// Every loop binding visible from the top frame, inner bindings shadowing outer ones.
pub fn current_top() -> Map {
    CHAIN.with(|c| {
        let mut flat = Map::new();
        for frame in &c.borrow().frames {
            for (k, v) in frame {
                flat.insert(k.clone(), v.clone());
            }
        }
        flat
    })
}

/// Splice a component's data object beneath every loop frame.
pub fn graft_external(data: Rc<Value>) -> Result<ExternalGuard, ScopeError> {
    if !matches!(*data, Value::Object(_)) {
        return Err(ScopeError::NotAnObject(data.type_name()));
    }
    let previous = CHAIN.with(|c| {
        let mut c = c.borrow_mut();
        let already = c.external.as_ref().is_some_and(|cur| Rc::ptr_eq(cur, &data));
        if already {
            c.external.clone()
        } else {
            c.external.replace(data)
        }
    });
    Ok(ExternalGuard {
        previous,
        _local: PhantomData,
    })
}

pub fn external() -> Option<Rc<Value>> {
    CHAIN.with(|c| c.borrow().external.clone())
}

/// Clear every frame. The grafted object is left to its guard.
pub fn reset() {
    CHAIN.with(|c| c.borrow_mut().frames.clear());
}

pub fn depth() -> usize {
    CHAIN.with(|c| c.borrow().frames.len())
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("item"));
        assert!(is_identifier("$index"));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
    }
}
