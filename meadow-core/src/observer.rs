use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::value::Value;

pub type ListenerId = usize;

thread_local! {
    static NEXT_ID: Cell<ListenerId> = const { Cell::new(1) };
}

fn next_id() -> ListenerId {
    NEXT_ID.with(|n| {
        let id = n.get();
        n.set(id + 1);
        id
    })
}

struct Listener<T> {
    id: ListenerId,
    once: bool,
    f: Rc<dyn Fn(&T)>,
}

/// A list of listeners notified in registration order.
pub struct Observer<T> {
    listeners: RefCell<Vec<Listener<T>>>,
}

impl<T> Default for Observer<T> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
        }
    }
}

impl<T> Observer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, f: impl Fn(&T) + 'static) -> ListenerId {
        self.add(f, false)
    }

    /// Like `on`, but the listener is dropped after its first call.
    pub fn once(&self, f: impl Fn(&T) + 'static) -> ListenerId {
        self.add(f, true)
    }

    fn add(&self, f: impl Fn(&T) + 'static, once: bool) -> ListenerId {
        let id = next_id();
        self.listeners.borrow_mut().push(Listener {
            id,
            once,
            f: Rc::new(f),
        });
        id
    }

    /// Remove one listener, or all of them with `None`.
    pub fn remove(&self, id: Option<ListenerId>) {
        let mut listeners = self.listeners.borrow_mut();
        match id {
            Some(id) => listeners.retain(|l| l.id != id),
            None => listeners.clear(),
        }
    }

    /// Notify every listener; returns how many were called.
    pub fn emit(&self, value: &T) -> usize {
        // Snapshot first so listeners may register or remove others.
        let snapshot: Vec<Rc<dyn Fn(&T)>> = {
            let mut listeners = self.listeners.borrow_mut();
            let fs = listeners.iter().map(|l| l.f.clone()).collect();
            listeners.retain(|l| !l.once);
            fs
        };
        for f in &snapshot {
            f(value);
        }
        snapshot.len()
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Class-level notifications of a stateful component definition.
///
/// `next` may fire any number of times. The first `done` or `error` latches
/// the whole set: its listeners run once, every listener is dropped and later
/// emissions are ignored.
#[derive(Default)]
pub struct ComponentEvents {
    next: Observer<Value>,
    done: Observer<Value>,
    error: Observer<String>,
    finished: Cell<bool>,
}

impl ComponentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, f: impl Fn(&Value) + 'static) -> ListenerId {
        self.next.on(f)
    }

    pub fn once(&self, f: impl Fn(&Value) + 'static) -> ListenerId {
        self.next.once(f)
    }

    pub fn on_done(&self, f: impl Fn(&Value) + 'static) -> ListenerId {
        self.done.on(f)
    }

    pub fn on_error(&self, f: impl Fn(&String) + 'static) -> ListenerId {
        self.error.on(f)
    }

    pub fn remove(&self, id: Option<ListenerId>) {
        self.next.remove(id);
        self.done.remove(id);
        self.error.remove(id);
    }

    pub fn emit(&self, value: &Value) -> bool {
        if self.finished.get() {
            return false;
        }
        self.next.emit(value);
        true
    }

    pub fn done(&self, value: &Value) -> bool {
        if self.finished.replace(true) {
            return false;
        }
        self.done.emit(value);
        self.remove(None);
        true
    }

    pub fn error(&self, message: &str) -> bool {
        if self.finished.replace(true) {
            return false;
        }
        self.error.emit(&message.to_string());
        self.remove(None);
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }
}
