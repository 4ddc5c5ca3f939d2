use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

type Task = Box<dyn FnOnce()>;

// Microtask-style queue drained at the end of a synchronous turn.
thread_local! {
    static QUEUE: RefCell<VecDeque<Task>> = RefCell::new(VecDeque::new());
    static IS_FLUSHING: Cell<bool> = const { Cell::new(false) };
}

/// Schedule `task` to run on the next `run_microtasks` call.
pub fn queue_microtask(task: impl FnOnce() + 'static) {
    QUEUE.with(|q| q.borrow_mut().push_back(Box::new(task)));
}

struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        IS_FLUSHING.with(|f| f.set(false));
    }
}

/// Run queued tasks in FIFO order until the queue is empty, including tasks
/// queued while draining. Returns how many ran; a nested call returns 0 and
/// leaves the work to the outer drain.
pub fn run_microtasks() -> usize {
    if IS_FLUSHING.with(|f| f.replace(true)) {
        return 0;
    }
    let _guard = FlushGuard;

    let mut ran = 0;
    loop {
        // Pop without holding the borrow while the task runs; it may enqueue more.
        let next = QUEUE.with(|q| q.borrow_mut().pop_front());
        let Some(task) = next else { break };
        task();
        ran += 1;
    }
    if ran > 0 {
        tracing::debug!(ran, "microtasks drained");
    }
    ran
}

pub fn pending() -> usize {
    QUEUE.with(|q| q.borrow().len())
}
