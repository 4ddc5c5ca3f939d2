//! Non-fatal problems found while parsing, compiling or rendering.
//!
//! Every report is logged through `tracing` and kept in a bounded
//! thread-local buffer so hosts can drain them after a render.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    Parse,
    Template,
    Expression,
    Directive,
    Props,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub component: String,
    pub tag: Option<String>,
    pub directive: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            component: component.into(),
            tag: None,
            directive: None,
            message: message.into(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directive = Some(directive.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] <{}>", self.kind, self.component)?;
        if let Some(tag) = &self.tag {
            write!(f, " in <{tag}>")?;
        }
        if let Some(directive) = &self.directive {
            write!(f, " ({directive})")?;
        }
        write!(f, ": {}", self.message)
    }
}

thread_local! {
    static BUFFER: RefCell<VecDeque<Diagnostic>> = const { RefCell::new(VecDeque::new()) };
}

pub fn report(diagnostic: Diagnostic) {
    tracing::warn!(
        kind = ?diagnostic.kind,
        component = %diagnostic.component,
        tag = diagnostic.tag.as_deref(),
        directive = diagnostic.directive.as_deref(),
        "{}",
        diagnostic.message
    );
    let capacity = config::current().diagnostic_capacity;
    BUFFER.with(|b| {
        let mut b = b.borrow_mut();
        while b.len() >= capacity {
            b.pop_front();
        }
        b.push_back(diagnostic);
    });
}

/// Drain every buffered diagnostic, oldest first.
pub fn take() -> Vec<Diagnostic> {
    BUFFER.with(|b| b.borrow_mut().drain(..).collect())
}

pub fn count() -> usize {
    BUFFER.with(|b| b.borrow().len())
}

pub fn clear() {
    BUFFER.with(|b| b.borrow_mut().clear());
}

/// Unrecoverable setup misuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fatal: {0}")]
pub struct Fatal(pub String);

pub fn fatal(message: impl Into<String>) -> Fatal {
    let message = message.into();
    tracing::error!("{message}");
    Fatal(message)
}
