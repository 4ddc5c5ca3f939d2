pub mod config;
pub mod diagnostics;
pub mod observer;
pub mod scheduler;
pub mod scope;
pub mod value;

pub use config::RuntimeConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use value::{CallError, Function, Map, Value};
