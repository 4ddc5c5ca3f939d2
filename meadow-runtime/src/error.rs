use meadow_core::CallError;
use meadow_core::scope::ScopeError;
use meadow_dom::DomError;
use meadow_sfc::SyntaxError;

/// Failures that abort a render. Everything else is a diagnostic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("component `{0}` has no usable template")]
    NoAst(String),
    #[error(transparent)]
    Scope(#[from] ScopeError),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("component `{0}` is not mounted")]
    Detached(String),
    #[error("the document is borrowed elsewhere")]
    DocumentBusy,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExprError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("{0} is not defined")]
    Reference(String),
    #[error("cannot read property `{property}` of {target}")]
    Property {
        property: String,
        target: &'static str,
    },
    #[error("{0} is not a function")]
    NotCallable(String),
    #[error(transparent)]
    Call(#[from] CallError),
}
