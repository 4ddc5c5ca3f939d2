//! Compiled template cache, one entry per component definition.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_sfc::{TemplateAst, parse_template};

use crate::component::{ComponentDef, ComponentId};
use crate::error::RenderError;

struct Entry {
    source: String,
    /// `None` when `source` failed to parse.
    ast: Option<Rc<TemplateAst>>,
}

thread_local! {
    static ASTS: RefCell<HashMap<ComponentId, Entry>> = RefCell::new(HashMap::new());
}

/// The AST for `source`, parsing only when the definition has no entry or
/// its template text changed. A parse failure is reported once per source.
pub fn ast_for(def: &ComponentDef, source: &str) -> Result<Rc<TemplateAst>, RenderError> {
    let cached = ASTS.with(|a| {
        a.borrow()
            .get(&def.id())
            .filter(|e| e.source == source)
            .map(|e| e.ast.clone())
    });
    let ast = match cached {
        Some(ast) => ast,
        None => {
            tracing::debug!(component = def.name(), "compiling template");
            let ast = match parse_template(source, def.name()) {
                Ok(ast) => Some(Rc::new(ast)),
                Err(err) => {
                    diagnostics::report(Diagnostic::new(DiagnosticKind::Parse, def.name(), err.to_string()));
                    None
                }
            };
            ASTS.with(|a| {
                a.borrow_mut().insert(
                    def.id(),
                    Entry {
                        source: source.to_string(),
                        ast: ast.clone(),
                    },
                )
            });
            ast
        }
    };
    ast.ok_or_else(|| RenderError::NoAst(def.name().to_string()))
}

/// Drop the cached AST so the next render parses again.
pub fn invalidate(id: ComponentId) -> bool {
    ASTS.with(|a| a.borrow_mut().remove(&id).is_some())
}

pub fn clear() {
    ASTS.with(|a| a.borrow_mut().clear());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reparses_only_when_source_changes() {
        let def = ComponentDef::stateless("Cached", |_| String::new());
        let a = ast_for(&def, "<p>one</p>").unwrap();
        let b = ast_for(&def, "<p>one</p>").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        let c = ast_for(&def, "<p>two</p>").unwrap();
        assert!(!Rc::ptr_eq(&a, &c));
        assert!(invalidate(def.id()));
        assert!(!invalidate(def.id()));
    }

    #[test]
    fn parse_failure_is_reported_once() {
        diagnostics::clear();
        let def = ComponentDef::stateless("Broken", |_| String::new());
        assert!(matches!(ast_for(&def, "<div><p></div>"), Err(RenderError::NoAst(_))));
        assert!(ast_for(&def, "<div><p></div>").is_err());
        let parse: Vec<_> = diagnostics::take()
            .into_iter()
            .filter(|d| d.kind == DiagnosticKind::Parse)
            .collect();
        assert_eq!(parse.len(), 1);
    }
}
