pub mod expr;
pub mod sfc;
pub mod tags;
pub mod template_ast;
pub mod template_parse;

pub use expr::{Expr, ForAlias, SyntaxError, parse_expression, parse_for};
pub use sfc::{Attr, Block, Sfc, SfcError, parse_sfc};
pub use template_ast::{
    AstId, AstNode, DirectiveEntry, ElementNode, ForArgs, Interpolation, Segment, TemplateAst,
};
pub use template_parse::{ParseError, parse_template};
