//! Template expressions, parsed once into an `Expr` tree.

use std::rc::Rc;
use std::sync::LazyLock;

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest::pratt_parser::{Assoc, Op, PrattParser};

#[derive(pest_derive::Parser)]
#[grammar = "expr.pest"]
struct ExprParser;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Nullish,
    Or,
    And,
    StrictEq,
    StrictNe,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Ident(String),
    This,
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Arrow(Vec<String>, Rc<Expr>),
}

impl Expr {
    /// Plain references (`save`, `actions.save`) name a handler instead of invoking one.
    pub fn is_reference(&self) -> bool {
        match self {
            Expr::Ident(_) | Expr::Arrow(..) => true,
            Expr::Member(object, _) => object.is_reference() || matches!(**object, Expr::This),
            _ => false,
        }
    }
}

/// Loop variable(s) of a `v-for` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForAlias {
    Single(String),
    Pair(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForHeader {
    pub alias: ForAlias,
    /// Source text of the iterated expression.
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot parse `{input}` at column {column}: {message}")]
pub struct SyntaxError {
    pub input: String,
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    fn from_pest(input: &str, err: pest::error::Error<Rule>) -> Self {
        let column = match err.line_col {
            pest::error::LineColLocation::Pos((_, c)) => c,
            pest::error::LineColLocation::Span((_, c), _) => c,
        };
        Self {
            input: input.to_string(),
            column,
            message: err.variant.message().into_owned(),
        }
    }

    fn at(pair: &Pair<Rule>, message: impl Into<String>) -> Self {
        Self {
            input: pair.get_input().to_string(),
            column: pair.as_span().start() + 1,
            message: message.into(),
        }
    }
}

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::nullish, Assoc::Left))
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::strict_eq, Assoc::Left)
            | Op::infix(Rule::strict_ne, Assoc::Left)
            | Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::not) | Op::prefix(Rule::neg) | Op::prefix(Rule::pos))
        .op(Op::postfix(Rule::member) | Op::postfix(Rule::index) | Op::postfix(Rule::call))
});

pub fn parse_expression(src: &str) -> Result<Expr, SyntaxError> {
    let mut pairs =
        ExprParser::parse(Rule::expression, src).map_err(|e| SyntaxError::from_pest(src, e))?;
    let root = pairs
        .next()
        .and_then(|p| p.into_inner().next())
        .ok_or_else(|| SyntaxError {
            input: src.to_string(),
            column: 1,
            message: "empty expression".into(),
        })?;
    build_expr(root)
}

/// Parse `alias of source`, `(value, key) of source` (or `in`).
pub fn parse_for(src: &str) -> Result<ForHeader, SyntaxError> {
    let mut pairs =
        ExprParser::parse(Rule::for_header, src).map_err(|e| SyntaxError::from_pest(src, e))?;
    let header = pairs.next().ok_or_else(|| SyntaxError {
        input: src.to_string(),
        column: 1,
        message: "empty loop header".into(),
    })?;

    let mut alias = None;
    let mut source = None;
    for part in header.into_inner() {
        match part.as_rule() {
            Rule::for_alias => {
                let names: Vec<String> = part.into_inner().map(|p| p.as_str().to_string()).collect();
                alias = match names.as_slice() {
                    [value] => Some(ForAlias::Single(value.clone())),
                    [value, key] => Some(ForAlias::Pair(value.clone(), key.clone())),
                    _ => None,
                };
            }
            Rule::expr => {
                build_expr(part.clone())?;
                source = Some(part.as_str().trim().to_string());
            }
            _ => {}
        }
    }
    match (alias, source) {
        (Some(alias), Some(source)) => Ok(ForHeader { alias, source }),
        _ => Err(SyntaxError {
            input: src.to_string(),
            column: 1,
            message: "expected `alias of expression`".into(),
        }),
    }
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, SyntaxError> {
    match pair.as_rule() {
        Rule::expr => {
            let inner = pair
                .clone()
                .into_inner()
                .next()
                .ok_or_else(|| SyntaxError::at(&pair, "empty expression"))?;
            build_expr(inner)
        }
        Rule::arrow => {
            let mut inner = pair.clone().into_inner();
            let params = inner
                .next()
                .ok_or_else(|| SyntaxError::at(&pair, "arrow without parameters"))?
                .into_inner()
                .map(|p| p.as_str().to_string())
                .collect();
            let body = inner
                .next()
                .ok_or_else(|| SyntaxError::at(&pair, "arrow without body"))?;
            Ok(Expr::Arrow(params, Rc::new(build_expr(body)?)))
        }
        Rule::conditional => {
            let mut inner = pair.clone().into_inner();
            let test = inner
                .next()
                .ok_or_else(|| SyntaxError::at(&pair, "empty conditional"))?;
            let test = build_expr(test)?;
            match (inner.next(), inner.next()) {
                (Some(then), Some(otherwise)) => Ok(Expr::Conditional(
                    Box::new(test),
                    Box::new(build_expr(then)?),
                    Box::new(build_expr(otherwise)?),
                )),
                _ => Ok(test),
            }
        }
        Rule::binary => build_binary(pair.into_inner()),
        _ => build_primary(pair),
    }
}

fn build_binary(pairs: Pairs<Rule>) -> Result<Expr, SyntaxError> {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, rhs| {
            let op = match op.as_rule() {
                Rule::not => UnaryOp::Not,
                Rule::neg => UnaryOp::Neg,
                _ => UnaryOp::Pos,
            };
            Ok(Expr::Unary(op, Box::new(rhs?)))
        })
        .map_postfix(|lhs, op| {
            let lhs = Box::new(lhs?);
            match op.as_rule() {
                Rule::member => {
                    let name = op.clone().into_inner().next().map(|p| p.as_str().to_string());
                    name.map(|n| Expr::Member(lhs, n))
                        .ok_or_else(|| SyntaxError::at(&op, "expected property name"))
                }
                Rule::index => {
                    let key = op
                        .clone()
                        .into_inner()
                        .next()
                        .ok_or_else(|| SyntaxError::at(&op, "empty index"))?;
                    Ok(Expr::Index(lhs, Box::new(build_expr(key)?)))
                }
                _ => {
                    let args = op.into_inner().map(build_expr).collect::<Result<_, _>>()?;
                    Ok(Expr::Call(lhs, args))
                }
            }
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::nullish => BinaryOp::Nullish,
                Rule::or => BinaryOp::Or,
                Rule::and => BinaryOp::And,
                Rule::strict_eq => BinaryOp::StrictEq,
                Rule::strict_ne => BinaryOp::StrictNe,
                Rule::eq => BinaryOp::Eq,
                Rule::ne => BinaryOp::Ne,
                Rule::lt => BinaryOp::Lt,
                Rule::le => BinaryOp::Le,
                Rule::gt => BinaryOp::Gt,
                Rule::ge => BinaryOp::Ge,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            Ok(Expr::Binary(op, Box::new(lhs?), Box::new(rhs?)))
        })
        .parse(pairs)
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr, SyntaxError> {
    Ok(match pair.as_rule() {
        Rule::number => {
            let n = pair
                .as_str()
                .parse()
                .map_err(|_| SyntaxError::at(&pair, "invalid number"))?;
            Expr::Literal(Literal::Number(n))
        }
        Rule::string => Expr::Literal(Literal::Str(string_value(&pair))),
        Rule::true_kw => Expr::Literal(Literal::Bool(true)),
        Rule::false_kw => Expr::Literal(Literal::Bool(false)),
        Rule::null_kw => Expr::Literal(Literal::Null),
        Rule::undefined_kw => Expr::Literal(Literal::Undefined),
        Rule::this_kw => Expr::This,
        Rule::ident => Expr::Ident(pair.as_str().to_string()),
        Rule::array => Expr::Array(pair.into_inner().map(build_expr).collect::<Result<_, _>>()?),
        Rule::object => {
            let mut props = Vec::new();
            for prop in pair.into_inner() {
                let mut inner = prop.clone().into_inner();
                let key = inner
                    .next()
                    .ok_or_else(|| SyntaxError::at(&prop, "empty property"))?;
                match key.as_rule() {
                    Rule::shorthand => {
                        let name = key.as_str().trim().to_string();
                        props.push((name.clone(), Expr::Ident(name)));
                    }
                    _ => {
                        let name = match key.as_rule() {
                            Rule::string => string_value(&key),
                            _ => key.as_str().to_string(),
                        };
                        let value = inner
                            .next()
                            .ok_or_else(|| SyntaxError::at(&prop, "missing property value"))?;
                        props.push((name, build_expr(value)?));
                    }
                }
            }
            Expr::Object(props)
        }
        Rule::expr | Rule::arrow | Rule::conditional | Rule::binary => build_expr(pair)?,
        _ => return Err(SyntaxError::at(&pair, "unexpected token")),
    })
}

fn string_value(pair: &Pair<Rule>) -> String {
    let raw = pair.clone().into_inner().next().map(|p| p.as_str()).unwrap_or("");
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_are_decoded() {
        let e = parse_expression(r#""a\"b\n""#).unwrap();
        assert_eq!(e, Expr::Literal(Literal::Str("a\"b\n".into())));
    }

    #[test]
    fn references_are_detected() {
        assert!(parse_expression("save").unwrap().is_reference());
        assert!(parse_expression("this.save").unwrap().is_reference());
        assert!(parse_expression("e => save(e)").unwrap().is_reference());
        assert!(!parse_expression("save(1)").unwrap().is_reference());
    }
}
