//! Expression evaluation against a component.
//!
//! Identifiers resolve through arrow-function parameters, then the scope
//! chain (loop frames, then the grafted state or props object), then the
//! component's methods. Failures never escape: they are reported as
//! `Expression` diagnostics and evaluate to `undefined`.

mod builtins;

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

use meadow_core::diagnostics::{self, Diagnostic, DiagnosticKind};
use meadow_core::scope;
use meadow_core::value::format_number;
use meadow_core::{CallError, Map, Value};
use meadow_sfc::expr::{BinaryOp, Literal, UnaryOp};
use meadow_sfc::{Expr, Interpolation, Segment, SyntaxError, parse_expression};

use crate::error::ExprError;
use crate::instance::Context;

const CACHE_LIMIT: usize = 512;

thread_local! {
    static PARSED: RefCell<HashMap<String, Result<Rc<Expr>, SyntaxError>>> =
        RefCell::new(HashMap::new());
}

/// Parse `source`, memoised per source string.
pub(crate) fn parsed(source: &str) -> Result<Rc<Expr>, SyntaxError> {
    if let Some(hit) = PARSED.with(|c| c.borrow().get(source).cloned()) {
        return hit;
    }
    let result = parse_expression(source).map(Rc::new);
    PARSED.with(|c| {
        let mut c = c.borrow_mut();
        if c.len() >= CACHE_LIMIT {
            c.clear();
        }
        c.insert(source.to_string(), result.clone());
    });
    result
}

/// Evaluate `source`, reporting failures against `directive` and `tag`.
pub fn evaluate(source: &str, directive: &str, tag: &str, cx: &Context) -> Value {
    match try_evaluate(source, cx) {
        Ok(value) => value,
        Err(err) => {
            diagnostics::report(
                Diagnostic::new(DiagnosticKind::Expression, cx.name(), format!("`{source}`: {err}"))
                    .tag(tag)
                    .directive(directive),
            );
            Value::Undefined
        }
    }
}

pub fn try_evaluate(source: &str, cx: &Context) -> Result<Value, ExprError> {
    let expr = parsed(source)?;
    let _data = scope::graft_external(cx.data()).ok();
    Env::new(cx).eval(&expr)
}

/// Concatenate literal segments with the display form of each expression.
pub fn interpolate(interpolation: &Interpolation, tag: &str, cx: &Context) -> String {
    let mut out = String::new();
    for segment in &interpolation.segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Expr(source) => out.push_str(&evaluate(source, "{{ }}", tag, cx).to_display()),
        }
    }
    out
}

/// A function that evaluates `source` when called, with the loop bindings
/// visible now and `$event` bound to its first argument.
pub fn deferred(source: &str, directive: &str, tag: &str, cx: &Context) -> Value {
    let weak = cx.downgrade();
    let captured = scope::current_top();
    let (source, directive, tag) = (source.to_string(), directive.to_string(), tag.to_string());
    Value::function(move |args| {
        let Some(cx) = weak.upgrade() else {
            return Ok(Value::Undefined);
        };
        let _frame = scope::push(Some(captured.clone()));
        scope::bind("$event", args.first().cloned().unwrap_or_default())
            .map_err(|e| CallError(e.to_string()))?;
        Ok(evaluate(&source, &directive, &tag, &cx))
    })
}

/// Event handler value for `source`: references (`save`, `() => save(1)`)
/// are resolved now, anything else runs when the event fires.
pub(crate) fn handler(source: &str, directive: &str, tag: &str, cx: &Context) -> Value {
    match parsed(source) {
        Ok(expr) if !expr.is_reference() => deferred(source, directive, tag, cx),
        _ => evaluate(source, directive, tag, cx),
    }
}

struct Env<'a> {
    cx: &'a Context,
    locals: Vec<(String, Value)>,
}

impl<'a> Env<'a> {
    fn new(cx: &'a Context) -> Self {
        Self {
            cx,
            locals: Vec::new(),
        }
    }

    fn resolve(&self, name: &str) -> Result<Value, ExprError> {
        if let Some((_, v)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            return Ok(v.clone());
        }
        if let Some(v) = scope::lookup(name) {
            return Ok(v);
        }
        if let Some(method) = self.cx.method_value(name) {
            return Ok(method);
        }
        Err(ExprError::Reference(name.to_string()))
    }

    fn eval(&self, expr: &Expr) -> Result<Value, ExprError> {
        Ok(match expr {
            Expr::Literal(lit) => literal(lit),
            Expr::Ident(name) => self.resolve(name)?,
            Expr::This => self.cx.this_value(),
            Expr::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|e| self.eval(e))
                    .collect::<Result<_, _>>()?,
            ),
            Expr::Object(props) => {
                let mut map = Map::new();
                for (k, e) in props {
                    map.insert(k.clone(), self.eval(e)?);
                }
                Value::Object(map)
            }
            Expr::Member(object, prop) => member(&self.eval(object)?, prop)?,
            Expr::Index(object, index) => {
                let target = self.eval(object)?;
                let key = self.eval(index)?;
                index_value(&target, &key)?
            }
            Expr::Call(callee, args) => self.call(callee, args)?,
            Expr::Unary(op, operand) => {
                let v = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Value::Bool(!v.truthy()),
                    UnaryOp::Neg => Value::Number(-v.to_number()),
                    UnaryOp::Pos => Value::Number(v.to_number()),
                }
            }
            Expr::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs)?,
            Expr::Conditional(test, yes, no) => {
                if self.eval(test)?.truthy() {
                    self.eval(yes)?
                } else {
                    self.eval(no)?
                }
            }
            Expr::Arrow(params, body) => self.closure(params.clone(), Rc::clone(body)),
        })
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> Result<Value, ExprError> {
        let argv = args
            .iter()
            .map(|a| self.eval(a))
            .collect::<Result<Vec<_>, _>>()?;

        let target = match callee {
            Expr::Member(object, name) => {
                let receiver = self.eval(object)?;
                if let Some(Value::Function(f)) = receiver.get(name) {
                    return Ok(f.call(&argv)?);
                }
                if let Some(result) = builtins::call_method(&receiver, name, &argv) {
                    return result;
                }
                member(&receiver, name)?
            }
            other => self.eval(other)?,
        };
        match target {
            Value::Function(f) => Ok(f.call(&argv)?),
            _ => Err(ExprError::NotCallable(describe(callee))),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<Value, ExprError> {
        let l = self.eval(lhs)?;
        match op {
            BinaryOp::And if !l.truthy() => return Ok(l),
            BinaryOp::Or if l.truthy() => return Ok(l),
            BinaryOp::Nullish if !l.is_nullish() => return Ok(l),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => return self.eval(rhs),
            _ => {}
        }
        let r = self.eval(rhs)?;
        Ok(arithmetic(op, &l, &r))
    }

    /// Arrow functions capture the loop bindings visible at creation.
    fn closure(&self, params: Vec<String>, body: Rc<Expr>) -> Value {
        let weak = self.cx.downgrade();
        let mut captured = scope::current_top();
        for (k, v) in &self.locals {
            captured.insert(k.clone(), v.clone());
        }
        Value::function(move |args| {
            let cx = weak
                .upgrade()
                .ok_or_else(|| CallError("component has been dropped".into()))?;
            let _data = scope::graft_external(cx.data()).ok();
            let _frame = scope::push(Some(captured.clone()));
            let env = Env {
                cx: &cx,
                locals: params
                    .iter()
                    .cloned()
                    .zip(args.iter().cloned().chain(std::iter::repeat(Value::Undefined)))
                    .collect(),
            };
            env.eval(&body).map_err(|e| CallError(e.to_string()))
        })
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Undefined => Value::Undefined,
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Number(n) => Value::Number(*n),
        Literal::Str(s) => Value::String(s.clone()),
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::This => "this".into(),
        Expr::Member(object, prop) => format!("{}.{prop}", describe(object)),
        _ => "expression".into(),
    }
}

fn member(target: &Value, prop: &str) -> Result<Value, ExprError> {
    Ok(match target {
        Value::Undefined | Value::Null => {
            return Err(ExprError::Property {
                property: prop.to_string(),
                target: target.type_name(),
            });
        }
        Value::Object(map) => map.get(prop).cloned().unwrap_or_default(),
        Value::Array(items) if prop == "length" => Value::from(items.len()),
        Value::String(s) if prop == "length" => Value::from(s.chars().count()),
        _ => Value::Undefined,
    })
}

fn index_value(target: &Value, key: &Value) -> Result<Value, ExprError> {
    if let Value::Number(n) = key {
        let slot = (n.fract() == 0.0 && *n >= 0.0).then_some(*n as usize);
        match (target, slot) {
            (Value::Array(items), Some(i)) => return Ok(items.get(i).cloned().unwrap_or_default()),
            (Value::String(s), Some(i)) => {
                return Ok(s.chars().nth(i).map_or(Value::Undefined, |c| Value::String(c.into())));
            }
            _ => {}
        }
    }
    member(target, &js_string(key))
}

/// String conversion used by `+` and property keys.
pub(crate) fn js_string(v: &Value) -> String {
    match v {
        Value::Undefined => "undefined".into(),
        Value::Null => "null".into(),
        Value::Number(n) => format_number(*n),
        Value::Array(items) => items
            .iter()
            .map(|i| if i.is_nullish() { String::new() } else { js_string(i) })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".into(),
        other => other.to_display(),
    }
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Value {
    let num = |f: fn(f64, f64) -> f64| Value::Number(f(l.to_number(), r.to_number()));
    match op {
        BinaryOp::Add => {
            let stringy = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
            if stringy(l) || stringy(r) {
                Value::String(js_string(l) + &js_string(r))
            } else {
                num(|a, b| a + b)
            }
        }
        BinaryOp::Sub => num(|a, b| a - b),
        BinaryOp::Mul => num(|a, b| a * b),
        BinaryOp::Div => num(|a, b| a / b),
        BinaryOp::Rem => num(|a, b| a % b),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(r)),
        BinaryOp::StrictNe => Value::Bool(!l.strict_eq(r)),
        BinaryOp::Eq => Value::Bool(l.loose_eq(r)),
        BinaryOp::Ne => Value::Bool(!l.loose_eq(r)),
        BinaryOp::Lt => Value::Bool(compare(l, r) == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(compare(l, r) == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Bool(matches!(compare(l, r), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Ge => Value::Bool(matches!(compare(l, r), Some(Ordering::Greater | Ordering::Equal))),
        // short-circuited in `Env::binary`
        BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => Value::Undefined,
    }
}
