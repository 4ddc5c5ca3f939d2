//! The handful of string, array and number methods templates commonly use.

use meadow_core::Value;
use meadow_core::value::format_number;

use super::js_string;
use crate::error::ExprError;

/// `None` when `name` is not a builtin of the receiver's type.
pub(super) fn call_method(receiver: &Value, name: &str, args: &[Value]) -> Option<Result<Value, ExprError>> {
    match receiver {
        Value::String(s) => string_method(s, name, args).map(Ok),
        Value::Array(items) => array_method(items, name, args),
        Value::Number(n) => number_method(*n, name, args).map(Ok),
        Value::Bool(_) if name == "toString" => Some(Ok(Value::String(js_string(receiver)))),
        _ => None,
    }
}

fn arg_str(args: &[Value], i: usize) -> String {
    args.get(i).map(js_string).unwrap_or_default()
}

/// Resolve a possibly negative `slice` bound against `len`.
fn bound(arg: Option<&Value>, len: usize, default: usize) -> usize {
    let Some(v) = arg.filter(|v| !matches!(v, Value::Undefined)) else {
        return default;
    };
    let n = v.to_number();
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        len.saturating_sub((-n) as usize)
    } else {
        (n as usize).min(len)
    }
}

fn string_method(s: &str, name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "toUpperCase" => s.to_uppercase().into(),
        "toLowerCase" => s.to_lowercase().into(),
        "trim" => s.trim().into(),
        "toString" => s.into(),
        "includes" => Value::Bool(s.contains(&arg_str(args, 0))),
        "startsWith" => Value::Bool(s.starts_with(&arg_str(args, 0))),
        "endsWith" => Value::Bool(s.ends_with(&arg_str(args, 0))),
        "indexOf" => {
            let needle = arg_str(args, 0);
            match s.find(&needle) {
                Some(byte) => Value::from(s[..byte].chars().count()),
                None => Value::Number(-1.0),
            }
        }
        "charAt" => {
            let i = args.first().map_or(0.0, Value::to_number);
            let c = (i >= 0.0).then(|| s.chars().nth(i as usize)).flatten();
            c.map(String::from).unwrap_or_default().into()
        }
        "slice" => {
            let chars: Vec<char> = s.chars().collect();
            let start = bound(args.first(), chars.len(), 0);
            let end = bound(args.get(1), chars.len(), chars.len());
            chars[start..end.max(start)].iter().collect::<String>().into()
        }
        "split" => match args.first() {
            None | Some(Value::Undefined) => Value::Array(vec![s.into()]),
            Some(sep) => {
                let sep = js_string(sep);
                if sep.is_empty() {
                    Value::Array(s.chars().map(|c| String::from(c).into()).collect())
                } else {
                    Value::Array(s.split(sep.as_str()).map(Value::from).collect())
                }
            }
        },
        "repeat" => {
            let n = args.first().map_or(0.0, Value::to_number);
            if n.is_finite() && n >= 0.0 { s.repeat(n as usize).into() } else { Value::Undefined }
        }
        _ => return None,
    })
}

fn array_method(items: &[Value], name: &str, args: &[Value]) -> Option<Result<Value, ExprError>> {
    let callback = || match args.first() {
        Some(Value::Function(f)) => Ok(f.clone()),
        _ => Err(ExprError::NotCallable(format!("{name} callback"))),
    };
    let value = match name {
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(sep) => js_string(sep),
            };
            let parts: Vec<String> = items
                .iter()
                .map(|i| if i.is_nullish() { String::new() } else { js_string(i) })
                .collect();
            Value::String(parts.join(&sep))
        }
        "toString" => Value::String(js_string(&Value::Array(items.to_vec()))),
        "includes" => {
            let needle = args.first().cloned().unwrap_or_default();
            Value::Bool(items.iter().any(|i| i.strict_eq(&needle)))
        }
        "indexOf" => {
            let needle = args.first().cloned().unwrap_or_default();
            items
                .iter()
                .position(|i| i.strict_eq(&needle))
                .map_or(Value::Number(-1.0), Value::from)
        }
        "slice" => {
            let start = bound(args.first(), items.len(), 0);
            let end = bound(args.get(1), items.len(), items.len());
            Value::Array(items[start..end.max(start)].to_vec())
        }
        "concat" => {
            let mut out = items.to_vec();
            for a in args {
                match a {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::Array(out)
        }
        "map" | "filter" | "find" | "some" | "every" => {
            let f = match callback() {
                Ok(f) => f,
                Err(err) => return Some(Err(err)),
            };
            let mut mapped = Vec::new();
            for (i, item) in items.iter().enumerate() {
                let out = match f.call(&[item.clone(), Value::from(i)]) {
                    Ok(out) => out,
                    Err(err) => return Some(Err(err.into())),
                };
                match name {
                    "map" => mapped.push(out),
                    "filter" if out.truthy() => mapped.push(item.clone()),
                    "find" if out.truthy() => return Some(Ok(item.clone())),
                    "some" if out.truthy() => return Some(Ok(Value::Bool(true))),
                    "every" if !out.truthy() => return Some(Ok(Value::Bool(false))),
                    _ => {}
                }
            }
            match name {
                "find" => Value::Undefined,
                "some" => Value::Bool(false),
                "every" => Value::Bool(true),
                _ => Value::Array(mapped),
            }
        }
        _ => return None,
    };
    Some(Ok(value))
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Option<Value> {
    Some(match name {
        "toString" => format_number(n).into(),
        "toFixed" => {
            let digits = args.first().map_or(0.0, Value::to_number).clamp(0.0, 20.0) as usize;
            if n.is_finite() {
                format!("{n:.digits$}").into()
            } else {
                format_number(n).into()
            }
        }
        _ => return None,
    })
}
