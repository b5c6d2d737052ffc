//! Runtime primitives used by compiled artifacts
//!
//! All functions are pure. Values follow the loose conventions of the
//! expression language templates are written in: numbers print without a
//! trailing `.0`, arrays print comma separated, `null` is falsy and renders
//! as nothing.

use std::{cmp::Ordering, sync::LazyLock};

use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{Error, Result};

static ESCAPE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[&<>"']"#).unwrap());

/// Safe nested lookup, `Null` when any step is missing
///
/// Objects are walked by key and arrays by numeric segment. Arrays and
/// strings also answer `length`; anything else ends the walk.
pub fn lookup<S: AsRef<str>>(value: &Value, path: &[S]) -> Value {
    let mut current = value;
    for (i, segment) in path.iter().enumerate() {
        let segment = segment.as_ref();
        let last = i + 1 == path.len();
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) if segment == "length" && last => return Value::from(items.len()),
            Value::String(s) if segment == "length" && last => return Value::from(s.chars().count()),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|n| items.get(n)),
            _ => None,
        };
        current = match next {
            Some(next) => next,
            None => return Value::Null,
        };
    }
    current.clone()
}

/// String form of a value, with `null` rendering as an empty string
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => stringify(other),
    }
}

/// HTML-escaped [`display`]
pub fn escape(value: &Value) -> String {
    let text = display(value);
    ESCAPE
        .replace_all(&text, |captures: &Captures| match &captures[0] {
            "&" => "&amp;",
            "<" => "&lt;",
            ">" => "&gt;",
            "\"" => "&quot;",
            _ => "&#39;",
        })
        .into_owned()
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Elements of an array, nothing for any other value
pub fn iterate(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Converts a float into a value, preferring an integer representation
///
/// Non-finite results have no JSON form and are kept as their text.
pub fn number(f: f64) -> Value {
    if !f.is_finite() {
        return Value::String(format_float(f));
    }
    if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
        return Value::from(f as i64);
    }
    serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        (if f > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if f == 0.0 {
        "0".to_string()
    } else if f.abs() >= 1e21 || f.abs() < 1e-6 {
        let exponential = format!("{:e}", f);
        match exponential.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => exponential,
        }
    } else {
        f.to_string()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// String form used for concatenation, `null` prints as `null`
fn stringify(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => i.to_string(),
            (_, Some(u)) => u.to_string(),
            _ => format_float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) if s.trim().is_empty() => 0.0,
        Value::String(s) => parse_number(s.trim()),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Numeric value of trimmed text, `NaN` when it isn't a number literal
///
/// Only the `Infinity` spelling is accepted for infinities; `inf` and `nan`
/// are not numbers here.
fn parse_number(s: &str) -> f64 {
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => (),
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    if !s
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

fn null_access(property: &str) -> Error {
    Error::invocation(format!(
        "cannot read properties of null (reading '{}')",
        property
    ))
}

/// `value.property`
pub fn member(value: &Value, property: &str) -> Result<Value> {
    Ok(match value {
        Value::Null => return Err(null_access(property)),
        Value::Object(map) => map.get(property).cloned().unwrap_or(Value::Null),
        Value::Array(items) if property == "length" => Value::from(items.len()),
        Value::String(s) if property == "length" => Value::from(s.chars().count()),
        _ => Value::Null,
    })
}

/// `value[index]`
pub fn index(value: &Value, index: &Value) -> Result<Value> {
    let key = stringify(index);
    Ok(match value {
        Value::Null => return Err(null_access(&key)),
        Value::Array(items) => match key.parse::<usize>() {
            Ok(i) => items.get(i).cloned().unwrap_or(Value::Null),
            Err(_) => return member(value, &key),
        },
        Value::String(s) => match key.parse::<usize>() {
            Ok(i) => s.chars().nth(i).map_or(Value::Null, |c| Value::String(c.to_string())),
            Err(_) => return member(value, &key),
        },
        other => return member(other, &key),
    })
}

pub fn not(value: &Value) -> Value {
    Value::Bool(!truthy(value))
}

pub fn negate(value: &Value) -> Value {
    number(-to_number(value))
}

/// `+`: concatenation when either side is not a primitive number-like value
pub fn add(left: &Value, right: &Value) -> Value {
    let concat = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
    if concat(left) || concat(right) {
        Value::String(stringify(left) + &stringify(right))
    } else {
        number(to_number(left) + to_number(right))
    }
}

pub fn sub(left: &Value, right: &Value) -> Value {
    number(to_number(left) - to_number(right))
}

pub fn mul(left: &Value, right: &Value) -> Value {
    number(to_number(left) * to_number(right))
}

pub fn div(left: &Value, right: &Value) -> Value {
    number(to_number(left) / to_number(right))
}

pub fn rem(left: &Value, right: &Value) -> Value {
    number(to_number(left) % to_number(right))
}

fn same(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64() == r.as_f64(),
        (l, r) => l == r,
    }
}

/// Strict equality, no coercion between types
pub fn strict_eq(left: &Value, right: &Value) -> Value {
    Value::Bool(same(left, right))
}

pub fn strict_ne(left: &Value, right: &Value) -> Value {
    Value::Bool(!same(left, right))
}

/// Orders two numbers or two strings; other pairs are unordered
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l.as_f64()?.partial_cmp(&r.as_f64()?),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
}

pub fn lt(left: &Value, right: &Value) -> Value {
    Value::Bool(compare(left, right) == Some(Ordering::Less))
}

pub fn le(left: &Value, right: &Value) -> Value {
    Value::Bool(matches!(compare(left, right), Some(Ordering::Less | Ordering::Equal)))
}

pub fn gt(left: &Value, right: &Value) -> Value {
    Value::Bool(compare(left, right) == Some(Ordering::Greater))
}

pub fn ge(left: &Value, right: &Value) -> Value {
    Value::Bool(matches!(compare(left, right), Some(Ordering::Greater | Ordering::Equal)))
}

fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&Value::Null)
}

/// Numeric argument, `None` when absent
fn int_arg(args: &[Value], i: usize) -> Option<f64> {
    match arg(args, i) {
        Value::Null => None,
        value => {
            let f = to_number(value).trunc();
            Some(if f.is_nan() { 0.0 } else { f })
        }
    }
}

/// Resolves a possibly negative position against `len`
fn relative(position: f64, len: usize) -> usize {
    let len = len as f64;
    let position = if position < 0.0 {
        (len + position).max(0.0)
    } else {
        position.min(len)
    };
    position as usize
}

/// `slice(start, end)` bounds
fn slice_bounds(args: &[Value], len: usize) -> (usize, usize) {
    let start = int_arg(args, 0).map_or(0, |s| relative(s, len));
    let end = int_arg(args, 1).map_or(len, |e| relative(e, len));
    (start, end.max(start))
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Option<Value> {
    let chars = || s.chars().collect::<Vec<_>>();
    let text = |i| stringify(arg(args, i));
    Some(match method {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "toString" => Value::String(s.to_string()),
        "split" => Value::Array(match arg(args, 0) {
            Value::Null => vec![Value::String(s.to_string())],
            separator => {
                let separator = stringify(separator);
                if separator.is_empty() {
                    s.chars().map(|c| Value::String(c.to_string())).collect()
                } else {
                    s.split(separator.as_str()).map(Value::from).collect()
                }
            }
        }),
        "slice" => {
            let chars = chars();
            let (start, end) = slice_bounds(args, chars.len());
            Value::String(chars[start..end].iter().collect())
        }
        "substring" => {
            let chars = chars();
            let clamp = |f: f64| (f.max(0.0) as usize).min(chars.len());
            let start = int_arg(args, 0).map_or(0, clamp);
            let end = int_arg(args, 1).map_or(chars.len(), clamp);
            let (start, end) = (start.min(end), start.max(end));
            Value::String(chars[start..end].iter().collect())
        }
        "charAt" => {
            let i = int_arg(args, 0).unwrap_or(0.0);
            let c = (i >= 0.0).then(|| s.chars().nth(i as usize)).flatten();
            Value::String(c.map(String::from).unwrap_or_default())
        }
        "includes" => Value::Bool(s.contains(&text(0))),
        "startsWith" => Value::Bool(s.starts_with(&text(0))),
        "endsWith" => Value::Bool(s.ends_with(&text(0))),
        "indexOf" => Value::from(
            s.find(&text(0))
                .map_or(-1, |byte| s[..byte].chars().count() as i64),
        ),
        "replace" => Value::String(s.replacen(&text(0), &text(1), 1)),
        _ => return None,
    })
}

fn array_method(items: &[Value], method: &str, args: &[Value]) -> Option<Value> {
    Some(match method {
        "join" => {
            let separator = match arg(args, 0) {
                Value::Null => ",".to_string(),
                separator => stringify(separator),
            };
            Value::String(items.iter().map(display).collect::<Vec<_>>().join(&separator))
        }
        "toString" => Value::String(stringify(&Value::Array(items.to_vec()))),
        "slice" => {
            let (start, end) = slice_bounds(args, items.len());
            Value::Array(items[start..end].to_vec())
        }
        "includes" => Value::Bool(items.iter().any(|item| same(item, arg(args, 0)))),
        "indexOf" => Value::from(
            items
                .iter()
                .position(|item| same(item, arg(args, 0)))
                .map_or(-1, |i| i as i64),
        ),
        _ => return None,
    })
}

fn number_method(n: f64, method: &str, args: &[Value]) -> Option<Value> {
    Some(match method {
        "toString" => Value::String(stringify(&number(n))),
        "toFixed" => {
            let digits = int_arg(args, 0).unwrap_or(0.0).clamp(0.0, 100.0) as usize;
            Value::String(format!("{:.*}", digits, n))
        }
        _ => return None,
    })
}

/// Calls a method that takes plain values
///
/// Callback methods (`filter`, `map`) go through [`filter`] and [`map`].
pub fn call(receiver: &Value, method: &str, args: &[Value]) -> Result<Value> {
    let result = match receiver {
        Value::Null => return Err(null_access(method)),
        Value::String(s) => string_method(s, method, args),
        Value::Array(items) => array_method(items, method, args),
        Value::Number(n) => number_method(n.as_f64().unwrap_or(f64::NAN), method, args),
        Value::Bool(b) if method == "toString" => Some(Value::String(b.to_string())),
        _ => None,
    };
    result.ok_or_else(|| {
        Error::invocation(format!(
            "{}.{} is not a function",
            type_name(receiver),
            method
        ))
    })
}

fn callback_items<'v>(receiver: &'v Value, method: &str) -> Result<&'v [Value]> {
    match receiver {
        Value::Array(items) => Ok(items),
        Value::Null => Err(null_access(method)),
        other => Err(Error::invocation(format!(
            "{}.{} is not a function",
            type_name(other),
            method
        ))),
    }
}

/// `items.filter(callback)`; the callback receives each item and its index
pub fn filter<F>(receiver: &Value, mut callback: F) -> Result<Value>
where
    F: FnMut(&Value, usize) -> Result<Value>,
{
    let mut kept = Vec::new();
    for (i, item) in callback_items(receiver, "filter")?.iter().enumerate() {
        if truthy(&callback(item, i)?) {
            kept.push(item.clone());
        }
    }
    Ok(Value::Array(kept))
}

/// `items.map(callback)`
pub fn map<F>(receiver: &Value, mut callback: F) -> Result<Value>
where
    F: FnMut(&Value, usize) -> Result<Value>,
{
    callback_items(receiver, "map")?
        .iter()
        .enumerate()
        .map(|(i, item)| callback(item, i))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}
