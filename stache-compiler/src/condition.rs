//! `{{#if}}` condition grammar
//!
//! - `(eq a b)` and friends: `eq`, `neq`, `gt`, `gte`, `lt`, `lte`, `and`, `or`.
//!   Operands are string literals, numbers, nested helper forms, or any
//!   expression the translator accepts.
//! - a complex expression, `this`, `this.path` or a plain path, coerced to a
//!   boolean.

use serde_json::Value;

use crate::{
    error::{Error, Result},
    expr::{BinaryOp, Expr},
    expression::{Translator, classify},
};

/// Splits helper arguments on top-level whitespace
///
/// Returns `None` when quotes or parentheses do not balance, which means the
/// text was not a helper form after all.
fn split_operands(src: &str) -> Option<Vec<&str>> {
    let mut operands = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start: Option<usize> = None;
    for (pos, c) in src.char_indices() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => (),
            }
            continue;
        }
        match c {
            c if c.is_whitespace() && depth == 0 => {
                if let Some(begin) = start.take() {
                    operands.push(&src[begin..pos]);
                }
                continue;
            }
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1)?,
            _ => (),
        }
        start.get_or_insert(pos);
    }
    if quote.is_some() || depth != 0 {
        return None;
    }
    if let Some(begin) = start {
        operands.push(&src[begin..]);
    }
    Some(operands)
}

fn is_number(src: &str) -> bool {
    let digits = src.strip_prefix('-').unwrap_or(src);
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or("");
    let fraction = parts.next();
    !whole.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

/// Text of an operand that is exactly one quoted string, escapes resolved
fn string_literal(src: &str) -> Option<String> {
    let quote = src.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = src.get(1..)?.strip_suffix(quote)?;
    let mut text = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => text.push(chars.next()?),
            c if c == quote => return None,
            c => text.push(c),
        }
    }
    Some(text)
}

impl Translator<'_> {
    /// Compiles an `{{#if}}` condition
    pub fn condition(&self, src: &str) -> Result<Expr> {
        let src = src.trim();
        if let Some(helper) = self.helper(src)? {
            return Ok(helper);
        }
        match classify(src) {
            Some(kind) => Ok(self.kind(src, kind)?.truthy()),
            None => Err(Error::expression("invalid condition expression", src)),
        }
    }

    /// Compiles `(op left right)`, `None` when `src` is not in that form
    fn helper(&self, src: &str) -> Result<Option<Expr>> {
        let inner = match src.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
            Some(inner) => inner.trim_start(),
            None => return Ok(None),
        };
        let name_end = inner.find(char::is_whitespace).unwrap_or(inner.len());
        let op = match BinaryOp::from_helper(&inner[..name_end]) {
            Some(op) => op,
            None => return Ok(None),
        };
        let operands = match split_operands(&inner[name_end..]) {
            Some(operands) => operands,
            None => return Ok(None),
        };
        match operands.as_slice() {
            [left, right] => Ok(Some(Expr::Binary {
                op,
                left: Box::new(self.operand(left)?),
                right: Box::new(self.operand(right)?),
            })),
            _ => Err(Error::expression("invalid condition expression", src)),
        }
    }

    fn operand(&self, src: &str) -> Result<Expr> {
        if let Some(text) = string_literal(src) {
            return Ok(Expr::Literal(Value::String(text)));
        }
        if is_number(src) {
            return src
                .parse::<i64>()
                .map(Value::from)
                .or_else(|_| src.parse::<f64>().map(crate::runtime::number))
                .map(Expr::Literal)
                .map_err(|_| Error::expression("invalid condition expression", src));
        }
        if let Some(helper) = self.helper(src)? {
            return Ok(helper);
        }
        self.value(src)
    }
}
