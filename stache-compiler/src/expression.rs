//! Expression translation
//!
//! Compiles the text found inside `{{ }}` markers and block directives into
//! [`Expr`] trees, resolving `this` and `@index` against the loop scope that is
//! active at that point of the template.
//!
//! # Expression kinds
//!
//! - `this`: the innermost loop item, or the whole context outside loops
//! - `this.a.b`: safe lookup rooted at `this`
//! - `a.b.c`: safe lookup rooted at the context
//! - complex: anything with parentheses, arithmetic, `@index`, a known method
//!   suffix (`.length`, `.split`, ...) or an arrow function. Complex
//!   expressions are rewritten into Rust expression syntax and parsed with
//!   `syn`, then lowered into the IR.
//!
//! Complex expressions are not sandboxed: any method the runtime knows can be
//! called on any value reachable from the context.
//!
//! # Examples
//!
//! ```rust
//! use stache_compiler::expression::Translator;
//! use stache_compiler::expr::Expr;
//! use stache_compiler::generator::Options;
//!
//! let options = Options::default();
//! let translator = Translator::new(&options, None);
//! assert_eq!(translator.value("user.name").unwrap(), Expr::lookup(Expr::Context, "user.name"));
//! ```

use std::sync::LazyLock;

use proc_macro2::TokenStream;
use regex::{Captures, NoExpand, Regex};
use serde_json::Value;
use syn::{Token, punctuated::Punctuated};
use tracing::trace;

use crate::{
    error::{Error, Result},
    expr::{BinaryOp, Expr, UnaryOp},
    generator::Options,
    operators::{NULLISH, desugar},
    scope::LoopScope,
};

static PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z_$][A-Za-z0-9_$]*)*$").unwrap()
});

static COMPLEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[()+\-*/%]|@index|=>|\.(?:length|split|join|toUpperCase|toLowerCase|trim|slice|substring|charAt|filter)\b",
    )
    .unwrap()
});

static ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\(\s*([A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)?\s*\)|\b([A-Za-z_]\w*))\s*=>\s*").unwrap()
});

static INDEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@index\b").unwrap());

static THIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bthis\b").unwrap());

/// How an expression is compiled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind<'a> {
    This,
    Complex,
    /// `this.` followed by the path
    ThisPath(&'a str),
    Path,
}

/// Classifies an expression, `None` when it fits no rule
pub fn classify(src: &str) -> Option<Kind<'_>> {
    if src == "this" {
        return Some(Kind::This);
    }
    if COMPLEX.is_match(src) {
        return Some(Kind::Complex);
    }
    if let Some(path) = src.strip_prefix("this.") {
        return PATH.is_match(path).then_some(Kind::ThisPath(path));
    }
    PATH.is_match(src).then_some(Kind::Path)
}

/// Applies `rewrite` to the code between string literals
///
/// String literals are re-emitted double quoted, so `'a"b'` becomes `"a\"b"`.
/// An unterminated literal is copied without a closing quote and fails to
/// parse later.
fn rewrite_code(src: &str, mut rewrite: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(src.len() + 16);
    let mut code_start = 0;
    let mut chars = src.char_indices();
    while let Some((start, quote)) = chars.next() {
        if quote != '"' && quote != '\'' {
            continue;
        }
        out.push_str(&rewrite(&src[code_start..start]));
        out.push('"');
        code_start = src.len();
        let mut escaped = false;
        for (pos, c) in chars.by_ref() {
            match c {
                _ if escaped => {
                    escaped = false;
                    out.push(c);
                }
                '\\' => {
                    escaped = true;
                    out.push(c);
                }
                c if c == quote => {
                    out.push('"');
                    code_start = pos + 1;
                    break;
                }
                '"' => out.push_str("\\\""),
                c => out.push(c),
            }
        }
    }
    if code_start < src.len() {
        out.push_str(&rewrite(&src[code_start..]));
    }
    out
}

/// Translates expressions against one loop scope
pub struct Translator<'t> {
    options: &'t Options,
    scope: Option<&'t LoopScope<'t>>,
}

impl<'t> Translator<'t> {
    pub fn new(options: &'t Options, scope: Option<&'t LoopScope<'t>>) -> Self {
        Self { options, scope }
    }

    /// What `this` refers to here
    fn this(&self) -> Expr {
        match self.scope {
            Some(scope) => Expr::Binding(scope.item.clone()),
            None => Expr::Context,
        }
    }

    /// Compiles a variable, items or operand expression
    pub fn value(&self, src: &str) -> Result<Expr> {
        let src = src.trim();
        match classify(src) {
            Some(kind) => self.kind(src, kind),
            None => Err(Error::expression("invalid variable expression", src)),
        }
    }

    pub(crate) fn kind(&self, src: &str, kind: Kind<'_>) -> Result<Expr> {
        trace!(expression = src, ?kind, "translating expression");
        Ok(match kind {
            Kind::This => self.this(),
            Kind::Complex => self.complex(src)?,
            Kind::ThisPath(path) => Expr::lookup(self.this(), path),
            Kind::Path => Expr::lookup(Expr::Context, src),
        })
    }

    /// Rewrites a complex expression into Rust expression syntax
    pub fn rewrite(&self, src: &str) -> String {
        let (this, index) = match self.scope {
            Some(scope) => (scope.item.as_str(), scope.index.as_str()),
            None => (self.options.context_var_name, "0"),
        };
        rewrite_code(src, |code| {
            let code = code.replace("===", "==").replace("!==", "!=");
            let code = ARROW.replace_all(&code, |caps: &Captures| {
                let params = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                format!("|{}| ", params)
            });
            let code = INDEX.replace_all(&code, NoExpand(index));
            THIS.replace_all(&code, NoExpand(this)).into_owned()
        })
    }

    fn complex(&self, src: &str) -> Result<Expr> {
        let rust = self.rewrite(src);
        let invalid = || Error::expression("invalid complex expression", src);
        let tokens: TokenStream = rust.parse().map_err(|_| invalid())?;
        let parsed: syn::Expr = syn::parse2(desugar(tokens)).map_err(|_| invalid())?;
        Lowering {
            translator: self,
            params: Vec::new(),
        }
        .lower(&parsed)
        .ok_or_else(invalid)
    }

    fn resolve(&self, name: &str, params: &[String]) -> Expr {
        if name == self.options.context_var_name {
            Expr::Context
        } else if params.iter().any(|param| param == name)
            || self.scope.is_some_and(|scope| scope.binds(name))
        {
            Expr::Binding(name.to_string())
        } else if name == "null" || name == "undefined" {
            Expr::Literal(Value::Null)
        } else {
            Expr::lookup(Expr::Context, name)
        }
    }
}

/// Lowers a parsed Rust expression into the IR
///
/// Returns `None` for any construct the runtime cannot evaluate.
struct Lowering<'l, 't> {
    translator: &'l Translator<'t>,
    params: Vec<String>,
}

impl Lowering<'_, '_> {
    fn lower(&mut self, expr: &syn::Expr) -> Option<Expr> {
        Some(match expr {
            syn::Expr::Lit(lit) => Expr::Literal(literal(&lit.lit)?),
            syn::Expr::Path(path) => {
                if path.qself.is_some() {
                    return None;
                }
                let ident = path.path.get_ident()?.to_string();
                self.translator.resolve(&ident, &self.params)
            }
            syn::Expr::Paren(paren) => self.lower(&paren.expr)?,
            syn::Expr::Group(group) => self.lower(&group.expr)?,
            syn::Expr::Field(field) => {
                let target = Box::new(self.target(&field.base)?);
                match &field.member {
                    syn::Member::Named(ident) => Expr::Member {
                        target,
                        property: ident.to_string(),
                    },
                    syn::Member::Unnamed(index) => Expr::Index {
                        target,
                        index: Box::new(Expr::Literal(Value::from(index.index))),
                    },
                }
            }
            syn::Expr::Index(index) => Expr::Index {
                target: Box::new(self.target(&index.expr)?),
                index: Box::new(self.lower(&index.index)?),
            },
            syn::Expr::MethodCall(call) => {
                if call.turbofish.is_some() {
                    return None;
                }
                Expr::Call {
                    receiver: Box::new(self.target(&call.receiver)?),
                    method: call.method.to_string(),
                    args: call
                        .args
                        .iter()
                        .map(|arg| self.lower(arg))
                        .collect::<Option<_>>()?,
                }
            }
            syn::Expr::Closure(closure) => {
                let params = closure
                    .inputs
                    .iter()
                    .map(|input| match input {
                        syn::Pat::Ident(pat) if pat.subpat.is_none() => Some(pat.ident.to_string()),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()?;
                let outer = self.params.len();
                self.params.extend(params.iter().cloned());
                let body = self.lower(&closure.body);
                self.params.truncate(outer);
                Expr::Lambda {
                    params,
                    body: Box::new(body?),
                }
            }
            syn::Expr::Array(array) => Expr::Array(
                array
                    .elems
                    .iter()
                    .map(|elem| self.lower(elem))
                    .collect::<Option<_>>()?,
            ),
            syn::Expr::Unary(unary) => Expr::Unary {
                op: match unary.op {
                    syn::UnOp::Not(_) => UnaryOp::Not,
                    syn::UnOp::Neg(_) => UnaryOp::Neg,
                    _ => return None,
                },
                operand: Box::new(self.lower(&unary.expr)?),
            },
            syn::Expr::Binary(binary) => Expr::Binary {
                op: binary_op(&binary.op)?,
                left: Box::new(self.lower(&binary.left)?),
                right: Box::new(self.lower(&binary.right)?),
            },
            syn::Expr::If(branch) => {
                let otherwise = match branch.else_branch.as_ref()?.1.as_ref() {
                    syn::Expr::Block(block) => single_expr(&block.block)?,
                    _ => return None,
                };
                Expr::Conditional {
                    condition: Box::new(self.lower(&branch.cond)?),
                    then: Box::new(self.lower(single_expr(&branch.then_branch)?)?),
                    otherwise: Box::new(self.lower(otherwise)?),
                }
            }
            syn::Expr::Macro(mac) if mac.mac.path.is_ident(NULLISH) => {
                let operands: Vec<syn::Expr> = mac
                    .mac
                    .parse_body_with(Punctuated::<syn::Expr, Token![,]>::parse_terminated)
                    .ok()?
                    .into_iter()
                    .collect();
                let [left, right] = operands.as_slice() else {
                    return None;
                };
                Expr::Binary {
                    op: BinaryOp::Nullish,
                    left: Box::new(self.lower(left)?),
                    right: Box::new(self.lower(right)?),
                }
            }
            _ => return None,
        })
    }

    /// Lowers the target of a member access, where `a?` marks an optional link
    fn target(&mut self, expr: &syn::Expr) -> Option<Expr> {
        match expr {
            syn::Expr::Try(link) => Some(Expr::Optional(Box::new(self.lower(&link.expr)?))),
            other => self.lower(other),
        }
    }
}

/// The expression of a block holding nothing else
fn single_expr(block: &syn::Block) -> Option<&syn::Expr> {
    match block.stmts.as_slice() {
        [syn::Stmt::Expr(expr, None)] => Some(expr),
        _ => None,
    }
}

fn literal(lit: &syn::Lit) -> Option<Value> {
    Some(match lit {
        syn::Lit::Str(s) => Value::String(s.value()),
        syn::Lit::Char(c) => Value::String(c.value().to_string()),
        syn::Lit::Int(i) => match i.base10_parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => crate::runtime::number(i.base10_parse::<f64>().ok()?),
        },
        syn::Lit::Float(f) => crate::runtime::number(f.base10_parse::<f64>().ok()?),
        syn::Lit::Bool(b) => Value::Bool(b.value),
        _ => return None,
    })
}

fn binary_op(op: &syn::BinOp) -> Option<BinaryOp> {
    Some(match op {
        syn::BinOp::Add(_) => BinaryOp::Add,
        syn::BinOp::Sub(_) => BinaryOp::Sub,
        syn::BinOp::Mul(_) => BinaryOp::Mul,
        syn::BinOp::Div(_) => BinaryOp::Div,
        syn::BinOp::Rem(_) => BinaryOp::Rem,
        syn::BinOp::Eq(_) => BinaryOp::Eq,
        syn::BinOp::Ne(_) => BinaryOp::Ne,
        syn::BinOp::Lt(_) => BinaryOp::Lt,
        syn::BinOp::Le(_) => BinaryOp::Le,
        syn::BinOp::Gt(_) => BinaryOp::Gt,
        syn::BinOp::Ge(_) => BinaryOp::Ge,
        syn::BinOp::And(_) => BinaryOp::And,
        syn::BinOp::Or(_) => BinaryOp::Or,
        _ => return None,
    })
}
