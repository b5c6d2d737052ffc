//! Rust source emission for compiled templates
//!
//! The emitted closure calls the primitives in [`crate::runtime`], so a
//! build step could compile it instead of interpreting the artifact. It is
//! mainly useful for inspecting what a template compiles to.

use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::{format_ident, quote};
use serde_json::Value;

use crate::{
    artifact::Op,
    expr::{BinaryOp, Expr, UnaryOp},
};

pub(crate) struct Emitter {
    context: TokenStream,
}

/// Turns a binding name into an identifier, or a `binding("...")` call when
/// the name is not a valid identifier
fn binding(name: &str) -> TokenStream {
    match syn::parse_str::<Ident>(name) {
        Ok(ident) => quote!(#ident),
        Err(_) => quote!(binding(#name)),
    }
}

fn literal(value: &Value) -> TokenStream {
    match value {
        Value::Null => quote!(Value::Null),
        Value::Bool(b) => quote!(Value::Bool(#b)),
        Value::Number(n) => {
            let lit = match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Literal::i64_unsuffixed(i),
                (None, Some(f)) => Literal::f64_unsuffixed(f),
                (None, None) => Literal::string(&n.to_string()),
            };
            quote!(Value::from(#lit))
        }
        Value::String(s) => quote!(Value::from(#s)),
        other => {
            let json = other.to_string();
            quote!(serde_json::from_str::<Value>(#json)?)
        }
    }
}

impl Emitter {
    pub fn new(context_var_name: &str) -> Self {
        Self {
            context: binding(context_var_name),
        }
    }

    pub fn artifact(&self, ops: &[Op]) -> TokenStream {
        let context = &self.context;
        let body = self.ops(ops);
        quote! {
            |#context: &Value| -> Result<String> {
                let mut out = String::new();
                #body
                Ok(out)
            }
        }
    }

    fn ops(&self, ops: &[Op]) -> TokenStream {
        ops.iter().map(|op| self.op(op)).collect()
    }

    fn op(&self, op: &Op) -> TokenStream {
        match op {
            Op::Text(text) => quote!(out.push_str(#text);),
            Op::Escaped(expr) => {
                let expr = self.expr(expr);
                quote!(out.push_str(&runtime::escape(&#expr));)
            }
            Op::Raw(expr) => {
                let expr = self.expr(expr);
                quote!(out.push_str(&runtime::display(&#expr));)
            }
            Op::If { condition, body } => {
                let condition = self.expr(condition);
                let body = self.ops(body);
                quote! {
                    if runtime::truthy(&#condition) {
                        #body
                    }
                }
            }
            Op::Each {
                items,
                item,
                index,
                body,
            } => {
                let items = self.expr(items);
                let item = binding(item);
                let index = binding(index);
                let body = self.ops(body);
                quote! {
                    for (#index, #item) in runtime::iterate(#items).into_iter().enumerate() {
                        let #index = Value::from(#index);
                        #body
                    }
                }
            }
        }
    }

    fn expr(&self, expr: &Expr) -> TokenStream {
        let context = &self.context;
        match expr {
            Expr::Literal(value) => literal(value),
            Expr::Context => quote!(#context.clone()),
            Expr::Binding(name) => {
                let name = binding(name);
                quote!(#name.clone())
            }
            Expr::Lookup { target, path } => {
                let target = match target.as_ref() {
                    Expr::Context => quote!(#context),
                    Expr::Binding(name) => {
                        let name = binding(name);
                        quote!(&#name)
                    }
                    other => {
                        let other = self.expr(other);
                        quote!(&#other)
                    }
                };
                quote!(runtime::lookup(#target, &[#(#path),*]))
            }
            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
                if optional_chain(expr) {
                    let chain = self.chain(expr);
                    quote!(#chain.unwrap_or(Value::Null))
                } else {
                    self.link(expr, self.expr(link_target(expr)))
                }
            }
            Expr::Optional(_) => {
                let chain = self.chain(expr);
                quote!(#chain.unwrap_or(Value::Null))
            }
            Expr::Lambda { params, body } => {
                let params = params.iter().map(|p| binding(p));
                let body = self.expr(body);
                quote!(|#(#params),*| #body)
            }
            Expr::Array(items) => {
                let items = items.iter().map(|item| self.expr(item));
                quote!(Value::Array(vec![#(#items),*]))
            }
            Expr::Unary { op, operand } => {
                let operand = self.expr(operand);
                match op {
                    UnaryOp::Not => quote!(runtime::not(&#operand)),
                    UnaryOp::Neg => quote!(runtime::negate(&#operand)),
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.expr(left);
                let right = self.expr(right);
                match op {
                    BinaryOp::And => quote! {
                        { let left = #left; if runtime::truthy(&left) { #right } else { left } }
                    },
                    BinaryOp::Or => quote! {
                        { let left = #left; if runtime::truthy(&left) { left } else { #right } }
                    },
                    BinaryOp::Nullish => quote! {
                        { let left = #left; if left.is_null() { #right } else { left } }
                    },
                    op => {
                        let function = Ident::new(op.runtime_name(), Span::call_site());
                        quote!(runtime::#function(&#left, &#right))
                    }
                }
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.expr(condition);
                let then = self.expr(then);
                let otherwise = self.expr(otherwise);
                quote!(if runtime::truthy(&#condition) { #then } else { #otherwise })
            }
            Expr::Truthy(inner) => {
                let inner = self.expr(inner);
                quote!(Value::Bool(runtime::truthy(&#inner)))
            }
        }
    }

    /// One member access, index or call on `target`, a `Value` expression
    fn link(&self, expr: &Expr, target: TokenStream) -> TokenStream {
        match expr {
            Expr::Member { property, .. } => quote!(runtime::member(&#target, #property)?),
            Expr::Index { index, .. } => {
                let index = self.expr(index);
                quote!(runtime::index(&#target, &#index)?)
            }
            Expr::Call { method, args, .. } => match (method.as_str(), args.as_slice()) {
                ("filter" | "map", [Expr::Lambda { params, body }]) => {
                    let function = format_ident!("{}", method);
                    let item = params.first().map_or_else(|| quote!(_), |p| binding(p));
                    let (index, rebind) = match params.get(1) {
                        Some(p) => {
                            let index = binding(p);
                            (index.clone(), quote!(let #index = Value::from(#index);))
                        }
                        None => (quote!(_), TokenStream::new()),
                    };
                    let body = self.expr(body);
                    quote! {
                        runtime::#function(&#target, |#item: &Value, #index: usize| -> Result<Value> {
                            #rebind
                            Ok(#body)
                        })?
                    }
                }
                _ => {
                    let args = args.iter().map(|arg| self.expr(arg));
                    quote!(runtime::call(&#target, #method, &[#(#args),*])?)
                }
            },
            other => self.expr(other),
        }
    }

    /// `Option<Value>` source for a member chain, `None` once an optional
    /// link met null
    fn chain(&self, expr: &Expr) -> TokenStream {
        match expr {
            Expr::Optional(target) => {
                let target = self.chain(target);
                quote!(#target.filter(|value| !value.is_null()))
            }
            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
                let target = self.chain(link_target(expr));
                let link = self.link(expr, quote!(target));
                quote!(#target.map(|target: Value| -> Result<Value> { Ok(#link) }).transpose()?)
            }
            other => {
                let value = self.expr(other);
                quote!(Some(#value))
            }
        }
    }
}

/// Target of a member access, index or call
fn link_target(expr: &Expr) -> &Expr {
    match expr {
        Expr::Member { target, .. } | Expr::Index { target, .. } => target.as_ref(),
        Expr::Call { receiver, .. } => receiver.as_ref(),
        other => other,
    }
}

/// Whether a member chain has an optional link
fn optional_chain(expr: &Expr) -> bool {
    match expr {
        Expr::Optional(_) => true,
        Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
            optional_chain(link_target(expr))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Result, runtime};
    use serde_json::json;

    /// Pairs the source text of a closure with the closure itself, so the
    /// expected emission is also type checked
    macro_rules! compiled {
        ($($closure:tt)*) => {
            (quote!($($closure)*).to_string(), $($closure)*)
        };
    }

    #[test]
    fn text_and_lookup() {
        let ops = vec![
            Op::Text("Hello ".to_string()),
            Op::Escaped(Expr::lookup(Expr::Context, "user.name")),
        ];
        assert_eq!(
            Emitter::new("ctx").artifact(&ops).to_string(),
            quote! {
                |ctx: &Value| -> Result<String> {
                    let mut out = String::new();
                    out.push_str("Hello ");
                    out.push_str(&runtime::escape(&runtime::lookup(ctx, &["user", "name"])));
                    Ok(out)
                }
            }
            .to_string()
        );
    }

    #[test]
    fn loops_bind_their_names() {
        let ops = vec![Op::Each {
            items: Expr::lookup(Expr::Context, "xs"),
            item: "__item_0".to_string(),
            index: "__index_0".to_string(),
            body: vec![Op::Raw(Expr::Binding("__index_0".to_string()))],
        }];
        let emitted = Emitter::new("ctx").artifact(&ops).to_string();
        assert!(emitted.contains(
            &quote!(for (__index_0, __item_0) in runtime::iterate(runtime::lookup(ctx, &["xs"])))
                .to_string()
        ));
        assert!(emitted.contains(&quote!(runtime::display(&__index_0.clone())).to_string()));
    }

    #[test]
    fn callbacks_with_an_index_compile() {
        let artifact = crate::compile("{{xs.map((x, i) => x * i).join(',')}}").unwrap();
        let (expected, render) = compiled! {
            |__ctx: &Value| -> Result<String> {
                let mut out = String::new();
                out.push_str(&runtime::escape(&runtime::call(&runtime::map(&runtime::lookup(__ctx, &["xs"]), |x: &Value, i: usize| -> Result<Value> {
                    let i = Value::from(i);
                    Ok(runtime::mul(&x.clone(), &i.clone()))
                })?, "join", &[Value::from(",")])?));
                Ok(out)
            }
        };
        assert_eq!(artifact.source(), expected);
        let context = json!({"xs": [1, 2, 3]});
        assert_eq!(render(&context).unwrap(), "0,2,6");
        assert_eq!(artifact.call(&context).unwrap(), "0,2,6");
    }

    #[test]
    fn conditional_operators_compile() {
        let artifact =
            crate::compile("{{(user?.name ?? 'anon')}}/{{(n > 1 ? 'many' : 'one')}}").unwrap();
        let (expected, render) = compiled! {
            |__ctx: &Value| -> Result<String> {
                let mut out = String::new();
                out.push_str(&runtime::escape(&{ let left = Some(runtime::lookup(__ctx, &["user"])).filter(|value| !value.is_null()).map(|target: Value| -> Result<Value> { Ok(runtime::member(&target, "name")?) }).transpose()?.unwrap_or(Value::Null); if left.is_null() { Value::from("anon") } else { left } }));
                out.push_str("/");
                out.push_str(&runtime::escape(&if runtime::truthy(&runtime::gt(&runtime::lookup(__ctx, &["n"]), &Value::from(1))) { Value::from("many") } else { Value::from("one") }));
                Ok(out)
            }
        };
        assert_eq!(artifact.source(), expected);
        for context in [
            json!({"user": null, "n": 2}),
            json!({"user": {"name": "ann"}, "n": 1}),
        ] {
            assert_eq!(render(&context).unwrap(), artifact.call(&context).unwrap());
        }
        assert_eq!(render(&json!({"n": 2})).unwrap(), "anon/many");
    }

    #[test]
    fn invalid_identifiers_become_calls() {
        assert_eq!(binding("item-0").to_string(), quote!(binding("item-0")).to_string());
        assert_eq!(binding("x").to_string(), "x");
    }
}
