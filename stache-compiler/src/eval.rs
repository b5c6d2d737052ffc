//! Expression evaluation against a render context

use serde_json::Value;

use crate::{
    error::{Error, Result},
    expr::{BinaryOp, Expr, UnaryOp},
    runtime,
};

/// A named value visible to expressions, linked to the enclosing bindings
struct Binding<'a> {
    name: &'a str,
    value: Value,
    parent: Option<&'a Binding<'a>>,
}

/// What an expression can see while it runs
#[derive(Clone, Copy)]
pub(crate) struct Env<'a> {
    context: &'a Value,
    bindings: Option<&'a Binding<'a>>,
}

impl<'a> Env<'a> {
    pub fn new(context: &'a Value) -> Self {
        Self {
            context,
            bindings: None,
        }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        let mut current = self.bindings;
        while let Some(binding) = current {
            if binding.name == name {
                return Some(&binding.value);
            }
            current = binding.parent;
        }
        None
    }

    /// Runs `f` with `name` bound to `value`
    pub fn scoped<R>(&self, name: &str, value: Value, f: impl FnOnce(Env<'_>) -> R) -> R {
        let binding = Binding {
            name,
            value,
            parent: self.bindings,
        };
        f(Env {
            context: self.context,
            bindings: Some(&binding),
        })
    }

    fn invoke(&self, params: &[String], body: &Expr, item: &Value, index: usize) -> Result<Value> {
        match params {
            [] => self.eval(body),
            [item_name] => self.scoped(item_name, item.clone(), |env| env.eval(body)),
            [item_name, index_name, ..] => self.scoped(item_name, item.clone(), |env| {
                env.scoped(index_name, Value::from(index), |env| env.eval(body))
            }),
        }
    }

    fn call(&self, receiver: Value, method: &str, args: &[Expr]) -> Result<Value> {
        if let [Expr::Lambda { params, body }] = args {
            let callback = |item: &Value, index: usize| self.invoke(params, body, item, index);
            match method {
                "filter" => return runtime::filter(&receiver, callback),
                "map" => return runtime::map(&receiver, callback),
                _ => (),
            }
        }
        let args = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>>>()?;
        runtime::call(&receiver, method, &args)
    }

    /// Evaluates a member chain, `None` once an optional link met null
    fn chain(&self, expr: &Expr) -> Result<Option<Value>> {
        Ok(match expr {
            Expr::Optional(target) => self.chain(target)?.filter(|value| !value.is_null()),
            Expr::Member { target, property } => match self.chain(target)? {
                Some(target) => Some(runtime::member(&target, property)?),
                None => None,
            },
            Expr::Index { target, index } => match self.chain(target)? {
                Some(target) => Some(runtime::index(&target, &self.eval(index)?)?),
                None => None,
            },
            Expr::Call {
                receiver,
                method,
                args,
            } => match self.chain(receiver)? {
                Some(receiver) => Some(self.call(receiver, method, args)?),
                None => None,
            },
            other => Some(self.eval(other)?),
        })
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        Ok(match expr {
            Expr::Literal(value) => value.clone(),
            Expr::Context => self.context.clone(),
            Expr::Binding(name) => self.get(name).cloned().unwrap_or(Value::Null),
            Expr::Lookup { target, path } => match target.as_ref() {
                Expr::Context => runtime::lookup(self.context, path),
                Expr::Binding(name) => self
                    .get(name)
                    .map_or(Value::Null, |value| runtime::lookup(value, path)),
                other => runtime::lookup(&self.eval(other)?, path),
            },
            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } | Expr::Optional(_) => {
                self.chain(expr)?.unwrap_or(Value::Null)
            }
            Expr::Lambda { .. } => {
                return Err(Error::invocation("a function cannot be used as a value"));
            }
            Expr::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(item))
                    .collect::<Result<_>>()?,
            ),
            Expr::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                match op {
                    UnaryOp::Not => runtime::not(&operand),
                    UnaryOp::Neg => runtime::negate(&operand),
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval(left)?;
                match op {
                    BinaryOp::And if !runtime::truthy(&left) => left,
                    BinaryOp::Or if runtime::truthy(&left) => left,
                    BinaryOp::Nullish if !left.is_null() => left,
                    BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => self.eval(right)?,
                    op => binary(*op, &left, &self.eval(right)?),
                }
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if runtime::truthy(&self.eval(condition)?) {
                    self.eval(then)?
                } else {
                    self.eval(otherwise)?
                }
            }
            Expr::Truthy(inner) => Value::Bool(runtime::truthy(&self.eval(inner)?)),
        })
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => runtime::add(left, right),
        BinaryOp::Sub => runtime::sub(left, right),
        BinaryOp::Mul => runtime::mul(left, right),
        BinaryOp::Div => runtime::div(left, right),
        BinaryOp::Rem => runtime::rem(left, right),
        BinaryOp::Eq => runtime::strict_eq(left, right),
        BinaryOp::Ne => runtime::strict_ne(left, right),
        BinaryOp::Lt => runtime::lt(left, right),
        BinaryOp::Le => runtime::le(left, right),
        BinaryOp::Gt => runtime::gt(left, right),
        BinaryOp::Ge => runtime::ge(left, right),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => {
            unreachable!("short-circuit operators are evaluated lazily")
        }
    }
}
