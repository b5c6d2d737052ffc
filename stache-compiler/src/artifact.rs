//! Compiled templates
//!
//! An [`Artifact`] is the output of code generation: a small program of
//! [`Op`]s that renders a context into a string. It owns everything it needs,
//! keeps no state between calls and can be shared between threads.

use serde_json::Value;

use crate::{
    error::Result,
    eval::Env,
    expr::Expr,
    runtime,
    source::Emitter,
};

/// One step of a compiled template
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Literal text, written as is
    Text(String),
    /// HTML-escaped value
    Escaped(Expr),
    /// Unescaped value
    Raw(Expr),
    If {
        condition: Expr,
        body: Vec<Op>,
    },
    /// Runs `body` once per array element with `item` and `index` bound
    Each {
        items: Expr,
        item: String,
        index: String,
        body: Vec<Op>,
    },
}

/// A compiled template
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    ops: Vec<Op>,
    context_var_name: &'static str,
}

fn render(ops: &[Op], env: Env<'_>, out: &mut String) -> Result<()> {
    for op in ops {
        match op {
            Op::Text(text) => out.push_str(text),
            Op::Escaped(expr) => out.push_str(&runtime::escape(&env.eval(expr)?)),
            Op::Raw(expr) => out.push_str(&runtime::display(&env.eval(expr)?)),
            Op::If { condition, body } => {
                if runtime::truthy(&env.eval(condition)?) {
                    render(body, env, out)?;
                }
            }
            Op::Each {
                items,
                item,
                index,
                body,
            } => {
                for (i, value) in runtime::iterate(env.eval(items)?).into_iter().enumerate() {
                    env.scoped(item, value, |env| {
                        env.scoped(index, Value::from(i), |env| render(body, env, &mut *out))
                    })?;
                }
            }
        }
    }
    Ok(())
}

impl Artifact {
    pub(crate) fn new(ops: Vec<Op>, context_var_name: &'static str) -> Self {
        Self {
            ops,
            context_var_name,
        }
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Renders the template for `context`
    pub fn call(&self, context: &Value) -> Result<String> {
        let mut out = String::new();
        render(&self.ops, Env::new(context), &mut out)?;
        Ok(out)
    }

    /// Rust source of an equivalent render closure
    pub fn source(&self) -> String {
        Emitter::new(self.context_var_name).artifact(&self.ops).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn artifacts_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Artifact>();
    }

    #[test]
    fn each_binds_item_and_index() {
        let artifact = Artifact::new(
            vec![Op::Each {
                items: Expr::lookup(Expr::Context, "xs"),
                item: "it".to_string(),
                index: "i".to_string(),
                body: vec![
                    Op::Raw(Expr::Binding("i".to_string())),
                    Op::Text("=".to_string()),
                    Op::Escaped(Expr::Binding("it".to_string())),
                    Op::Text(";".to_string()),
                ],
            }],
            "ctx",
        );
        assert_eq!(
            artifact.call(&json!({"xs": ["<", 2]})).unwrap(),
            "0=&lt;;1=2;"
        );
        assert_eq!(artifact.call(&json!({"xs": "abc"})).unwrap(), "");
        assert_eq!(artifact.call(&json!({})).unwrap(), "");
    }

    #[test]
    fn if_uses_truthiness() {
        let artifact = Artifact::new(
            vec![Op::If {
                condition: Expr::lookup(Expr::Context, "flag"),
                body: vec![Op::Text("on".to_string())],
            }],
            "ctx",
        );
        assert_eq!(artifact.call(&json!({"flag": 1})).unwrap(), "on");
        assert_eq!(artifact.call(&json!({"flag": ""})).unwrap(), "");
    }
}
