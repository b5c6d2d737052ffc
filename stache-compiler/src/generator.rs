//! Code generation
//!
//! Walks the syntax tree and produces an [`Artifact`]. Each `{{#each}}` opens
//! a [`LoopScope`] with freshly allocated binding names; the scope chain is
//! passed down the traversal so that `this` and `@index` always resolve to
//! the innermost loop.
//!
//! # Examples
//!
//! ```rust
//! use serde_json::json;
//! use stache_compiler::generator::{Compiler, Options};
//!
//! let compiler = Compiler::new(Options::default());
//! let artifact = compiler.compile("{{#each items}}{{@index}}:{{this}} {{/each}}").unwrap();
//! assert_eq!(artifact.call(&json!({"items": ["a", "b"]})).unwrap(), "0:a 1:b ");
//! ```

use tracing::debug;

use crate::{
    artifact::{Artifact, Op},
    error::Result,
    expression::Translator,
    scanner::scan,
    scope::{LoopScope, Names},
    tree::{Node, Root, build},
};

/// Compiler options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Name of the context parameter in emitted source; also what `this`
    /// becomes in complex expressions outside any loop
    pub context_var_name: &'static str,
    /// Prefix of loop item bindings, followed by a per-pass counter
    pub item_var_prefix: &'static str,
    /// Prefix of loop index bindings
    pub index_var_prefix: &'static str,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            context_var_name: "__ctx",
            item_var_prefix: "__item_",
            index_var_prefix: "__index_",
        }
    }
}

/// Main compiler implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    options: Options,
}

impl Compiler {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Scans, builds and generates a template in one go
    pub fn compile(&self, src: &str) -> Result<Artifact> {
        let tokens = scan(src)?;
        let root = build(&tokens)?;
        self.generate(&root)
    }

    /// Generates an artifact for a syntax tree
    ///
    /// Binding names are allocated per call, so generating the same tree twice
    /// yields equal artifacts.
    pub fn generate(&self, root: &Root<'_>) -> Result<Artifact> {
        let mut names = Names::new(&self.options);
        let ops = self.nodes(&root.children, None, &mut names)?;
        debug!(ops = ops.len(), loops = names.opened(), "generated artifact");
        Ok(Artifact::new(ops, self.options.context_var_name))
    }

    fn nodes(
        &self,
        nodes: &[Node<'_>],
        scope: Option<&LoopScope<'_>>,
        names: &mut Names<'_>,
    ) -> Result<Vec<Op>> {
        let translator = Translator::new(&self.options, scope);
        let mut ops = Vec::with_capacity(nodes.len());
        for node in nodes {
            ops.push(match node {
                Node::Text(text) => Op::Text(text.to_string()),
                Node::Variable(expression) => Op::Escaped(translator.value(expression)?),
                Node::RawVariable(expression) => Op::Raw(translator.value(expression)?),
                Node::If {
                    condition,
                    children,
                } => Op::If {
                    condition: translator.condition(condition)?,
                    body: self.nodes(children, scope, names)?,
                },
                Node::Each { items, children } => {
                    let items = translator.value(items)?;
                    let inner = names.open(scope);
                    let body = self.nodes(children, Some(&inner), names)?;
                    Op::Each {
                        items,
                        item: inner.item,
                        index: inner.index,
                        body,
                    }
                }
            });
        }
        Ok(ops)
    }
}
