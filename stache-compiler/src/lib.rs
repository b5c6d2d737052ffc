//! Template parser and compiler
//!
//! This crate turns handlebars-style templates into [`Artifact`]s: compiled
//! programs that render a JSON context into a string. It's used by the
//! `stache` crate at run time and by `stache-macros` at build time.
//!
//! # Features
//!
//! - `{{expr}}` escaped and `{{{expr}}}` raw interpolation
//! - `{{#if cond}}...{{/if}}` with `(eq a b)` style comparisons
//! - `{{#each items}}...{{/each}}` with `this` and `@index`
//! - path expressions (`user.address.city`) that never fail on missing data
//! - complex expressions with arithmetic, method calls and arrow functions
//!
//! # Example
//!
//! ```rust
//! use serde_json::json;
//! use stache_compiler::{Compiler, Options};
//!
//! let compiler = Compiler::new(Options::default());
//! let artifact = compiler.compile("Hello {{name}}!").unwrap();
//! assert_eq!(artifact.call(&json!({"name": "<World>"})).unwrap(), "Hello &lt;World&gt;!");
//! ```
//!
//! # Module Structure
//!
//! - `scanner.rs`: template text to tokens
//! - `tree.rs`: tokens to a nested syntax tree
//! - `generator.rs`: syntax tree to artifact
//! - `expression.rs` / `condition.rs`: expression translation
//! - `operators.rs`: conditional and `??` operators ahead of parsing
//! - `artifact.rs` / `eval.rs`: running compiled templates
//! - `runtime.rs`: value primitives (lookup, escaping, methods)
//! - `source.rs`: Rust source emission

pub mod artifact;
pub mod condition;
pub mod error;
mod eval;
pub mod expr;
pub mod expression;
pub mod generator;
mod operators;
pub mod runtime;
pub mod scanner;
pub mod scope;
mod source;
pub mod token;
pub mod tree;

pub use artifact::{Artifact, Op};
pub use error::{Error, Result};
pub use generator::{Compiler, Options};

/// Compiles a template with the default options
pub fn compile(src: &str) -> Result<Artifact> {
    Compiler::default().compile(src)
}
