//! Handlebars-style string templates
//!
//! ```rust
//! use serde_json::json;
//!
//! let template = stache::Template::compile("Hello {{name}}!").unwrap();
//! assert_eq!(template.render(&json!({"name": "World"})).unwrap(), "Hello World!");
//! ```
//!
//! Templates can also be compiled while the crate builds with [`str!`],
//! [`file!`] and [`directory!`].

extern crate self as stache;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

pub use stache_compiler::{Artifact, Compiler, Error, Op, Options, runtime};
pub use stache_macros::stache_directory as directory;
pub use stache_macros::stache_file as file;
pub use stache_macros::stache_str as str;

/// Failure while rendering a compiled template
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("rendering failed: {0}")]
    Failed(String),
    #[error("context could not be serialized: {0}")]
    Context(String),
}

/// A compiled template, ready to render any number of contexts
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    artifact: Artifact,
}

impl Template {
    pub fn compile(src: &str) -> Result<Self, Error> {
        Self::compile_with(src, Options::default())
    }

    pub fn compile_with(src: &str, options: Options) -> Result<Self, Error> {
        let artifact = Compiler::new(options).compile(src)?;
        debug!(len = src.len(), ops = artifact.ops().len(), "compiled template");
        Ok(Self { artifact })
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn render(&self, context: &Value) -> Result<String, RenderError> {
        self.artifact
            .call(context)
            .map_err(|e| RenderError::Failed(e.to_string()))
    }

    /// Renders any serializable value, converted to JSON first
    pub fn render_serialize<T: Serialize>(&self, context: &T) -> Result<String, RenderError> {
        let context =
            serde_json::to_value(context).map_err(|e| RenderError::Context(e.to_string()))?;
        self.render(&context)
    }

    /// Rust source of the compiled render function
    pub fn source(&self) -> String {
        self.artifact.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn render(src: &str, context: Value) -> String {
        Template::compile(src).unwrap().render(&context).unwrap()
    }

    #[test]
    fn literal_text() {
        let src = "<ul class=\"list\">\n  <li>plain</li>\n</ul>";
        assert_eq!(render(src, json!({})), src);
        assert_eq!(render(src, json!({"a": [1, 2]})), src);
    }

    #[test]
    fn escaped_interpolation() {
        assert_eq!(
            render("Hello {{name}}!", json!({"name": "<b>World</b>"})),
            "Hello &lt;b&gt;World&lt;/b&gt;!"
        );
        assert_eq!(
            render("{{q}}", json!({"q": "\"Tom\" & 'Jerry'"})),
            "&quot;Tom&quot; &amp; &#39;Jerry&#39;"
        );
    }

    #[test]
    fn raw_interpolation() {
        assert_eq!(render("{{{html}}}", json!({"html": "<b>x</b>"})), "<b>x</b>");
    }

    #[test]
    fn each_with_index() {
        assert_eq!(
            render(
                "{{#each items}}{{@index}}:{{this}} {{/each}}",
                json!({"items": ["a", "b", "c"]})
            ),
            "0:a 1:b 2:c "
        );
    }

    #[test]
    fn eq_condition() {
        let template = Template::compile("{{#if (eq a b)}}yes{{/if}}").unwrap();
        assert_eq!(template.render(&json!({"a": 1, "b": 1})).unwrap(), "yes");
        assert_eq!(template.render(&json!({"a": 1, "b": 2})).unwrap(), "");
    }

    #[test]
    fn nested_loops() {
        let src = "{{#each rows}}{{@index}}[{{#each this}}{{@index}}={{this}};{{/each}}]{{/each}}";
        assert_eq!(
            render(src, json!({"rows": [["a", "b"], ["c"]]})),
            "0[0=a;1=b;]1[0=c;]"
        );
    }

    #[test]
    fn compiled_artifact() {
        let options = Options {
            context_var_name: "data",
            ..Options::default()
        };
        let template = Template::compile_with("Hi {{#each xs}}{{this}}{{/each}}", options).unwrap();
        assert_eq!(template.artifact().ops().len(), 2);
        assert_eq!(template.artifact().ops()[0], Op::Text("Hi ".to_string()));
        assert_eq!(template.source(), template.artifact().source());
        assert!(template.source().starts_with("| data : & Value |"));
        assert_eq!(template.artifact().call(&json!({"xs": [1, 2]})).unwrap(), "Hi 12");
    }

    #[test]
    fn unclosed_blocks() {
        assert_eq!(
            Template::compile("{{#if x}}"),
            Err(Error::Structure("Unclosed {{#if}}".to_string()))
        );
        assert_eq!(
            Template::compile("{{#each y}}"),
            Err(Error::Structure("Unclosed {{#each}}".to_string()))
        );
    }

    #[test]
    fn missing_paths_render_empty() {
        assert_eq!(render("[{{a.b.c}}]", json!({"a": {}})), "[]");
        assert_eq!(render("[{{a.b.c}}]", json!({})), "[]");
    }

    #[test]
    fn compiling_twice_is_idempotent() {
        let src = "{{#each xs}}{{#if (gt this 1)}}{{this}}{{/if}}{{/each}}";
        let context = json!({"xs": [1, 2, 3]});
        let first = Template::compile(src).unwrap();
        let second = Template::compile(src).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.render(&context).unwrap(), second.render(&context).unwrap());
    }

    #[test]
    fn each_over_non_array() {
        let template = Template::compile("{{#each items}}x{{/each}}").unwrap();
        assert_eq!(template.render(&json!({"items": "abc"})).unwrap(), "");
        assert_eq!(template.render(&json!({"items": {"a": 1}})).unwrap(), "");
        assert_eq!(template.render(&json!({})).unwrap(), "");
    }

    #[test]
    fn invocation_errors_are_wrapped() {
        let template = Template::compile("{{user.name.toUpperCase()}}").unwrap();
        let err = template.render(&json!({})).unwrap_err();
        assert!(matches!(&err, RenderError::Failed(_)));
        assert!(err.to_string().starts_with("rendering failed: "));
    }

    #[derive(Serialize)]
    struct Todo {
        title: String,
        done: bool,
    }

    #[test]
    fn serializable_contexts() {
        let template =
            Template::compile("{{#each this}}{{#if this.done}}{{this.title}} {{/if}}{{/each}}")
                .unwrap();
        let todos = vec![
            Todo {
                title: "write".to_string(),
                done: true,
            },
            Todo {
                title: "test".to_string(),
                done: false,
            },
        ];
        assert_eq!(template.render_serialize(&todos).unwrap(), "write ");
    }

    #[test]
    fn macro_usage() {
        mod templates {
            crate::str!("greeting", "Hello {{name}}!");
            //language=handlebars
            crate::str!(
                "TodoCount",
                r#"{{todos.filter(t => !t.done).length}} of {{todos.length}} left"#
            );
        }
        assert_eq!(
            templates::greeting().render(&json!({"name": "King"})).unwrap(),
            "Hello King!"
        );
        assert_eq!(
            templates::todo_count()
                .render(&json!({"todos": [{"done": true}, {"done": false}]}))
                .unwrap(),
            "1 of 2 left"
        );
        assert!(std::ptr::eq(templates::greeting(), templates::greeting()));
    }
}
