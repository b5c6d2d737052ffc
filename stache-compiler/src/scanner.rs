//! Template scanning
//!
//! Splits a template into a flat sequence of [`Token`]s:
//! - Text: everything between markers, passed through untouched
//! - Variables: `{{name}}`
//! - Raw variables: `{{{name}}}`
//! - Block markers: `{{#if cond}}`, `{{#each items}}`, `{{/if}}`, `{{/each}}`
//!
//! # Examples
//!
//! ```rust
//! use stache_compiler::scanner::scan;
//! use stache_compiler::token::{BlockKind, Token};
//!
//! let tokens = scan("Hi {{#if user}}{{user.name}}{{/if}}").unwrap();
//! assert_eq!(tokens, vec![
//!     Token::Text("Hi "),
//!     Token::Open(BlockKind::If, "user"),
//!     Token::Variable("user.name"),
//!     Token::Close(BlockKind::If),
//! ]);
//! ```

use tracing::debug;

use crate::{
    error::{Error, Result},
    token::{BlockKind, Token},
};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const RAW_OPEN: &str = "{{{";
const RAW_CLOSE: &str = "}}}";

/// Reads the argument of a `#if` / `#each` directive
///
/// Returns `None` when `content` is not the given directive at all, so that
/// `{{#iffy}}` falls through to a plain variable.
fn directive<'a>(content: &'a str, name: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(name)?;
    match rest.chars().next() {
        None => Some(rest),
        Some(c) if c.is_whitespace() => Some(rest.trim()),
        Some(_) => None,
    }
}

/// Classifies the trimmed content of a marker
fn classify(content: &str, raw: bool) -> Result<Token<'_>> {
    if let Some(condition) = directive(content, "#if") {
        if condition.is_empty() {
            return Err(Error::Syntax("If directive requires a condition".to_string()));
        }
        return Ok(Token::Open(BlockKind::If, condition));
    }
    if let Some(items) = directive(content, "#each") {
        if items.is_empty() {
            return Err(Error::Syntax(
                "Each directive requires an items expression".to_string(),
            ));
        }
        return Ok(Token::Open(BlockKind::Each, items));
    }
    Ok(match content {
        "/if" => Token::Close(BlockKind::If),
        "/each" => Token::Close(BlockKind::Each),
        close if close.starts_with('/') => {
            return Err(Error::Syntax(format!(
                "unknown closing directive \"{}\"",
                close
            )));
        }
        expression if raw => Token::RawVariable(expression),
        expression => Token::Variable(expression),
    })
}

/// Scans a template into tokens
///
/// Fails only when a `{{` or `{{{` marker is never closed, or when a directive
/// is malformed. The empty template yields no tokens.
pub fn scan(src: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = src;
    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            tokens.push(Token::Text(&rest[..start]));
        }
        let marker = &rest[start..];
        let (raw, opener, closer) = if marker.starts_with(RAW_OPEN) {
            (true, RAW_OPEN, RAW_CLOSE)
        } else {
            (false, OPEN, CLOSE)
        };
        let inner = &marker[opener.len()..];
        let end = inner
            .find(closer)
            .ok_or_else(|| Error::unterminated(opener, marker))?;
        tokens.push(classify(inner[..end].trim(), raw)?);
        rest = &inner[end + closer.len()..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest));
    }
    debug!(tokens = tokens.len(), "scanned template");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_template_has_no_tokens() {
        assert_eq!(scan("").unwrap(), vec![]);
    }

    #[test]
    fn plain_text() {
        assert_eq!(scan("<p>Hello</p>").unwrap(), vec![Token::Text("<p>Hello</p>")]);
    }

    #[test]
    fn variables() {
        assert_eq!(
            scan("Hello {{ name }} and {{{ html }}}!").unwrap(),
            vec![
                Token::Text("Hello "),
                Token::Variable("name"),
                Token::Text(" and "),
                Token::RawVariable("html"),
                Token::Text("!"),
            ]
        );
    }

    #[test]
    fn blocks() {
        assert_eq!(
            scan("{{#each items}}{{#if (eq this 1)}}one{{/if}}{{/each}}").unwrap(),
            vec![
                Token::Open(BlockKind::Each, "items"),
                Token::Open(BlockKind::If, "(eq this 1)"),
                Token::Text("one"),
                Token::Close(BlockKind::If),
                Token::Close(BlockKind::Each),
            ]
        );
    }

    #[test]
    fn directive_argument_is_trimmed() {
        assert_eq!(
            scan("{{  #if   ready  }}").unwrap(),
            vec![Token::Open(BlockKind::If, "ready")]
        );
    }

    #[test]
    fn directive_prefix_of_identifier_is_a_variable() {
        assert_eq!(scan("{{#iffy}}").unwrap(), vec![Token::Variable("#iffy")]);
    }

    #[test]
    fn empty_variable_is_left_for_the_generator() {
        assert_eq!(scan("{{ }}").unwrap(), vec![Token::Variable("")]);
    }

    #[test]
    fn empty_directives() {
        assert_eq!(
            scan("{{#if }}").unwrap_err(),
            Error::Syntax("If directive requires a condition".to_string())
        );
        assert_eq!(
            scan("{{#each}}").unwrap_err(),
            Error::Syntax("Each directive requires an items expression".to_string())
        );
    }

    #[test]
    fn unknown_close() {
        assert!(matches!(
            scan("{{#if a}}x{{/unless}}"),
            Err(Error::Syntax(message)) if message.contains("unknown closing directive")
        ));
    }

    #[test]
    fn unterminated() {
        assert!(matches!(scan("Hello {{name"), Err(Error::Syntax(_))));
        assert!(matches!(scan("Hello {{{name}}"), Err(Error::Syntax(_))));
    }

    #[test]
    fn stray_closers_are_text() {
        assert_eq!(scan("a }} b").unwrap(), vec![Token::Text("a }} b")]);
    }

    #[test]
    fn raw_directives() {
        assert_eq!(
            scan("{{{#each list}}}{{{/each}}}").unwrap(),
            vec![Token::Open(BlockKind::Each, "list"), Token::Close(BlockKind::Each)]
        );
    }
}
