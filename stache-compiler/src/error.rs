//! Error handling for the template compiler
//!
//! Every stage reports failures through the single [`Error`] enum. Each variant
//! corresponds to the stage that detected the problem, so callers can tell a
//! malformed marker from an unmatched block or a bad expression without
//! inspecting the message text.

use thiserror::Error;

/// Error type for template compilation and artifact invocation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Raised by the scanner: unterminated marker, empty directive argument,
    /// unknown closing directive
    #[error("syntax error: {0}")]
    Syntax(String),

    /// Raised by the tree builder: unmatched block or trailing tokens
    #[error("structural error: {0}")]
    Structure(String),

    /// Raised by the code generator; `snippet` is the offending source text
    #[error("{message}: \"{snippet}\"")]
    Expression { message: String, snippet: String },

    /// Raised while a compiled artifact runs
    #[error("invocation error: {0}")]
    Invocation(String),
}

/// Returns the last 32 characters of a string for error context
pub(crate) fn rcap(src: &str) -> &str {
    const CAP_AT: usize = 32;

    match src.char_indices().rev().nth(CAP_AT - 1) {
        Some((start, _)) => &src[start..],
        None => src,
    }
}

impl Error {
    /// Creates an expression error naming the original expression text
    pub(crate) fn expression(message: &str, snippet: &str) -> Self {
        Self::Expression {
            message: message.to_string(),
            snippet: snippet.to_string(),
        }
    }

    /// Creates an error for a marker that never closes
    pub(crate) fn unterminated(opener: &str, preffix: &str) -> Self {
        Self::Syntax(format!("unterminated {} near \"{}\"", opener, rcap(preffix)))
    }

    pub(crate) fn invocation(message: impl Into<String>) -> Self {
        Self::Invocation(message.into())
    }
}

/// Result type for compilation and invocation
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rcap_keeps_short_input() {
        assert_eq!(rcap("Hello {{name"), "Hello {{name");
    }

    #[test]
    fn rcap_cuts_on_char_boundary() {
        let src = format!("{}é{}", "a".repeat(40), "b".repeat(31));
        assert_eq!(rcap(&src), format!("é{}", "b".repeat(31)));
    }

    #[test]
    fn expression_error_names_snippet() {
        let err = Error::expression("invalid variable expression", "a b");
        assert_eq!(err.to_string(), "invalid variable expression: \"a b\"");
    }
}
