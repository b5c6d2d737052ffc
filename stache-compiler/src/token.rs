//! Token vocabulary shared by the scanner and the tree builder

use std::fmt::Display;

/// The two block helpers understood by the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    Each,
}

impl BlockKind {
    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::If => "if",
            BlockKind::Each => "each",
        }
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A flat token produced by the scanner, in template order
///
/// Tokens borrow from the template text and carry no nesting information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    /// Literal text between markers
    Text(&'a str),
    /// `{{expression}}`
    Variable(&'a str),
    /// `{{{expression}}}`
    RawVariable(&'a str),
    /// `{{#if condition}}` or `{{#each items}}`
    Open(BlockKind, &'a str),
    /// `{{/if}}` or `{{/each}}`
    Close(BlockKind),
}
