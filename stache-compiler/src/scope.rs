//! Loop scopes used while generating code
//!
//! A scope only lives for the generation of one `{{#each}}` subtree. Scopes
//! form a chain from the innermost loop outwards and are never stored in the
//! syntax tree.

use tracing::trace;

use crate::generator::Options;

/// Bindings introduced by one `{{#each}}` occurrence
#[derive(Debug)]
pub struct LoopScope<'p> {
    pub item: String,
    pub index: String,
    pub parent: Option<&'p LoopScope<'p>>,
}

impl<'p> LoopScope<'p> {
    /// Iterates from this scope outwards
    pub fn chain(&self) -> impl Iterator<Item = &LoopScope<'p>> {
        std::iter::successors(Some(self), |scope| scope.parent)
    }

    /// Whether `name` is a binding of this scope or an enclosing one
    pub fn binds(&self, name: &str) -> bool {
        self.chain().any(|scope| scope.item == name || scope.index == name)
    }
}

/// Hands out binding names that are unique within one generation pass
pub struct Names<'o> {
    options: &'o Options,
    next: usize,
}

impl<'o> Names<'o> {
    pub fn new(options: &'o Options) -> Self {
        Self { options, next: 0 }
    }

    /// Opens a scope nested in `parent`
    pub fn open<'p>(&mut self, parent: Option<&'p LoopScope<'p>>) -> LoopScope<'p> {
        let id = self.next;
        self.next += 1;
        let scope = LoopScope {
            item: format!("{}{}", self.options.item_var_prefix, id),
            index: format!("{}{}", self.options.index_var_prefix, id),
            parent,
        };
        trace!(item = %scope.item, index = %scope.index, "opened loop scope");
        scope
    }

    /// Number of scopes opened so far
    pub fn opened(&self) -> usize {
        self.next
    }
}
