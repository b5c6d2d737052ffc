//! Operators the Rust expression grammar lacks
//!
//! Complex expressions are parsed with `syn`, so before parsing the token
//! stream is rewritten:
//!
//! - `c ? a : b` becomes `(if c { a } else { b })`
//! - `a ?? b` becomes `nullish!(a, b)`
//! - `a?.[i]` becomes `a?[i]`
//!
//! `a?.b` and `a?.m()` parse as they are, as a field or method access on a
//! `?` expression, and are lowered to optional chaining.

use proc_macro2::{Delimiter, Group, Ident, Spacing, Span, TokenStream, TokenTree};
use quote::quote;

/// Macro name standing in for `??`
pub(crate) const NULLISH: &str = "nullish";

fn is_punct(tree: Option<&TokenTree>, ch: char) -> bool {
    matches!(tree, Some(TokenTree::Punct(p)) if p.as_char() == ch)
}

fn is_joint(tree: Option<&TokenTree>, ch: char) -> bool {
    matches!(tree, Some(TokenTree::Punct(p)) if p.as_char() == ch && p.spacing() == Spacing::Joint)
}

/// First `?` of a `??` pair
fn is_nullish(tokens: &[TokenTree], pos: usize) -> bool {
    is_joint(tokens.get(pos), '?') && is_punct(tokens.get(pos + 1), '?')
}

/// A `?` opening a conditional, as opposed to `??`, `?.` or `?[`
fn is_conditional(tokens: &[TokenTree], pos: usize) -> bool {
    let next = tokens.get(pos + 1);
    let optional_index = is_joint(tokens.get(pos), '?')
        && matches!(next, Some(TokenTree::Group(g)) if g.delimiter() == Delimiter::Bracket);
    is_punct(tokens.get(pos), '?')
        && !is_punct(next, '?')
        && !is_punct(next, '.')
        && !optional_index
        && !(pos > 0 && is_joint(tokens.get(pos - 1), '?'))
}

/// Rewrites an expression, groups included
pub(crate) fn desugar(stream: TokenStream) -> TokenStream {
    let mut tokens: Vec<TokenTree> = Vec::new();
    let mut trees = stream.into_iter().peekable();
    while let Some(tree) = trees.next() {
        let tree = match tree {
            TokenTree::Group(group) => {
                let mut inner = Group::new(group.delimiter(), desugar(group.stream()));
                inner.set_span(group.span());
                TokenTree::Group(inner)
            }
            other => other,
        };
        // `?.[` loses its dot, the `?` stays joint
        let bracket_follows = matches!(
            trees.peek(),
            Some(TokenTree::Group(g)) if g.delimiter() == Delimiter::Bracket
        );
        if is_punct(Some(&tree), '.') && is_joint(tokens.last(), '?') && bracket_follows {
            continue;
        }
        tokens.push(tree);
    }

    let mut out = TokenStream::new();
    for (i, segment) in segments(&tokens).into_iter().enumerate() {
        if i > 0 {
            out.extend(quote!(,));
        }
        out.extend(closure(segment));
    }
    out
}

/// Splits on top-level commas, keeping closure parameter lists whole
fn segments(tokens: &[TokenTree]) -> Vec<&[TokenTree]> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_params = false;
    for (pos, tree) in tokens.iter().enumerate() {
        if is_punct(Some(tree), '|') && (pos == start || in_params) {
            in_params = pos == start;
        } else if !in_params && is_punct(Some(tree), ',') {
            segments.push(&tokens[start..pos]);
            start = pos + 1;
        }
    }
    segments.push(&tokens[start..]);
    segments
}

/// Keeps a leading closure parameter list and rewrites the body
fn closure(tokens: &[TokenTree]) -> TokenStream {
    let params = match tokens.first() {
        Some(first) if is_punct(Some(first), '|') => tokens[1..]
            .iter()
            .position(|tree| is_punct(Some(tree), '|'))
            .map(|end| end + 2),
        _ => None,
    };
    match params {
        Some(len) => {
            let mut out: TokenStream = tokens[..len].iter().cloned().collect();
            out.extend(conditional(&tokens[len..]));
            out
        }
        None => conditional(tokens),
    }
}

/// `c ? a : b`, right associative and looser than any other operator
fn conditional(tokens: &[TokenTree]) -> TokenStream {
    let Some(question) = (0..tokens.len()).find(|&pos| is_conditional(tokens, pos)) else {
        return nullish(tokens);
    };
    let mut nested = 0usize;
    let colon = (question + 1..tokens.len()).find(|&pos| {
        if is_conditional(tokens, pos) {
            nested += 1;
        } else if is_punct(tokens.get(pos), ':') {
            if nested == 0 {
                return true;
            }
            nested -= 1;
        }
        false
    });
    let Some(colon) = colon else {
        return tokens.iter().cloned().collect();
    };
    let condition = nullish(&tokens[..question]);
    let then = conditional(&tokens[question + 1..colon]);
    let otherwise = conditional(&tokens[colon + 1..]);
    quote!((if #condition { #then } else { #otherwise }))
}

/// `a ?? b`, left associative
fn nullish(tokens: &[TokenTree]) -> TokenStream {
    let mut operands = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while pos < tokens.len() {
        if is_nullish(tokens, pos) {
            operands.push(&tokens[start..pos]);
            pos += 2;
            start = pos;
        } else {
            pos += 1;
        }
    }
    operands.push(&tokens[start..]);

    let name = Ident::new(NULLISH, Span::call_site());
    let mut operands = operands.into_iter();
    let mut out: TokenStream = operands.next().unwrap_or_default().iter().cloned().collect();
    for operand in operands {
        let operand: TokenStream = operand.iter().cloned().collect();
        out = quote!(#name!(#out, #operand));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // token spacing differs between parsed and quoted streams
    fn compact(tokens: TokenStream) -> String {
        tokens.to_string().split_whitespace().collect()
    }

    fn rewrite(src: &str) -> String {
        compact(desugar(src.parse().unwrap()))
    }

    fn expected(tokens: TokenStream) -> String {
        compact(tokens)
    }

    #[test]
    fn plain_expressions_pass_through() {
        assert_eq!(rewrite("a + b.c(1, 2)"), expected(quote!(a + b.c(1, 2))));
        assert_eq!(rewrite("user?.name"), expected(quote!(user?.name)));
    }

    #[test]
    fn conditionals() {
        assert_eq!(
            rewrite("a == 0 ? \"none\" : a"),
            expected(quote!((if a == 0 { "none" } else { a })))
        );
        assert_eq!(
            rewrite("a ? b ? 1 : 2 : c ? 3 : 4"),
            expected(quote!((if a { (if b { 1 } else { 2 }) } else { (if c { 3 } else { 4 }) })))
        );
        assert_eq!(
            rewrite("f(x ? 1 : 2, y)"),
            expected(quote!(f((if x { 1 } else { 2 }), y)))
        );
    }

    #[test]
    fn closures_keep_their_parameters() {
        assert_eq!(
            rewrite("xs.map(|x, i| x ? i : 0)"),
            expected(quote!(xs.map(|x, i| (if x { i } else { 0 }))))
        );
        assert_eq!(
            rewrite("xs.map(|| a ?? b)"),
            expected(quote!(xs.map(|| nullish!(a, b))))
        );
    }

    #[test]
    fn nullish_chains() {
        assert_eq!(rewrite("a ?? b"), expected(quote!(nullish!(a, b))));
        assert_eq!(
            rewrite("a ?? b ?? \"c\""),
            expected(quote!(nullish!(nullish!(a, b), "c")))
        );
        assert_eq!(
            rewrite("a ?? b ? 1 : 2"),
            expected(quote!((if nullish!(a, b) { 1 } else { 2 })))
        );
    }

    #[test]
    fn optional_index() {
        let tokens = desugar("a?.[0]".parse().unwrap());
        let parsed: syn::Expr = syn::parse2(tokens).unwrap();
        assert!(matches!(parsed, syn::Expr::Index(index) if matches!(*index.expr, syn::Expr::Try(_))));
    }

    #[test]
    fn missing_branch_is_left_for_the_parser() {
        assert!(syn::parse2::<syn::Expr>(desugar("a ? b".parse().unwrap())).is_err());
    }
}
