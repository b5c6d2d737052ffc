//! Syntax tree construction
//!
//! Turns the flat token sequence into a strictly nested tree by matching each
//! block opener with its closer. Expression text is carried through untouched;
//! interpreting it is the generator's job.

use tracing::debug;

use crate::{
    error::{Error, Result},
    token::{BlockKind, Token},
};

/// A node of the syntax tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    Text(&'a str),
    Variable(&'a str),
    RawVariable(&'a str),
    If {
        condition: &'a str,
        children: Vec<Node<'a>>,
    },
    Each {
        items: &'a str,
        children: Vec<Node<'a>>,
    },
}

/// The root of a template
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Root<'a> {
    pub children: Vec<Node<'a>>,
}

/// Siblings parsed up to a closer, plus where parsing stopped
struct Siblings<'a> {
    nodes: Vec<Node<'a>>,
    pos: usize,
    closed_by: Option<BlockKind>,
}

/// Consumes tokens until a closer (left unconsumed) or the end of input
fn parse_siblings<'a>(tokens: &[Token<'a>], mut pos: usize) -> Result<Siblings<'a>> {
    let mut nodes = Vec::new();
    while let Some(token) = tokens.get(pos) {
        match *token {
            Token::Text(value) => nodes.push(Node::Text(value)),
            Token::Variable(expression) => nodes.push(Node::Variable(expression)),
            Token::RawVariable(expression) => nodes.push(Node::RawVariable(expression)),
            Token::Close(kind) => {
                return Ok(Siblings {
                    nodes,
                    pos,
                    closed_by: Some(kind),
                });
            }
            Token::Open(kind, argument) => {
                let inner = parse_siblings(tokens, pos + 1)?;
                if inner.closed_by != Some(kind) {
                    return Err(Error::Structure(format!("Unclosed {{{{#{}}}}}", kind)));
                }
                let children = inner.nodes;
                nodes.push(match kind {
                    BlockKind::If => Node::If {
                        condition: argument,
                        children,
                    },
                    BlockKind::Each => Node::Each {
                        items: argument,
                        children,
                    },
                });
                pos = inner.pos;
            }
        }
        pos += 1;
    }
    Ok(Siblings {
        nodes,
        pos,
        closed_by: None,
    })
}

/// Builds the syntax tree for a token sequence
pub fn build<'a>(tokens: &[Token<'a>]) -> Result<Root<'a>> {
    let top = parse_siblings(tokens, 0)?;
    if top.pos != tokens.len() {
        return Err(Error::Structure(
            "unexpected tokens at end of template".to_string(),
        ));
    }
    debug!(nodes = top.nodes.len(), "built syntax tree");
    Ok(Root { children: top.nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::scan;

    fn parse(src: &str) -> Result<Root<'_>> {
        build(&scan(src)?)
    }

    #[test]
    fn flat() {
        assert_eq!(
            parse("Hello {{name}}{{{html}}}").unwrap().children,
            vec![Node::Text("Hello "), Node::Variable("name"), Node::RawVariable("html")]
        );
    }

    #[test]
    fn nesting() {
        assert_eq!(
            parse("a{{#each xs}}{{#if this}}b{{/if}}c{{/each}}d").unwrap().children,
            vec![
                Node::Text("a"),
                Node::Each {
                    items: "xs",
                    children: vec![
                        Node::If {
                            condition: "this",
                            children: vec![Node::Text("b")]
                        },
                        Node::Text("c"),
                    ]
                },
                Node::Text("d"),
            ]
        );
    }

    #[test]
    fn empty_block() {
        assert_eq!(
            parse("{{#if x}}{{/if}}").unwrap().children,
            vec![Node::If {
                condition: "x",
                children: vec![]
            }]
        );
    }

    #[test]
    fn unclosed() {
        assert_eq!(
            parse("{{#if x}}").unwrap_err(),
            Error::Structure("Unclosed {{#if}}".to_string())
        );
        assert_eq!(
            parse("{{#each y}}{{#if x}}{{/if}}").unwrap_err(),
            Error::Structure("Unclosed {{#each}}".to_string())
        );
    }

    #[test]
    fn mismatched_closer() {
        assert_eq!(
            parse("{{#if x}}{{/each}}").unwrap_err(),
            Error::Structure("Unclosed {{#if}}".to_string())
        );
    }

    #[test]
    fn trailing_closer() {
        assert_eq!(
            parse("a{{/if}}b").unwrap_err(),
            Error::Structure("unexpected tokens at end of template".to_string())
        );
    }

    #[test]
    fn empty() {
        assert_eq!(parse("").unwrap(), Root::default());
    }
}
