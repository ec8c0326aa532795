//! Script syntax trees.
//!
//! The class extractor only needs a small, ESTree-shaped view of a script:
//! literals, identifiers, member accesses, calls, object and array literals,
//! and functions. Every other construct is an [`Node::Other`] that still
//! exposes its children, so traversal reaches calls nested anywhere.
//!
//! Tree construction sits behind [`ScriptParser`], so any parsing backend can
//! be plugged in. [`LiteParser`] is the built-in one.

mod lexer;
mod parser;

pub use parser::LiteParser;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at byte {offset}")]
    UnexpectedChar { ch: char, offset: usize },

    #[error("unterminated {what} starting at byte {offset}")]
    Unterminated { what: &'static str, offset: usize },

    #[error("unexpected {found} at byte {offset}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        offset: usize,
    },

    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    #[error("parsing timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("parser stopped: {0}")]
    Aborted(String),
}

/// Turns script text into a [`SyntaxTree`]
pub trait ScriptParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<SyntaxTree, ParseError>;
}

/// A parsed script: its top-level statements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxTree {
    pub body: Vec<Node>,
}

impl SyntaxTree {
    /// Visit every node depth-first, parents before children
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        for node in &self.body {
            node.walk(visit);
        }
    }
}

/// Scalar literal value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

/// Property name of a member access
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MemberProperty {
    /// `object.name`
    Named(String),
    /// `object[expr]`
    Computed(Box<Node>),
}

/// Key of an object literal entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PropertyKey {
    /// Identifier, string or numeric key, as its string value
    Named(String),
    /// `[expr]: value`
    Computed(Box<Node>),
    /// `...expr`, the value holds the spread expression
    Spread,
}

impl PropertyKey {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }
}

/// One entry of an object literal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectEntry {
    pub key: PropertyKey,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: Option<String>,
    /// Parameter patterns, defaults and rest elements included
    pub params: Vec<Node>,
    pub arrow: bool,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    Literal {
        value: Literal,
    },
    Identifier {
        name: String,
    },
    Member {
        object: Box<Node>,
        property: MemberProperty,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    Object {
        entries: Vec<ObjectEntry>,
    },
    /// `None` marks an elided slot such as the middle of `[a,,b]`
    Array {
        elements: Vec<Option<Node>>,
    },
    Function(Function),
    /// Any other statement or expression, kept for traversal
    Other {
        kind: &'static str,
        children: Vec<Node>,
    },
}

impl Node {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier { name: name.into() }
    }

    pub fn literal(value: Literal) -> Self {
        Self::Literal { value }
    }

    pub fn other(kind: &'static str, children: Vec<Node>) -> Self {
        Self::Other { kind, children }
    }

    /// ESTree-style name of the node's syntactic kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Literal { .. } => "Literal",
            Self::Identifier { .. } => "Identifier",
            Self::Member { .. } => "MemberExpression",
            Self::Call { .. } => "CallExpression",
            Self::Object { .. } => "ObjectExpression",
            Self::Array { .. } => "ArrayExpression",
            Self::Function(f) if f.arrow => "ArrowFunctionExpression",
            Self::Function(_) => "FunctionExpression",
            Self::Other { kind, .. } => *kind,
        }
    }

    /// Direct child nodes
    pub fn children(&self) -> Vec<&Node> {
        match self {
            Self::Literal { .. } | Self::Identifier { .. } => Vec::new(),
            Self::Member { object, property } => {
                let mut out = vec![object.as_ref()];
                if let MemberProperty::Computed(expr) = property {
                    out.push(expr.as_ref());
                }
                out
            }
            Self::Call { callee, arguments } => {
                std::iter::once(callee.as_ref()).chain(arguments.iter()).collect()
            }
            Self::Object { entries } => entries
                .iter()
                .flat_map(|e| {
                    let key = match &e.key {
                        PropertyKey::Computed(expr) => Some(expr.as_ref()),
                        _ => None,
                    };
                    key.into_iter().chain(std::iter::once(&e.value))
                })
                .collect(),
            Self::Array { elements } => elements.iter().flatten().collect(),
            Self::Function(f) => f.params.iter().chain(f.body.iter()).collect(),
            Self::Other { children, .. } => children.iter().collect(),
        }
    }

    /// Visit this node and all of its descendants
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    /// Names of a pure member chain, root first: `cc.Component` -> `["cc", "Component"]`
    ///
    /// Returns `None` for computed accesses or non-identifier roots.
    pub fn member_chain(&self) -> Option<Vec<&str>> {
        let mut names = Vec::new();
        let mut current = self;
        loop {
            match current {
                Self::Member {
                    object,
                    property: MemberProperty::Named(name),
                } => {
                    names.push(name.as_str());
                    current = object;
                }
                Self::Identifier { name } => {
                    names.push(name.as_str());
                    break;
                }
                _ => return None,
            }
        }
        names.reverse();
        Some(names)
    }
}

/// Render a number the way script source would spell it
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(object: Node, name: &str) -> Node {
        Node::Member {
            object: Box::new(object),
            property: MemberProperty::Named(name.to_string()),
        }
    }

    #[test]
    fn test_member_chain_root_to_leaf() {
        let node = member(member(Node::ident("cc"), "ui"), "Label");
        assert_eq!(node.member_chain(), Some(vec!["cc", "ui", "Label"]));
    }

    #[test]
    fn test_member_chain_rejects_computed() {
        let node = Node::Member {
            object: Box::new(Node::ident("a")),
            property: MemberProperty::Computed(Box::new(Node::literal(Literal::Number(0.0)))),
        };
        assert_eq!(node.member_chain(), None);
    }

    #[test]
    fn test_walk_reaches_nested_nodes() {
        let tree = SyntaxTree {
            body: vec![Node::other(
                "VariableDeclaration",
                vec![Node::Array {
                    elements: vec![None, Some(Node::ident("deep"))],
                }],
            )],
        };
        let mut kinds = Vec::new();
        tree.walk(&mut |n| kinds.push(n.kind()));
        assert_eq!(kinds, vec!["VariableDeclaration", "ArrayExpression", "Identifier"]);
    }

    #[test]
    fn test_children_include_computed_keys() {
        let node = Node::Object {
            entries: vec![ObjectEntry {
                key: PropertyKey::Computed(Box::new(Node::ident("k"))),
                value: Node::literal(Literal::Null),
            }],
        };
        let kinds: Vec<_> = node.children().iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec!["Identifier", "Literal"]);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
    }
}
