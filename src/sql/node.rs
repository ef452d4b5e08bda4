//! Structural nodes - the building blocks of query sections.
//!
//! The `tables`, `expressions`, `order` and `group` sections of a
//! [`SelectQuery`](super::query::SelectQuery) are insertion-ordered maps of
//! [`Node`]s. A node is a closed tagged union, so anything that walks a
//! section matches on the variant instead of probing for capabilities.

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::condition::Condition;
use super::dialect::Dialect;
use super::query::SelectQuery;
use super::token::Token;

/// Insertion-ordered keyed container.
pub type NodeMap = IndexMap<String, Node>;

/// Pattern for `:name` placeholders inside raw SQL fragments.
static PLACEHOLDER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[A-Za-z_][A-Za-z0-9_]*").unwrap());

// =============================================================================
// Node
// =============================================================================

/// One element of a structural section.
///
/// Deserialization is untagged: `{"conjunction": .., "items": [..]}` is a
/// condition, `{"subquery": {..}}` is a subquery, any other object is a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Condition(Condition),
    /// Opaque nested query; never rewritten.
    Subquery {
        subquery: Box<SelectQuery>,
    },
    Map(NodeMap),
    List(Vec<Node>),
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn subquery(query: SelectQuery) -> Self {
        Node::Subquery {
            subquery: Box::new(query),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&NodeMap> {
        match self {
            Node::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_condition(&self) -> Option<&Condition> {
        match self {
            Node::Condition(condition) => Some(condition),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }
}

impl From<&str> for Node {
    fn from(s: &str) -> Self {
        Node::Text(s.into())
    }
}

impl From<String> for Node {
    fn from(s: String) -> Self {
        Node::Text(s)
    }
}

impl From<Condition> for Node {
    fn from(condition: Condition) -> Self {
        Node::Condition(condition)
    }
}

impl From<NodeMap> for Node {
    fn from(map: NodeMap) -> Self {
        Node::Map(map)
    }
}

/// Look up a text entry in a map node.
pub fn map_text<'a>(map: &'a NodeMap, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Node::as_text)
}

// =============================================================================
// Literals
// =============================================================================

/// A bound value: condition operands and placeholder arguments.
///
/// Literals are data, never column references.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Literal {
    pub fn to_token(&self) -> Token {
        match self {
            Literal::Null => Token::LitNull,
            Literal::Bool(b) => Token::LitBool(*b),
            Literal::Int(n) => Token::LitInt(*n),
            Literal::Float(f) => Token::LitFloat(*f),
            Literal::Text(s) => Token::LitString(s.clone()),
        }
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Int(n)
    }
}

impl From<i32> for Literal {
    fn from(n: i32) -> Self {
        Literal::Int(n.into())
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        Literal::Float(f)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Text(s.into())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::Text(s)
    }
}

/// Placeholder arguments keyed by placeholder name, including the colon.
pub type Arguments = IndexMap<String, Literal>;

/// Substitute `:name` placeholders with dialect-quoted literals.
///
/// Unknown placeholders are left in place.
pub fn bind_placeholders(sql: &str, arguments: &Arguments, dialect: Dialect) -> String {
    if arguments.is_empty() {
        return sql.to_string();
    }
    PLACEHOLDER_PATTERN
        .replace_all(sql, |caps: &Captures| match arguments.get(&caps[0]) {
            Some(value) => value.to_token().serialize(dialect),
            None => caps[0].to_string(),
        })
        .into_owned()
}
