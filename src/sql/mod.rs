//! SQL query model.
//!
//! The model mirrors the structured select query of a database abstraction
//! layer: every clause is a separately addressable section that a rewrite
//! pass can inspect and mutate before the query is compiled to text.
//!
//! - [`query`] - the [`SelectQuery`] tree and its builders
//! - [`node`] - structural nodes stored in query sections
//! - [`condition`] - WHERE/HAVING/ON condition trees
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - destination engine quoting and escaping

pub mod condition;
pub mod dialect;
pub mod node;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use condition::{Condition, ConditionItem, ConditionValue, Conjunction, FieldEscaping, Operator};
pub use dialect::{Dialect, SqlDialect};
pub use node::{Arguments, Literal, Node, NodeMap};
pub use query::{Field, JoinType, LimitOffset, SelectQuery, SortDir, TableSource};
pub use token::{Token, TokenStream};
