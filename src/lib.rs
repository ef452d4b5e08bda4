//! # overlay
//!
//! Transparent entity overrides for structured select queries.
//!
//! ## Architecture
//!
//! A query-execution hook hands every select query to a reaction before it
//! is compiled. The reaction rewrites the query in place so that configured
//! entities read revision and override data instead of the canonical row:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 SelectQuery (sql::query)                 │
//! │  tables, fields, expressions, filter, order, group,      │
//! │  having, tags                                            │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [rewrite::reaction]
//! ┌─────────────────────────────────────────────────────────┐
//! │  alias → override joins → fields → datum rules → walker  │
//! │  (entity mappings from config, property map from the     │
//! │   override provider)                                     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql::dialect]
//! ┌─────────────────────────────────────────────────────────┐
//! │                    SQL text                              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use overlay::prelude::*;
//!
//! let reaction = EntityQueryAlter::new(vec![EntityMapping::new("node", "nid", "vid")
//!     .with_revision_table("node_revision")
//!     .with_revision_fields(&["status"])])
//! .unwrap();
//! let provider = TableOverrideProvider::with_properties(&[("status", "override_status")]);
//!
//! let mut query = SelectQuery::new("node", "n");
//! query.inner_join("node_revision", "nr", "n.vid = nr.vid");
//! query.condition("n.status", 1, Operator::Eq);
//!
//! reaction.react(&mut query, &provider);
//! assert!(query
//!     .to_sql(Dialect::Postgres)
//!     .ends_with("WHERE COALESCE(node_overrides.override_status, nr.status) = 1"));
//! ```

pub mod config;
pub mod provider;
pub mod rewrite;
pub mod sql;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::config::{Settings, SettingsError};
    pub use crate::provider::{OverrideProvider, PropertyMap, TableOverrideProvider};
    pub use crate::rewrite::{
        EntityMapping, EntityQueryAlter, Reaction, ReactionOutcome, DEFAULT_NO_ALTER_TAG,
    };
    pub use crate::sql::{
        Condition, Dialect, JoinType, Literal, Node, Operator, SelectQuery, SortDir, SqlDialect,
    };
}
