//! Entity override rewriting.
//!
//! Given the configured [`EntityMapping`]s and an [`OverrideProvider`],
//! rewrites a [`SelectQuery`] in place so that every reference to a base
//! table column reads the revision table and/or the override value:
//!
//! ```text
//! tables ──▶ [alias]   which entities are present, under which aliases
//!               │
//!               ├──▶ [joins]   LEFT JOIN override rows per entity
//!               ├──▶ [fields]  move mapped fields to expressions
//!               ▼
//!           [datum]   compiled reference substitutions
//!               │
//!               ▼
//!           [walker]  expressions, tables, filter, order, group, having
//! ```
//!
//! [`reaction`] ties the steps together; [`registry`] builds reactions
//! from configuration.
//!
//! [`OverrideProvider`]: crate::provider::OverrideProvider
//! [`SelectQuery`]: crate::sql::query::SelectQuery

pub mod alias;
pub mod datum;
pub mod entity;
pub mod fields;
pub mod joins;
pub mod reaction;
pub mod registry;
pub mod walker;

pub use alias::{resolve_aliases, AliasMap, EntityAliases, TableRole};
pub use datum::DatumRewriter;
pub use entity::{EntityMapping, EntityMappingError};
pub use fields::{relocate_fields, Relocation};
pub use joins::install_override_joins;
pub use reaction::{
    EntityQueryAlter, Reaction, ReactionOutcome, ReactionState, DEFAULT_NO_ALTER_TAG,
};
pub use registry::{create_reaction, reaction_ids, RegistryError};
pub use walker::{transplant, Walker};
