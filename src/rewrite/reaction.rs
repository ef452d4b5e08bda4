//! Reaction coordinator.
//!
//! [`EntityQueryAlter`] is the entry point a query-execution hook calls
//! right before a select query is compiled. One call runs one pass of the
//! state machine below and mutates the query in place:
//!
//! ```text
//! Idle ──(opt-out tag)──────────────────────────────────────────┐
//!  │                                                            │
//!  ▼ resolve aliases ──(no entity tables)───────────────────────┤
//! Resolved                                                      │
//!  │ install override joins                                     │
//!  ▼ relocate fields                                            │
//! FieldsRewritten → ExpressionsRewritten → TablesRewritten      │
//!  → FilterRewritten → OrderRewritten → GroupRewritten          │
//!  → HavingRewritten ──────────────────────────────────────────▶ Done
//! ```

use crate::provider::OverrideProvider;
use crate::sql::query::SelectQuery;

use super::alias::resolve_aliases;
use super::datum::DatumRewriter;
use super::entity::{validate_mappings, EntityMapping, EntityMappingError};
use super::fields::relocate_fields;
use super::joins::install_override_joins;
use super::walker::Walker;

/// Tag that makes a query skip rewriting entirely.
pub const DEFAULT_NO_ALTER_TAG: &str = "overlay_no_alter";

/// Something that reacts to a select query about to be compiled.
pub trait Reaction: std::fmt::Debug {
    /// Registry identifier.
    fn id(&self) -> &'static str;

    fn react(&self, query: &mut SelectQuery, provider: &dyn OverrideProvider) -> ReactionOutcome;
}

/// Coordinator states, in the order a full pass visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionState {
    Idle,
    Resolved,
    FieldsRewritten,
    ExpressionsRewritten,
    TablesRewritten,
    FilterRewritten,
    OrderRewritten,
    GroupRewritten,
    HavingRewritten,
    Done,
}

/// Which terminal path a pass took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// The query carried the opt-out tag. Nothing was touched.
    OptedOut,
    /// No configured entity's base table is in the query. Nothing was touched.
    NoEntities,
    /// Base tables of the listed entities were found and the query rewritten.
    Rewritten { entities: Vec<String> },
}

impl ReactionOutcome {
    pub fn is_rewritten(&self) -> bool {
        matches!(self, ReactionOutcome::Rewritten { .. })
    }
}

/// Rewrites select queries so configured entities read overridden data.
#[derive(Debug, Clone)]
pub struct EntityQueryAlter {
    entities: Vec<EntityMapping>,
    no_alter_tag: String,
}

impl EntityQueryAlter {
    pub const ID: &'static str = "entity_select_query_alter";

    /// Build a coordinator. Invalid mappings are rejected here, before any
    /// query is seen.
    pub fn new(entities: Vec<EntityMapping>) -> Result<Self, EntityMappingError> {
        validate_mappings(&entities)?;
        Ok(Self {
            entities,
            no_alter_tag: DEFAULT_NO_ALTER_TAG.to_string(),
        })
    }

    pub fn with_no_alter_tag(mut self, tag: &str) -> Self {
        self.no_alter_tag = tag.to_string();
        self
    }

    pub fn entities(&self) -> &[EntityMapping] {
        &self.entities
    }

    pub fn no_alter_tag(&self) -> &str {
        &self.no_alter_tag
    }
}

struct Pass {
    state: ReactionState,
}

impl Pass {
    fn advance(&mut self, next: ReactionState) {
        log::debug!("query alter: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

impl Reaction for EntityQueryAlter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn react(&self, query: &mut SelectQuery, provider: &dyn OverrideProvider) -> ReactionOutcome {
        let mut pass = Pass {
            state: ReactionState::Idle,
        };

        if query.has_tag(&self.no_alter_tag) {
            pass.advance(ReactionState::Done);
            return ReactionOutcome::OptedOut;
        }

        let aliases = resolve_aliases(&query.tables, &self.entities);
        if aliases.is_empty() {
            pass.advance(ReactionState::Done);
            return ReactionOutcome::NoEntities;
        }
        pass.advance(ReactionState::Resolved);

        let property_map = provider.property_map();
        install_override_joins(query, &aliases, provider);

        let relocation = relocate_fields(query, &aliases, property_map);
        log::debug!(
            "moved {} field(s) to expressions, switched {} to revision tables",
            relocation.moved.len(),
            relocation.switched.len()
        );
        pass.advance(ReactionState::FieldsRewritten);

        let datum = DatumRewriter::new(&aliases, property_map);
        let walker = Walker::new(&datum);

        walker.walk_map(&mut query.expressions);
        pass.advance(ReactionState::ExpressionsRewritten);
        walker.walk_map(&mut query.tables);
        pass.advance(ReactionState::TablesRewritten);
        walker.walk_condition(&mut query.filter);
        pass.advance(ReactionState::FilterRewritten);
        walker.walk_map(&mut query.order);
        pass.advance(ReactionState::OrderRewritten);
        walker.walk_map(&mut query.group);
        pass.advance(ReactionState::GroupRewritten);
        walker.walk_condition(&mut query.having);
        pass.advance(ReactionState::HavingRewritten);

        pass.advance(ReactionState::Done);
        ReactionOutcome::Rewritten {
            entities: aliases
                .iter()
                .map(|resolved| resolved.entity.base_table.clone())
                .collect(),
        }
    }
}
