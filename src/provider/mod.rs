//! Override providers - where override rows come from.
//!
//! A provider tells the rewriter which columns have an override column
//! ([`PropertyMap`]) and joins its override rows into a query. The rewriter
//! only talks to the [`OverrideProvider`] trait; how the rows are produced
//! (a plain table, a filtered subquery, ...) is up to the implementation.

use indexmap::IndexMap;

use crate::sql::query::{JoinType, SelectQuery, TableSource};

/// Property name that stands for an entity's revision id column.
pub const REVISION_ID_PROPERTY: &str = "revision_id";

/// Base/revision column -> override column.
pub type PropertyMap = IndexMap<String, String>;

/// Source of override data for one query-alter pass.
pub trait OverrideProvider {
    /// Columns that have an override column. May be empty.
    fn property_map(&self) -> &PropertyMap;

    /// Join override rows for `entity_kind` into `query` under
    /// `override_alias`, keyed on `base_alias.base_id`.
    ///
    /// Returns the alias the query actually registered.
    fn add_override_join(
        &self,
        query: &mut SelectQuery,
        base_alias: &str,
        base_id: &str,
        override_alias: &str,
        entity_kind: &str,
    ) -> String;
}

/// Where a [`TableOverrideProvider`] reads one entity kind's overrides.
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideSource {
    Table(String),
    Subquery(SelectQuery),
}

impl From<&OverrideSource> for TableSource {
    fn from(source: &OverrideSource) -> Self {
        match source {
            OverrideSource::Table(table) => TableSource::Table(table.clone()),
            OverrideSource::Subquery(query) => TableSource::Subquery(Box::new(query.clone())),
        }
    }
}

/// Reads overrides from one table (or subquery) per entity kind.
///
/// Kinds without an explicit source read from `{kind}_override`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableOverrideProvider {
    property_map: PropertyMap,
    sources: IndexMap<String, OverrideSource>,
}

impl TableOverrideProvider {
    pub fn new(property_map: PropertyMap) -> Self {
        Self {
            property_map,
            sources: IndexMap::new(),
        }
    }

    /// Build from `(column, override column)` pairs.
    pub fn with_properties(pairs: &[(&str, &str)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(column, override_column)| (column.to_string(), override_column.to_string()))
                .collect(),
        )
    }

    pub fn with_table(mut self, entity_kind: &str, table: &str) -> Self {
        self.sources
            .insert(entity_kind.into(), OverrideSource::Table(table.into()));
        self
    }

    pub fn with_subquery(mut self, entity_kind: &str, query: SelectQuery) -> Self {
        self.sources
            .insert(entity_kind.into(), OverrideSource::Subquery(query));
        self
    }

    pub fn source(&self, entity_kind: &str) -> TableSource {
        match self.sources.get(entity_kind) {
            Some(source) => source.into(),
            None => TableSource::Table(format!("{entity_kind}_override")),
        }
    }
}

impl OverrideProvider for TableOverrideProvider {
    fn property_map(&self) -> &PropertyMap {
        &self.property_map
    }

    fn add_override_join(
        &self,
        query: &mut SelectQuery,
        base_alias: &str,
        base_id: &str,
        override_alias: &str,
        entity_kind: &str,
    ) -> String {
        let registered = query.add_join_on(
            JoinType::Left,
            self.source(entity_kind),
            override_alias,
            base_alias,
            base_id,
            base_id,
        );
        // Rewritten ON clauses of later joins may reference the override alias.
        query.move_table_after(&registered, base_alias);
        registered
    }
}
