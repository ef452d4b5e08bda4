//! Alias resolution - which configured entities a query actually reads.
//!
//! The map is built fresh for every rewrite pass from the query's table
//! section and thrown away afterwards.

use crate::sql::node::NodeMap;
use crate::sql::query::physical_table;

use super::entity::EntityMapping;

/// The part an aliased table plays for an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableRole {
    Base,
    Revision,
    /// Synthesized, never looked up in the query.
    Override,
}

/// Aliases of one entity inside one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityAliases<'a> {
    pub entity: &'a EntityMapping,
    pub base: String,
    pub revision: Option<String>,
    pub overrides: String,
}

impl EntityAliases<'_> {
    pub fn get(&self, role: TableRole) -> Option<&str> {
        match role {
            TableRole::Base => Some(&self.base),
            TableRole::Revision => self.revision.as_deref(),
            TableRole::Override => Some(&self.overrides),
        }
    }
}

/// Resolved aliases of every entity whose base table is in the query,
/// in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap<'a> {
    entities: Vec<EntityAliases<'a>>,
}

impl<'a> AliasMap<'a> {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityAliases<'a>> {
        self.entities.iter()
    }

    /// Alias of `role` for the entity whose base table is `base_table`.
    pub fn alias(&self, base_table: &str, role: TableRole) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| e.entity.base_table == base_table)
            .and_then(|e| e.get(role))
    }
}

impl<'m, 'a> IntoIterator for &'m AliasMap<'a> {
    type Item = &'m EntityAliases<'a>;
    type IntoIter = std::slice::Iter<'m, EntityAliases<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

/// Match the query's tables against the configured entities.
///
/// When two entries resolve to the same role the later one wins. Entities
/// whose base table is absent are left out, even if their revision table
/// is joined.
pub fn resolve_aliases<'a>(tables: &NodeMap, entities: &'a [EntityMapping]) -> AliasMap<'a> {
    let mut found: Vec<(Option<&str>, Option<&str>)> = vec![(None, None); entities.len()];

    for (alias, entry) in tables {
        let Some(table) = physical_table(entry) else {
            continue;
        };
        for (slot, entity) in found.iter_mut().zip(entities) {
            if table == entity.base_table {
                slot.0 = Some(alias.as_str());
            }
            if entity.revision_table.as_deref() == Some(table) {
                slot.1 = Some(alias.as_str());
            }
        }
    }

    let entities = entities
        .iter()
        .zip(found)
        .filter_map(|(entity, (base, revision))| match base {
            Some(base) => Some(EntityAliases {
                entity,
                base: base.to_string(),
                revision: revision.map(str::to_string),
                overrides: entity.override_alias(),
            }),
            None => {
                if let Some(revision) = revision {
                    log::debug!(
                        "{} joined as {revision} without its base table {}, skipping",
                        entity.revision_table.as_deref().unwrap_or_default(),
                        entity.base_table
                    );
                }
                None
            }
        })
        .collect();

    AliasMap { entities }
}
