//! Entity mappings - which base/revision table pairs take part in rewriting.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Configuration errors for entity mappings.
///
/// These are raised when settings are loaded or a reaction is built, never
/// while a query is being rewritten.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityMappingError {
    #[error("Entity mapping has no base table")]
    MissingBaseTable,

    #[error("Entity mapping for '{0}' has no base id column")]
    MissingBaseId(String),

    #[error("Entity mapping for '{0}' has no revision id column")]
    MissingRevisionId(String),

    #[error("Base table '{0}' is mapped more than once")]
    DuplicateBaseTable(String),
}

/// A base table, its optional revision table, and the revision-tracked
/// columns present on both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub base_table: String,

    #[serde(default)]
    pub revision_table: Option<String>,

    /// Columns that live on both tables and are read from the revision
    /// table when one is joined.
    #[serde(default)]
    pub revision_fields: IndexSet<String>,

    pub base_id: String,

    /// The column on the base table that points at the current revision.
    pub revision_id: String,
}

impl EntityMapping {
    pub fn new(base_table: &str, base_id: &str, revision_id: &str) -> Self {
        Self {
            base_table: base_table.into(),
            revision_table: None,
            revision_fields: IndexSet::new(),
            base_id: base_id.into(),
            revision_id: revision_id.into(),
        }
    }

    pub fn with_revision_table(mut self, table: &str) -> Self {
        self.revision_table = Some(table.into());
        self
    }

    pub fn with_revision_fields(mut self, fields: &[&str]) -> Self {
        self.revision_fields
            .extend(fields.iter().map(|f| f.to_string()));
        self
    }

    /// Alias under which the override table is joined.
    pub fn override_alias(&self) -> String {
        format!("{}_overrides", self.base_table)
    }

    pub fn is_revision_field(&self, column: &str) -> bool {
        self.revision_fields.contains(column)
    }

    pub fn validate(&self) -> Result<(), EntityMappingError> {
        if self.base_table.trim().is_empty() {
            return Err(EntityMappingError::MissingBaseTable);
        }
        if self.base_id.trim().is_empty() {
            return Err(EntityMappingError::MissingBaseId(self.base_table.clone()));
        }
        if self.revision_id.trim().is_empty() {
            return Err(EntityMappingError::MissingRevisionId(
                self.base_table.clone(),
            ));
        }
        Ok(())
    }
}

/// Validate every mapping and reject duplicate base tables.
pub fn validate_mappings(entities: &[EntityMapping]) -> Result<(), EntityMappingError> {
    let mut seen = IndexSet::new();
    for entity in entities {
        entity.validate()?;
        if !seen.insert(entity.base_table.as_str()) {
            return Err(EntityMappingError::DuplicateBaseTable(
                entity.base_table.clone(),
            ));
        }
    }
    Ok(())
}
