//! Field relocation.
//!
//! Projected fields are compiled as plain escaped `table.field` references,
//! so a COALESCE can never be attached to them. Fields that have an
//! override column are moved into the expression section under the same
//! output alias. Revision-tracked fields that stay plain are pointed at the
//! revision alias instead.

use crate::provider::{PropertyMap, REVISION_ID_PROPERTY};
use crate::sql::dialect::helpers::{escape_field, escape_table};
use crate::sql::query::SelectQuery;

use super::alias::AliasMap;

/// What [`relocate_fields`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relocation {
    /// Output aliases moved to the expression section.
    pub moved: Vec<String>,
    /// Output aliases whose table now points at a revision alias.
    pub switched: Vec<String>,
}

/// Move override-mapped fields to expressions and switch revision-tracked
/// fields to the revision alias.
pub fn relocate_fields(
    query: &mut SelectQuery,
    aliases: &AliasMap<'_>,
    property_map: &PropertyMap,
) -> Relocation {
    let mut relocation = Relocation::default();

    for resolved in aliases {
        let entity = resolved.entity;
        let to_move: Vec<&str> = property_map
            .keys()
            .map(|column| match column.as_str() {
                REVISION_ID_PROPERTY => entity.revision_id.as_str(),
                other => other,
            })
            .collect();

        let matching: Vec<String> = query
            .fields
            .iter()
            .filter(|(_, f)| f.table == resolved.base && to_move.contains(&f.field.as_str()))
            .map(|(alias, _)| alias.clone())
            .collect();

        for output_alias in matching {
            let Some(field) = query.fields.shift_remove(&output_alias) else {
                continue;
            };
            let expression = format!(
                "{}.{}",
                escape_table(&field.table),
                escape_field(&field.field)
            );
            let registered = query.add_expression(&expression, Some(&output_alias));
            if registered != output_alias {
                log::warn!(
                    "expression alias {output_alias} already taken, field moved to {registered}"
                );
            }
            relocation.moved.push(registered);
        }
    }

    for resolved in aliases {
        let Some(revision) = &resolved.revision else {
            continue;
        };
        for (output_alias, field) in query.fields.iter_mut() {
            if field.table == resolved.base && resolved.entity.is_revision_field(&field.field) {
                field.table = revision.clone();
                relocation.switched.push(output_alias.clone());
            }
        }
    }

    relocation
}
