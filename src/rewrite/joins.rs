//! Override-join installation.

use crate::provider::OverrideProvider;
use crate::sql::query::SelectQuery;

use super::alias::AliasMap;

/// Ask the provider to join each resolved entity's override rows.
///
/// Returns the registered aliases in entity order. Duplicate joins are left
/// to the query's alias de-duplication; when the synthesized alias is taken
/// the rewritten references still name the synthesized one, so that case is
/// logged.
pub fn install_override_joins(
    query: &mut SelectQuery,
    aliases: &AliasMap<'_>,
    provider: &dyn OverrideProvider,
) -> Vec<String> {
    aliases
        .iter()
        .map(|resolved| {
            let entity = resolved.entity;
            let registered = provider.add_override_join(
                query,
                &resolved.base,
                &entity.base_id,
                &resolved.overrides,
                &entity.base_table,
            );
            if registered != resolved.overrides {
                log::warn!(
                    "override alias {} already in use, join registered as {registered}",
                    resolved.overrides
                );
            }
            registered
        })
        .collect()
}
