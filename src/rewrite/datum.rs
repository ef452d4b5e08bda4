//! Datum rewriting - the leaf-level reference substitution.
//!
//! For every active entity up to three passes run, in this order:
//!
//! 1. revision id: `base.vid` becomes
//!    `COALESCE(overrides.override_revision_id, base.vid)`
//! 2. table switch: `base.F` becomes `revision.F` for revision-tracked `F`
//! 3. coalesce: `src.F` becomes `COALESCE(overrides.override_F, src.F)` for
//!    revision-tracked `F` that have an override column, where `src` is the
//!    revision alias when one is joined and the base alias otherwise
//!
//! The switch runs before the coalesce so the fallback branch already reads
//! from the right table. All patterns are word-bounded: `n.vid` never
//! matches inside `n.vid_old` or `xn.vid`.

use regex::{Captures, Regex, Replacer};
use std::borrow::Cow;

use crate::provider::{PropertyMap, REVISION_ID_PROPERTY};

use super::alias::{AliasMap, EntityAliases};

/// `\b{alias}\.({col1}|{col2}|...)\b`
fn column_pattern<'c>(
    alias: &str,
    columns: impl IntoIterator<Item = &'c str>,
) -> Result<Regex, regex::Error> {
    let columns: Vec<String> = columns.into_iter().map(regex::escape).collect();
    Regex::new(&format!(
        r"\b{}\.({})\b",
        regex::escape(alias),
        columns.join("|")
    ))
}

/// Run `pattern` over `current`, keeping the borrow when nothing matched.
fn replace_in_place<R: Replacer>(current: &mut Cow<'_, str>, pattern: &Regex, replacement: R) {
    let replaced = match pattern.replace_all(current.as_ref(), replacement) {
        Cow::Owned(s) => Some(s),
        Cow::Borrowed(_) => None,
    };
    if let Some(s) = replaced {
        *current = Cow::Owned(s);
    }
}

#[derive(Debug)]
struct CoalesceRule {
    pattern: Regex,
    source_alias: String,
    override_alias: String,
    /// Revision-tracked column -> override column.
    columns: PropertyMap,
}

#[derive(Debug)]
struct EntityRules {
    base_table: String,
    /// Pattern and the literal COALESCE it is replaced with.
    revision_id: Option<(Regex, String)>,
    /// Pattern and the revision alias.
    table_switch: Option<(Regex, String)>,
    coalesce: Option<CoalesceRule>,
}

impl EntityRules {
    fn compile(aliases: &EntityAliases<'_>, property_map: &PropertyMap) -> Result<Self, regex::Error> {
        let entity = aliases.entity;

        let revision_id = match property_map.get(REVISION_ID_PROPERTY) {
            Some(override_column) => {
                let pattern = column_pattern(&aliases.base, [entity.revision_id.as_str()])?;
                let replacement = format!(
                    "COALESCE({}.{}, {}.{})",
                    aliases.overrides, override_column, aliases.base, entity.revision_id
                );
                Some((pattern, replacement))
            }
            None => None,
        };

        let table_switch = match &aliases.revision {
            Some(revision) if !entity.revision_fields.is_empty() => Some((
                column_pattern(&aliases.base, entity.revision_fields.iter().map(String::as_str))?,
                revision.clone(),
            )),
            _ => None,
        };

        let columns: PropertyMap = property_map
            .iter()
            .filter(|(column, _)| entity.is_revision_field(column))
            .map(|(column, override_column)| (column.clone(), override_column.clone()))
            .collect();
        let coalesce = if columns.is_empty() {
            None
        } else {
            let source_alias = aliases.revision.as_deref().unwrap_or(&aliases.base);
            Some(CoalesceRule {
                pattern: column_pattern(source_alias, columns.keys().map(String::as_str))?,
                source_alias: source_alias.to_string(),
                override_alias: aliases.overrides.clone(),
                columns,
            })
        };

        Ok(Self {
            base_table: entity.base_table.clone(),
            revision_id,
            table_switch,
            coalesce,
        })
    }

    fn is_empty(&self) -> bool {
        self.revision_id.is_none() && self.table_switch.is_none() && self.coalesce.is_none()
    }

    fn apply(&self, current: &mut Cow<'_, str>) {
        if let Some((pattern, replacement)) = &self.revision_id {
            replace_in_place(current, pattern, regex::NoExpand(replacement));
        }

        if let Some((pattern, revision)) = &self.table_switch {
            replace_in_place(current, pattern, |caps: &Captures| {
                format!("{}.{}", revision, &caps[1])
            });
        }

        if let Some(rule) = &self.coalesce {
            replace_in_place(current, &rule.pattern, |caps: &Captures| {
                let column = &caps[1];
                match rule.columns.get(column) {
                    Some(override_column) => format!(
                        "COALESCE({}.{}, {}.{})",
                        rule.override_alias, override_column, rule.source_alias, column
                    ),
                    None => caps[0].to_string(),
                }
            });
        }
    }
}

/// Compiled substitution rules for one rewrite pass.
///
/// Built once per query from the resolved aliases and the provider's
/// property map, then applied to every leaf.
#[derive(Debug, Default)]
pub struct DatumRewriter {
    entities: Vec<EntityRules>,
}

impl DatumRewriter {
    /// Compile the rules of every resolved entity.
    ///
    /// An entity whose patterns fail to compile is logged and skipped.
    pub fn new(aliases: &AliasMap<'_>, property_map: &PropertyMap) -> Self {
        let mut entities = Vec::with_capacity(aliases.len());
        for entity in aliases {
            match EntityRules::compile(entity, property_map) {
                Ok(rules) if rules.is_empty() => {
                    log::debug!("no datum rules for {}", rules.base_table);
                }
                Ok(rules) => entities.push(rules),
                Err(e) => log::warn!(
                    "skipping {}: cannot compile reference pattern: {e}",
                    entity.entity.base_table
                ),
            }
        }
        Self { entities }
    }

    /// True when no leaf can change.
    pub fn is_noop(&self) -> bool {
        self.entities.is_empty()
    }

    /// Rewrite one datum. Returns the input unchanged (borrowed) when no
    /// reference matched.
    pub fn rewrite<'d>(&self, datum: &'d str) -> Cow<'d, str> {
        let mut current = Cow::Borrowed(datum);
        for rules in &self.entities {
            rules.apply(&mut current);
        }
        if let Cow::Owned(rewritten) = &current {
            log::trace!("rewrote `{datum}` to `{rewritten}`");
        }
        current
    }

    /// Rewrite a datum in place. Returns whether it changed.
    pub fn rewrite_in_place(&self, datum: &mut String) -> bool {
        let rewritten = match self.rewrite(datum) {
            Cow::Owned(s) => Some(s),
            Cow::Borrowed(_) => None,
        };
        match rewritten {
            Some(s) => {
                *datum = s;
                true
            }
            None => false,
        }
    }
}
