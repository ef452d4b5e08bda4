//! Reaction registry.
//!
//! Maps reaction identifiers found in configuration to factories. The set
//! is closed: every reaction is known at build time.

use crate::config::Settings;

use super::entity::EntityMappingError;
use super::reaction::{EntityQueryAlter, Reaction};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown reaction: {0}")]
    UnknownReaction(String),

    #[error("Invalid reaction configuration: {0}")]
    InvalidConfig(#[from] EntityMappingError),
}

type ReactionFactory = fn(&Settings) -> Result<Box<dyn Reaction>, RegistryError>;

const REACTIONS: &[(&str, ReactionFactory)] =
    &[(EntityQueryAlter::ID, entity_select_query_alter)];

fn entity_select_query_alter(settings: &Settings) -> Result<Box<dyn Reaction>, RegistryError> {
    let reaction =
        EntityQueryAlter::new(settings.entities.clone())?.with_no_alter_tag(&settings.no_alter_tag);
    Ok(Box::new(reaction))
}

/// Identifiers of every known reaction.
pub fn reaction_ids() -> impl Iterator<Item = &'static str> {
    REACTIONS.iter().map(|(id, _)| *id)
}

/// Build the reaction registered under `id`.
pub fn create_reaction(id: &str, settings: &Settings) -> Result<Box<dyn Reaction>, RegistryError> {
    let (_, factory) = REACTIONS
        .iter()
        .find(|(known, _)| *known == id)
        .ok_or_else(|| RegistryError::UnknownReaction(id.to_string()))?;
    factory(settings)
}
