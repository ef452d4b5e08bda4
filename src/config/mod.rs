//! Configuration module for overlay.
//!
//! Handles entity mappings, the override data source and the opt-out tag.

mod settings;

pub use settings::{expand_env_vars, OverrideSettings, Settings, SettingsError};
