//! TOML-based configuration for overlay.
//!
//! Supports a config file (overlay.toml) with environment variable expansion
//! in override table names.
//!
//! Example configuration:
//! ```toml
//! no_alter_tag = "overlay_no_alter"
//!
//! [[entities]]
//! base_table = "node"
//! revision_table = "node_revision"
//! revision_fields = ["uid", "status", "promote", "sticky", "title"]
//! base_id = "nid"
//! revision_id = "vid"
//!
//! [overrides]
//! property_map = { revision_id = "override_revision_id", status = "override_status" }
//!
//! [overrides.tables]
//! node = "${OVERLAY_PREFIX}node_override_data"
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::provider::{PropertyMap, TableOverrideProvider};
use crate::rewrite::entity::{validate_mappings, EntityMapping, EntityMappingError};
use crate::rewrite::reaction::{EntityQueryAlter, DEFAULT_NO_ALTER_TAG};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] EntityMappingError),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Queries carrying this tag are never rewritten.
    pub no_alter_tag: String,

    /// Entities whose queries read override data.
    pub entities: Vec<EntityMapping>,

    /// Override data source.
    pub overrides: OverrideSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            no_alter_tag: DEFAULT_NO_ALTER_TAG.to_string(),
            entities: Vec::new(),
            overrides: OverrideSettings::default(),
        }
    }
}

/// Override data source configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OverrideSettings {
    /// Column -> override column. `revision_id` stands for each entity's
    /// revision id column.
    pub property_map: PropertyMap,

    /// Entity kind (base table) -> override table. Supports `${ENV_VAR}`
    /// expansion. Kinds not listed read from `{kind}_override`.
    pub tables: IndexMap<String, String>,
}

impl OverrideSettings {
    /// Build a table-backed provider with table names expanded.
    pub fn provider(&self) -> Result<TableOverrideProvider, SettingsError> {
        let mut provider = TableOverrideProvider::new(self.property_map.clone());
        for (kind, table) in &self.tables {
            provider = provider.with_table(kind, &expand_env_vars(table)?);
        }
        Ok(provider)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `OVERLAY_CONFIG`
    /// 2. `./overlay.toml`
    /// 3. `~/.config/overlay/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("OVERLAY_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("overlay.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("overlay").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        // Return defaults if no config file found
        Ok(Settings::default())
    }

    /// Check every entity mapping and reject duplicate base tables.
    pub fn validate(&self) -> Result<(), SettingsError> {
        validate_mappings(&self.entities)?;
        Ok(())
    }

    /// Build the query-alter reaction described by these settings.
    pub fn reaction(&self) -> Result<EntityQueryAlter, SettingsError> {
        Ok(EntityQueryAlter::new(self.entities.clone())?.with_no_alter_tag(&self.no_alter_tag))
    }

    /// Look up the mapping for a base table.
    pub fn entity(&self, base_table: &str) -> Option<&EntityMapping> {
        self.entities.iter().find(|e| e.base_table == base_table)
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            chars.by_ref().take_while(|ch| *ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
