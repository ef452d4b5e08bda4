use std::fs;
use std::path::PathBuf;

use overlay::config::{Settings, SettingsError};
use overlay::prelude::*;
use overlay::rewrite::{create_reaction, EntityMappingError};

const CONFIG: &str = r#"
no_alter_tag = "preview_skip"

[[entities]]
base_table = "node"
revision_table = "node_revision"
revision_fields = ["uid", "status", "promote", "sticky", "title"]
base_id = "nid"
revision_id = "vid"

[overrides]
property_map = { revision_id = "override_revision_id", status = "override_status" }

[overrides.tables]
node = "${OVERLAY_SETTINGS_TEST_PREFIX}node_override_data"
"#;

fn write_config(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("overlay_{}_{}.toml", name, std::process::id()));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_settings_drive_a_full_rewrite() {
    std::env::set_var("OVERLAY_SETTINGS_TEST_PREFIX", "preview_");
    let path = write_config("full", CONFIG);

    let settings = Settings::from_file(&path).unwrap();
    let reaction = settings.reaction().unwrap();
    let provider = settings.overrides.provider().unwrap();

    let mut query = SelectQuery::new("node", "n");
    query.inner_join("node_revision", "nr", "n.vid = nr.vid");
    query.add_field("n", "sticky", None);
    query.condition("n.status", 1, Operator::Eq);
    reaction.react(&mut query, &provider);

    assert_eq!(
        query.to_sql(Dialect::Postgres),
        r#"SELECT nr.sticky AS "sticky" FROM "node" n LEFT OUTER JOIN "preview_node_override_data" node_overrides ON n.nid = node_overrides.nid INNER JOIN "node_revision" nr ON COALESCE(node_overrides.override_revision_id, n.vid) = nr.vid WHERE COALESCE(node_overrides.override_status, nr.status) = 1"#
    );

    fs::remove_file(path).ok();
}

#[test]
fn test_configured_opt_out_tag() {
    let settings = Settings::from_toml_str(CONFIG).unwrap();
    let reaction = create_reaction("entity_select_query_alter", &settings).unwrap();

    let mut query = SelectQuery::new("node", "n");
    query.add_tag("preview_skip");
    let outcome = reaction.react(&mut query, &TableOverrideProvider::default());

    assert_eq!(outcome, ReactionOutcome::OptedOut);
}

#[test]
fn test_missing_file() {
    let result = Settings::from_file("/nonexistent/overlay.toml");
    assert!(matches!(result, Err(SettingsError::FileNotFound(_))));
}

#[test]
fn test_invalid_entity_rejected_at_load() {
    let path = write_config(
        "invalid",
        r#"
[[entities]]
base_table = "node"
base_id = ""
revision_id = "vid"
"#,
    );

    let result = Settings::from_file(&path);
    assert!(matches!(
        result,
        Err(SettingsError::InvalidConfig(EntityMappingError::MissingBaseId(table))) if table == "node"
    ));

    fs::remove_file(path).ok();
}

#[test]
fn test_load_from_env_var() {
    let path = write_config(
        "env",
        r#"
[[entities]]
base_table = "taxonomy_term_data"
base_id = "tid"
revision_id = "tid"
"#,
    );
    std::env::set_var("OVERLAY_CONFIG", &path);

    let settings = Settings::load().unwrap();

    std::env::remove_var("OVERLAY_CONFIG");
    assert_eq!(settings.no_alter_tag, DEFAULT_NO_ALTER_TAG);
    assert!(settings.entity("taxonomy_term_data").is_some());

    fs::remove_file(path).ok();
}

#[test]
fn test_missing_table_env_var() {
    let settings = Settings::from_toml_str(
        r#"
[overrides.tables]
node = "${OVERLAY_SETTINGS_TEST_UNSET_12345}node_override"
"#,
    )
    .unwrap();

    assert!(matches!(
        settings.overrides.provider(),
        Err(SettingsError::MissingEnvVar(name)) if name == "OVERLAY_SETTINGS_TEST_UNSET_12345"
    ));
}
