use std::collections::HashSet;

use overlay::prelude::*;
use overlay::provider::REVISION_ID_PROPERTY;
use overlay::sql::FieldEscaping;

fn node_entity() -> EntityMapping {
    EntityMapping::new("node", "nid", "vid")
        .with_revision_table("node_revision")
        .with_revision_fields(&["status", "title", "uid"])
}

fn reaction() -> EntityQueryAlter {
    EntityQueryAlter::new(vec![node_entity()]).unwrap()
}

fn node_query() -> SelectQuery {
    let mut query = SelectQuery::new("node", "n");
    query.inner_join("node_revision", "nr", "n.vid = nr.vid");
    query
}

fn status_provider() -> TableOverrideProvider {
    TableOverrideProvider::with_properties(&[("status", "override_status")])
}

#[test]
fn test_no_entity_tables_leaves_query_identical() {
    let mut query = SelectQuery::new("users", "u");
    query.add_field("u", "name", None);
    query.add_expression("COUNT(u.uid)", Some("total"));
    query
        .condition("u.status", 1, Operator::Eq)
        .group_by("u.name")
        .having_condition("u.status", 0, Operator::Gt)
        .order_by("u.name", SortDir::Asc);
    let before = query.clone();

    let outcome = reaction().react(&mut query, &status_provider());

    assert_eq!(outcome, ReactionOutcome::NoEntities);
    assert_eq!(query, before);
    assert_eq!(query.to_sql(Dialect::Postgres), before.to_sql(Dialect::Postgres));
}

#[test]
fn test_revision_table_alone_is_not_an_entity() {
    let mut query = SelectQuery::new("node_revision", "nr");
    query.condition("nr.status", 1, Operator::Eq);
    let before = query.clone();

    let outcome = reaction().react(&mut query, &status_provider());

    assert_eq!(outcome, ReactionOutcome::NoEntities);
    assert_eq!(query, before);
}

#[test]
fn test_no_duplicate_output_aliases() {
    let mut query = node_query();
    query.add_field("n", "nid", None);
    query.add_field("n", "status", None);
    query.add_field("n", "title", None);
    query.add_expression("1", Some("status"));

    reaction().react(&mut query, &status_provider());

    let keys: Vec<&String> = query.fields.keys().chain(query.expressions.keys()).collect();
    let unique: HashSet<&String> = keys.iter().copied().collect();
    assert_eq!(keys.len(), unique.len());
    assert_eq!(
        query.expression("status_2"),
        Some("COALESCE(node_overrides.override_status, nr.status)")
    );
}

#[test]
fn test_revision_redirection() {
    let mut query = node_query();
    query.condition("n.status", 1, Operator::Eq);

    reaction().react(&mut query, &TableOverrideProvider::default());

    assert_eq!(query.filter.to_sql(Dialect::Postgres), "nr.status = 1");
}

#[test]
fn test_coalesce_composition() {
    let mut query = node_query();
    query.condition("n.status", 1, Operator::Eq);

    reaction().react(&mut query, &status_provider());

    assert_eq!(
        query.filter.to_sql(Dialect::Postgres),
        "COALESCE(node_overrides.override_status, nr.status) = 1"
    );
}

#[test]
fn test_revision_id_coalesce_without_revision_table() {
    let reaction = EntityQueryAlter::new(vec![EntityMapping::new("n", "nid", "vid")]).unwrap();
    let provider =
        TableOverrideProvider::with_properties(&[(REVISION_ID_PROPERTY, "override_revision_id")]);
    let mut query = SelectQuery::new("n", "n");
    query.add_expression("n.vid", Some("current_vid"));
    query.order_by("n.vid", SortDir::Desc);

    reaction.react(&mut query, &provider);

    let coalesced = "COALESCE(n_overrides.override_revision_id, n.vid)";
    assert_eq!(query.expression("current_vid"), Some(coalesced));
    let order: Vec<&String> = query.order.keys().collect();
    assert_eq!(order, [coalesced]);
    assert_eq!(query.table_name("n_overrides"), Some("n_override"));
}

#[test]
fn test_field_moved_to_expression_keeps_output_alias() {
    let mut query = node_query();
    query.add_field("n", "status", Some("node_status"));

    reaction().react(&mut query, &status_provider());

    assert!(!query.fields.contains_key("node_status"));
    assert_eq!(
        query.expression("node_status"),
        Some("COALESCE(node_overrides.override_status, nr.status)")
    );
    assert!(query.to_sql(Dialect::Postgres).starts_with(
        r#"SELECT COALESCE(node_overrides.override_status, nr.status) AS "node_status" FROM"#
    ));
}

#[test]
fn test_condition_transplant_sanitizes_then_keeps_coalesce() {
    let mut query = node_query();
    query.condition("n.status);", 1, Operator::Eq);

    reaction().react(&mut query, &status_provider());

    assert_eq!(query.filter.escaping(), FieldEscaping::Raw);
    assert!(query
        .to_sql(Dialect::Postgres)
        .ends_with("WHERE COALESCE(node_overrides.override_status, nr.status) = 1"));
}

/// `escape_field` drops `()`, `;` and spaces but keeps letters, so trailing text merges into the column name.
#[test]
fn test_condition_transplant_strips_injection_before_matching() {
    let mut query = node_query();
    query.condition("n.status); DROP", 1, Operator::Eq);

    reaction().react(&mut query, &status_provider());

    // The stripped reference no longer names the column, so nothing is coalesced.
    assert_eq!(query.filter.to_sql(Dialect::Postgres), "n.statusDROP = 1");
}

#[test]
fn test_escaped_condition_would_destroy_coalesce() {
    let mut condition = Condition::and();
    condition.condition(
        "COALESCE(node_overrides.override_status, nr.status)",
        1,
        Operator::Eq,
    );

    assert_eq!(
        condition.to_sql(Dialect::Postgres),
        "COALESCEnode_overrides.override_statusnr.status = 1"
    );
}

#[test]
fn test_opt_out_tag_prevents_all_mutation() {
    let mut query = node_query();
    query.add_field("n", "status", Some("node_status"));
    query.condition("n.status", 1, Operator::Eq);
    query.add_tag(DEFAULT_NO_ALTER_TAG);
    let before = query.clone();

    let outcome = reaction().react(&mut query, &status_provider());

    assert_eq!(outcome, ReactionOutcome::OptedOut);
    assert_eq!(query, before);
}
