use std::cell::RefCell;

use overlay::prelude::*;
use overlay::provider::REVISION_ID_PROPERTY;

fn node_entity() -> EntityMapping {
    EntityMapping::new("node", "nid", "vid")
        .with_revision_table("node_revision")
        .with_revision_fields(&["status"])
}

/// Records every join request and joins a fixed scheduling table.
#[derive(Debug, Default)]
struct RecordingProvider {
    property_map: PropertyMap,
    calls: RefCell<Vec<(String, String, String, String)>>,
}

impl OverrideProvider for RecordingProvider {
    fn property_map(&self) -> &PropertyMap {
        &self.property_map
    }

    fn add_override_join(
        &self,
        query: &mut SelectQuery,
        base_alias: &str,
        base_id: &str,
        override_alias: &str,
        entity_kind: &str,
    ) -> String {
        self.calls.borrow_mut().push((
            base_alias.into(),
            base_id.into(),
            override_alias.into(),
            entity_kind.into(),
        ));
        query.add_join_on(
            JoinType::Left,
            "scheduled_revision",
            override_alias,
            base_alias,
            base_id,
            base_id,
        )
    }
}

#[test]
fn test_provider_receives_resolved_aliases() {
    let reaction = EntityQueryAlter::new(vec![node_entity()]).unwrap();
    let provider = RecordingProvider::default();
    let mut query = SelectQuery::new("node", "content");

    reaction.react(&mut query, &provider);

    let calls = provider.calls.borrow();
    assert_eq!(
        calls.as_slice(),
        [(
            "content".to_string(),
            "nid".to_string(),
            "node_overrides".to_string(),
            "node".to_string()
        )]
    );
    assert_eq!(query.table_name("node_overrides"), Some("scheduled_revision"));
}

#[test]
fn test_provider_not_called_without_entities() {
    let reaction = EntityQueryAlter::new(vec![node_entity()]).unwrap();
    let provider = RecordingProvider::default();
    let mut query = SelectQuery::new("users", "u");

    reaction.react(&mut query, &provider);

    assert!(provider.calls.borrow().is_empty());
}

#[test]
fn test_empty_property_map_only_redirects_revisions() {
    let reaction = EntityQueryAlter::new(vec![node_entity()]).unwrap();
    let mut query = SelectQuery::new("node", "n");
    query.inner_join("node_revision", "nr", "n.vid = nr.vid");
    query.add_field("n", "status", None);
    query.condition("n.status", 1, Operator::Eq);

    reaction.react(&mut query, &TableOverrideProvider::default());

    assert!(query.expressions.is_empty());
    assert_eq!(query.fields["status"].table, "nr");
    assert_eq!(query.filter.to_sql(Dialect::Postgres), "nr.status = 1");
    assert_eq!(
        query.join_condition("nr").and_then(Node::as_text),
        Some("n.vid = nr.vid")
    );
}

#[test]
fn test_subquery_override_source() {
    let mut latest = SelectQuery::new("node_override_data", "d");
    latest.add_fields("d", &["nid", "override_revision_id"]);
    latest.condition("d.published_at", 1_700_000_000i64, Operator::Lte);

    let provider =
        TableOverrideProvider::with_properties(&[(REVISION_ID_PROPERTY, "override_revision_id")])
            .with_subquery("node", latest);
    let reaction = EntityQueryAlter::new(vec![node_entity()]).unwrap();
    let mut query = SelectQuery::new("node", "n");
    query.inner_join("node_revision", "nr", "n.vid = nr.vid");
    query.add_field("nr", "title", None);

    reaction.react(&mut query, &provider);

    assert_eq!(
        query.to_sql(Dialect::Postgres),
        r#"SELECT nr.title AS "title" FROM "node" n LEFT OUTER JOIN (SELECT d.nid AS "nid", d.override_revision_id AS "override_revision_id" FROM "node_override_data" d WHERE d.published_at <= 1700000000) node_overrides ON n.nid = node_overrides.nid INNER JOIN "node_revision" nr ON COALESCE(node_overrides.override_revision_id, n.vid) = nr.vid"#
    );
}

#[test]
fn test_taken_override_alias_is_uniquified_by_query() {
    let reaction = EntityQueryAlter::new(vec![node_entity()]).unwrap();
    let provider = TableOverrideProvider::default();
    let mut query = SelectQuery::new("node", "n");
    query.left_join("node_override", "node_overrides", "n.nid = node_overrides.nid");

    reaction.react(&mut query, &provider);

    assert_eq!(query.tables.len(), 3);
    assert_eq!(
        query.join_condition("node_overrides_2").and_then(Node::as_text),
        Some("n.nid = node_overrides_2.nid")
    );
}
