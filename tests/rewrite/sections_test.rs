use insta::assert_snapshot;
use sqlparser::dialect::{MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use overlay::prelude::*;
use overlay::provider::REVISION_ID_PROPERTY;
use overlay::sql::{Arguments, FieldEscaping};

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

fn full_provider() -> TableOverrideProvider {
    TableOverrideProvider::with_properties(&[
        (REVISION_ID_PROPERTY, "override_revision_id"),
        ("status", "override_status"),
    ])
}

#[test]
fn test_expressions_rewritten() {
    let mut query = node_query();
    query.add_expression("COUNT(DISTINCT n.title)", Some("titles"));
    query.add_expression("MAX(n.changed)", Some("latest"));

    reaction().react(&mut query, &TableOverrideProvider::default());

    assert_eq!(query.expression("titles"), Some("COUNT(DISTINCT nr.title)"));
    assert_eq!(query.expression("latest"), Some("MAX(n.changed)"));
}

#[test]
fn test_join_conditions_rewritten() {
    let mut query = node_query();
    let mut on = Condition::and();
    on.where_snippet("u.uid = n.uid", Arguments::new())
        .condition("n.status", 1, Operator::Eq);
    query.add_join(JoinType::Left, "users", "u", Some(Node::Condition(on)));

    reaction().react(&mut query, &full_provider());

    assert_eq!(
        query.join_condition("nr").and_then(Node::as_text),
        Some("COALESCE(node_overrides.override_revision_id, n.vid) = nr.vid")
    );
    let on = query
        .join_condition("u")
        .and_then(Node::as_condition)
        .unwrap();
    assert_eq!(on.escaping(), FieldEscaping::Raw);
    assert_eq!(
        on.to_sql(Dialect::Postgres),
        "u.uid = nr.uid AND COALESCE(node_overrides.override_status, nr.status) = 1"
    );
    assert_eq!(
        query.join_condition("node_overrides").and_then(Node::as_text),
        Some("n.nid = node_overrides.nid")
    );
}

#[test]
fn test_override_join_follows_base_table() {
    let mut query = node_query();
    query.inner_join("users", "u", "n.uid = u.uid");

    reaction().react(&mut query, &full_provider());

    let order: Vec<&String> = query.tables.keys().collect();
    assert_eq!(order, ["n", "node_overrides", "nr", "u"]);
}

#[test]
fn test_order_keys_renamed_in_place() {
    let mut query = node_query();
    query
        .order_by("n.nid", SortDir::Asc)
        .order_by("n.title", SortDir::Desc)
        .order_by("n.created", SortDir::Asc);

    reaction().react(&mut query, &TableOverrideProvider::default());

    let keys: Vec<&String> = query.order.keys().collect();
    assert_eq!(keys, ["n.nid", "nr.title", "n.created"]);
    assert_eq!(query.order["nr.title"].as_text(), Some("DESC"));
}

#[test]
fn test_group_key_and_value_rewritten() {
    let mut query = node_query();
    query.group_by("n.status");

    reaction().react(&mut query, &full_provider());

    let coalesced = "COALESCE(node_overrides.override_status, nr.status)";
    let (key, value) = query.group.get_index(0).unwrap();
    assert_eq!(key, coalesced);
    assert_eq!(value.as_text(), Some(coalesced));
    assert!(query
        .to_sql(Dialect::Postgres)
        .ends_with(&format!("GROUP BY {coalesced}")));
}

#[test]
fn test_having_transplanted_and_rewritten() {
    let mut query = node_query();
    query.add_expression("COUNT(n.nid)", Some("total"));
    query.group_by("n.type");
    let mut arguments = Arguments::new();
    arguments.insert(":min".into(), Literal::from(2));
    query
        .having_condition("n.status", 0, Operator::Gt)
        .having
        .where_snippet("COUNT(n.nid) >= :min", arguments);

    reaction().react(&mut query, &full_provider());

    assert_eq!(query.having.escaping(), FieldEscaping::Raw);
    assert_eq!(
        query.having.to_sql(Dialect::Postgres),
        "COALESCE(node_overrides.override_status, nr.status) > 0 AND COUNT(n.nid) >= 2"
    );
}

#[test]
fn test_filter_values_are_data() {
    let mut query = node_query();
    query
        .condition("n.title", "n.status", Operator::Eq)
        .condition("n.uid", vec![1i64, 2, 3], Operator::In);

    reaction().react(&mut query, &full_provider());

    assert_eq!(
        query.filter.to_sql(Dialect::Postgres),
        "nr.title = 'n.status' AND nr.uid IN (1, 2, 3)"
    );
}

#[test]
fn test_nested_filter_rewritten() {
    let mut query = node_query();
    let mut either = Condition::or();
    either
        .condition("n.status", 1, Operator::Eq)
        .condition("n.uid", 7, Operator::Eq);
    query.condition("n.type", "page", Operator::Eq);
    query.filter.nest(either);

    reaction().react(&mut query, &full_provider());

    assert_eq!(
        query.filter.to_sql(Dialect::Postgres),
        "n.type = 'page' AND (COALESCE(node_overrides.override_status, nr.status) = 1 OR nr.uid = 7)"
    );
}

#[test]
fn test_subqueries_untouched() {
    let mut inner = SelectQuery::new("node", "n");
    inner.add_field("n", "nid", None);
    inner.condition("n.status", 1, Operator::Eq);
    let inner_sql = inner.to_sql(Dialect::Postgres);

    let mut query = node_query();
    query.condition("n.nid", inner.clone(), Operator::In);
    query.add_join(JoinType::Inner, inner, "published", Some(Node::text("published.nid = n.nid")));

    reaction().react(&mut query, &full_provider());

    let sql = query.to_sql(Dialect::Postgres);
    assert!(sql.contains(&format!("INNER JOIN ({inner_sql}) published ON published.nid = n.nid")));
    assert!(sql.contains(&format!("n.nid IN ({inner_sql})")));
}

#[test]
fn test_multiple_entities() {
    let reaction = EntityQueryAlter::new(vec![
        node_entity(),
        EntityMapping::new("users", "uid", "uid").with_revision_fields(&["status"]),
    ])
    .unwrap();
    let mut query = node_query();
    query.inner_join("users", "u", "n.uid = u.uid");
    query
        .condition("n.status", 1, Operator::Eq)
        .condition("u.status", 1, Operator::Eq);

    let outcome = reaction.react(&mut query, &full_provider());

    assert_eq!(
        outcome,
        ReactionOutcome::Rewritten {
            entities: vec!["node".into(), "users".into()]
        }
    );
    assert_eq!(query.table_name("users_overrides"), Some("users_override"));
    assert_eq!(
        query.filter.to_sql(Dialect::Postgres),
        "COALESCE(node_overrides.override_status, nr.status) = 1 AND COALESCE(users_overrides.override_status, u.status) = 1"
    );
}

fn listing_query() -> SelectQuery {
    let mut query = node_query();
    query.inner_join("users", "u", "n.uid = u.uid");
    query.add_fields("n", &["nid", "title", "status"]);
    query.add_field("u", "name", Some("author"));
    query
        .condition("n.status", 1, Operator::Eq)
        .condition("n.type", "article", Operator::Eq)
        .order_by("n.sticky", SortDir::Desc)
        .order_by("n.created", SortDir::Desc)
        .range(0, 10);
    query
}

#[test]
fn test_listing_query_rewrite() {
    let mut query = listing_query();

    reaction().react(&mut query, &full_provider());

    let sql = query.to_sql(Dialect::Postgres);
    assert_snapshot!(sql, @r#"SELECT n.nid AS "nid", nr.title AS "title", u.name AS "author", COALESCE(node_overrides.override_status, nr.status) AS "status" FROM "node" n LEFT OUTER JOIN "node_override" node_overrides ON n.nid = node_overrides.nid INNER JOIN "node_revision" nr ON COALESCE(node_overrides.override_revision_id, n.vid) = nr.vid INNER JOIN "users" u ON nr.uid = u.uid WHERE COALESCE(node_overrides.override_status, nr.status) = 1 AND n.type = 'article' ORDER BY n.sticky DESC, n.created DESC LIMIT 10 OFFSET 0"#);
}

#[test]
fn test_rewritten_sql_parses() {
    let mut query = listing_query();
    query.group_by("n.status");
    query.having_condition("n.status", 0, Operator::Gt);

    reaction().react(&mut query, &full_provider());

    let postgres = query.to_sql(Dialect::Postgres);
    Parser::parse_sql(&PostgreSqlDialect {}, &postgres).unwrap();
    let mysql = query.to_sql(Dialect::MySql);
    Parser::parse_sql(&MySqlDialect {}, &mysql).unwrap();
}
