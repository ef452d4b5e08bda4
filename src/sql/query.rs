//! Select query - the mutable tree a query-alter pass works on.
//!
//! A [`SelectQuery`] keeps every clause in its own independently
//! addressable section:
//!
//! | Section       | Shape                                                   |
//! |---------------|---------------------------------------------------------|
//! | `tables`      | alias -> map `{table, alias, join_type, condition}`     |
//! | `fields`      | output alias -> [`Field`]                               |
//! | `expressions` | output alias -> map `{expression, alias}`               |
//! | `filter`      | [`Condition`] (WHERE)                                   |
//! | `order`       | expression -> `"ASC"` / `"DESC"`                        |
//! | `group`       | expression -> expression                                |
//! | `having`      | [`Condition`] (HAVING)                                  |
//!
//! Sections are public so a caller can borrow several of them mutably at
//! once. The builder methods keep keys unique the same way the execution
//! engine does: a taken alias gets a `_2`, `_3`, ... suffix.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::condition::{Condition, Operator};
use super::dialect::{Dialect, SqlDialect};
use super::node::{bind_placeholders, map_text, Arguments, Literal, Node, NodeMap};
use super::token::{Token, TokenStream};

/// Keys of a table entry map.
pub mod table_keys {
    pub const TABLE: &str = "table";
    pub const ALIAS: &str = "alias";
    pub const JOIN_TYPE: &str = "join_type";
    pub const CONDITION: &str = "condition";
}

/// Keys of an expression entry map.
pub mod expression_keys {
    pub const EXPRESSION: &str = "expression";
    pub const ALIAS: &str = "alias";
}

// =============================================================================
// Fields
// =============================================================================

/// A projected column: `table.field AS alias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub table: String,
    pub field: String,
    pub alias: String,
}

impl Field {
    fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Raw(format!(
            "{}.{}",
            dialect.escape_table(&self.table),
            dialect.escape_field(&self.field)
        )))
        .space()
        .push(Token::As)
        .space()
        .push(Token::Ident(dialect.escape_alias(&self.alias)));
        ts
    }
}

// =============================================================================
// Tables and Joins
// =============================================================================

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT OUTER",
            JoinType::Right => "RIGHT OUTER",
            JoinType::Cross => "CROSS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INNER" | "INNER JOIN" | "JOIN" => Some(JoinType::Inner),
            "LEFT" | "LEFT OUTER" | "LEFT JOIN" | "LEFT OUTER JOIN" => Some(JoinType::Left),
            "RIGHT" | "RIGHT OUTER" | "RIGHT JOIN" | "RIGHT OUTER JOIN" => Some(JoinType::Right),
            "CROSS" | "CROSS JOIN" => Some(JoinType::Cross),
            _ => None,
        }
    }

    fn to_tokens(self) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            JoinType::Inner => ts.push(Token::Inner),
            JoinType::Left => ts.push(Token::Left).space().push(Token::Outer),
            JoinType::Right => ts.push(Token::Right).space().push(Token::Outer),
            JoinType::Cross => ts.push(Token::Cross),
        };
        ts.space().push(Token::Join);
        ts
    }
}

/// What a table entry reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Table(String),
    Subquery(Box<SelectQuery>),
}

impl From<&str> for TableSource {
    fn from(table: &str) -> Self {
        TableSource::Table(table.into())
    }
}

impl From<String> for TableSource {
    fn from(table: String) -> Self {
        TableSource::Table(table)
    }
}

impl From<SelectQuery> for TableSource {
    fn from(query: SelectQuery) -> Self {
        TableSource::Subquery(Box::new(query))
    }
}

impl From<TableSource> for Node {
    fn from(source: TableSource) -> Self {
        match source {
            TableSource::Table(table) => Node::Text(table),
            TableSource::Subquery(query) => Node::Subquery { subquery: query },
        }
    }
}

/// Physical table name of a table entry, if it reads from a plain table.
pub fn physical_table(entry: &Node) -> Option<&str> {
    entry.as_map().and_then(|map| map_text(map, table_keys::TABLE))
}

/// Emit one table entry (`"node" n`, `LEFT OUTER JOIN "x" o ON ...`).
///
/// Entries that are not maps, or that lack a table, are skipped.
fn table_tokens(
    alias: &str,
    entry: &Node,
    arguments: &Arguments,
    dialect: Dialect,
    first: bool,
) -> Option<TokenStream> {
    let map = entry.as_map()?;
    let mut ts = TokenStream::new();

    let join_type = map_text(map, table_keys::JOIN_TYPE).and_then(JoinType::parse);
    if !first {
        ts.append(&join_type.unwrap_or(JoinType::Inner).to_tokens())
            .space();
    }

    match map.get(table_keys::TABLE)? {
        Node::Text(table) => {
            ts.push(Token::Ident(table.clone()));
        }
        Node::Subquery { subquery } => {
            ts.lparen()
                .append(&subquery.to_tokens_for_dialect(dialect))
                .rparen();
        }
        other => {
            log::warn!("table entry {alias} has unusable source {other:?}");
            return None;
        }
    }
    ts.space().push(Token::TableAlias(alias.into()));

    if !first && join_type != Some(JoinType::Cross) {
        match map.get(table_keys::CONDITION) {
            Some(Node::Text(on)) => {
                ts.space()
                    .push(Token::On)
                    .space()
                    .push(Token::Raw(bind_placeholders(on, arguments, dialect)));
            }
            Some(Node::Condition(on)) if !on.is_empty() => {
                ts.space()
                    .push(Token::On)
                    .space()
                    .append(&on.to_tokens_for_dialect(dialect));
            }
            _ => {}
        }
    }

    Some(ts)
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDir::Asc => "ASC",
            SortDir::Desc => "DESC",
        }
    }

    fn token(self) -> Token {
        match self {
            SortDir::Asc => Token::Asc,
            SortDir::Desc => Token::Desc,
        }
    }
}

// =============================================================================
// LIMIT / OFFSET
// =============================================================================

/// LIMIT and OFFSET clause.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitOffset {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl LimitOffset {
    /// Delegates to `SqlDialect::emit_limit_offset()` for the actual formatting.
    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        dialect.emit_limit_offset(self.limit, self.offset)
    }
}

// =============================================================================
// Select Query
// =============================================================================

/// A SELECT query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[must_use = "SelectQuery has no effect until compiled with to_sql() or to_tokens()"]
pub struct SelectQuery {
    pub tables: NodeMap,
    pub fields: IndexMap<String, Field>,
    pub expressions: NodeMap,
    pub filter: Condition,
    pub order: NodeMap,
    pub group: NodeMap,
    pub having: Condition,
    pub distinct: bool,
    pub range: Option<LimitOffset>,
    /// Placeholder arguments used by expressions and join conditions.
    pub arguments: Arguments,
    pub tags: BTreeSet<String>,
}

/// First free key: `base`, then `base_2`, `base_3`, ...
fn unique_key<V>(map: &IndexMap<String, V>, base: &str) -> String {
    if !map.contains_key(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !map.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}

impl SelectQuery {
    /// Create a query reading from `table AS alias`.
    pub fn new(table: impl Into<TableSource>, alias: &str) -> Self {
        let mut query = Self::default();
        query.insert_table(None, table.into(), alias, None);
        query
    }

    fn insert_table(
        &mut self,
        join_type: Option<JoinType>,
        source: TableSource,
        alias: &str,
        condition: Option<Node>,
    ) -> String {
        let alias = unique_key(&self.tables, alias);
        let mut entry = NodeMap::new();
        entry.insert(
            table_keys::JOIN_TYPE.into(),
            join_type.map_or(Node::Null, |j| Node::text(j.as_str())),
        );
        entry.insert(table_keys::TABLE.into(), source.into());
        entry.insert(table_keys::ALIAS.into(), Node::text(alias.clone()));
        entry.insert(
            table_keys::CONDITION.into(),
            condition.unwrap_or(Node::Null),
        );
        self.tables.insert(alias.clone(), Node::Map(entry));
        alias
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Add a join and return the alias actually used.
    ///
    /// `condition` may be a text snippet (`"n.vid = nr.vid"`) or a
    /// [`Condition`] node.
    pub fn add_join(
        &mut self,
        join_type: JoinType,
        table: impl Into<TableSource>,
        alias: &str,
        condition: Option<Node>,
    ) -> String {
        self.insert_table(Some(join_type), table.into(), alias, condition)
    }

    /// Add a join on `left_alias.left_column = <alias>.right_column`.
    ///
    /// The ON clause is built after alias de-duplication, so it always
    /// names the alias that was actually registered.
    pub fn add_join_on(
        &mut self,
        join_type: JoinType,
        table: impl Into<TableSource>,
        alias: &str,
        left_alias: &str,
        left_column: &str,
        right_column: &str,
    ) -> String {
        let alias = self.insert_table(Some(join_type), table.into(), alias, None);
        let on = format!("{left_alias}.{left_column} = {alias}.{right_column}");
        if let Some(Node::Map(entry)) = self.tables.get_mut(&alias) {
            entry.insert(table_keys::CONDITION.into(), Node::Text(on));
        }
        alias
    }

    pub fn inner_join(&mut self, table: impl Into<TableSource>, alias: &str, on: &str) -> String {
        self.add_join(JoinType::Inner, table, alias, Some(Node::text(on)))
    }

    pub fn left_join(&mut self, table: impl Into<TableSource>, alias: &str, on: &str) -> String {
        self.add_join(JoinType::Left, table, alias, Some(Node::text(on)))
    }

    /// Move the table entry `alias` so it directly follows `anchor`.
    ///
    /// Returns false when either alias is unknown.
    pub fn move_table_after(&mut self, alias: &str, anchor: &str) -> bool {
        let (Some(from), Some(at)) = (
            self.tables.get_index_of(alias),
            self.tables.get_index_of(anchor),
        ) else {
            return false;
        };
        let to = if from > at { at + 1 } else { at };
        self.tables.move_index(from, to);
        true
    }

    /// Physical table name registered under `alias`.
    pub fn table_name(&self, alias: &str) -> Option<&str> {
        self.tables.get(alias).and_then(physical_table)
    }

    /// Join condition text registered under `alias`.
    pub fn join_condition(&self, alias: &str) -> Option<&Node> {
        self.tables
            .get(alias)
            .and_then(Node::as_map)
            .and_then(|map| map.get(table_keys::CONDITION))
    }

    // =========================================================================
    // Fields and Expressions
    // =========================================================================

    /// Project `table_alias.field`. Returns the output alias.
    ///
    /// Without an explicit alias the field name is used, falling back to
    /// `table_field` when that is taken.
    pub fn add_field(&mut self, table_alias: &str, field: &str, alias: Option<&str>) -> String {
        let wanted = match alias {
            Some(alias) => alias.to_string(),
            None if self.fields.contains_key(field) => format!("{table_alias}_{field}"),
            None => field.to_string(),
        };
        let alias = unique_key(&self.fields, &wanted);
        self.fields.insert(
            alias.clone(),
            Field {
                table: table_alias.into(),
                field: field.into(),
                alias: alias.clone(),
            },
        );
        alias
    }

    /// Project several fields of one table under their own names.
    pub fn add_fields(&mut self, table_alias: &str, fields: &[&str]) -> &mut Self {
        for field in fields {
            self.add_field(table_alias, field, None);
        }
        self
    }

    /// Project a raw SQL expression. Returns the output alias.
    pub fn add_expression(&mut self, expression: &str, alias: Option<&str>) -> String {
        let alias = unique_key(&self.expressions, alias.unwrap_or("expression"));
        let mut entry = NodeMap::new();
        entry.insert(expression_keys::EXPRESSION.into(), Node::text(expression));
        entry.insert(expression_keys::ALIAS.into(), Node::text(alias.clone()));
        self.expressions.insert(alias.clone(), Node::Map(entry));
        alias
    }

    /// Expression text registered under `alias`.
    pub fn expression(&self, alias: &str) -> Option<&str> {
        self.expressions
            .get(alias)
            .and_then(Node::as_map)
            .and_then(|map| map_text(map, expression_keys::EXPRESSION))
    }

    // =========================================================================
    // Conditions
    // =========================================================================

    /// Add a WHERE predicate.
    pub fn condition(
        &mut self,
        field: &str,
        value: impl Into<super::condition::ConditionValue>,
        operator: Operator,
    ) -> &mut Self {
        self.filter.condition(field, value, operator);
        self
    }

    /// Add a raw WHERE snippet.
    pub fn where_snippet(&mut self, snippet: &str, arguments: Arguments) -> &mut Self {
        self.filter.where_snippet(snippet, arguments);
        self
    }

    /// Add a HAVING predicate.
    pub fn having_condition(
        &mut self,
        field: &str,
        value: impl Into<super::condition::ConditionValue>,
        operator: Operator,
    ) -> &mut Self {
        self.having.condition(field, value, operator);
        self
    }

    // =========================================================================
    // Ordering, Grouping, Range
    // =========================================================================

    pub fn order_by(&mut self, expression: &str, dir: SortDir) -> &mut Self {
        self.order
            .insert(expression.into(), Node::text(dir.as_str()));
        self
    }

    pub fn group_by(&mut self, expression: &str) -> &mut Self {
        self.group
            .insert(expression.into(), Node::text(expression));
        self
    }

    pub fn range(&mut self, offset: u64, limit: u64) -> &mut Self {
        self.range = Some(LimitOffset {
            limit: Some(limit),
            offset: Some(offset),
        });
        self
    }

    pub fn distinct(&mut self) -> &mut Self {
        self.distinct = true;
        self
    }

    pub fn set_argument(&mut self, name: &str, value: impl Into<Literal>) -> &mut Self {
        self.arguments.insert(name.into(), value.into());
        self
    }

    // =========================================================================
    // Tags
    // =========================================================================

    pub fn add_tag(&mut self, tag: &str) -> &mut Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    /// Convert to token stream (PostgreSQL).
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert to token stream for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        // SELECT
        ts.push(Token::Select);
        if self.distinct {
            ts.space().push(Token::Distinct);
        }

        // Columns
        let mut columns: Vec<TokenStream> =
            self.fields.values().map(|f| f.to_tokens(dialect)).collect();
        for (alias, entry) in &self.expressions {
            let Some(expression) = entry
                .as_map()
                .and_then(|map| map_text(map, expression_keys::EXPRESSION))
            else {
                log::warn!("expression {alias} has no expression text, skipping");
                continue;
            };
            let mut col = TokenStream::new();
            col.push(Token::Raw(bind_placeholders(
                expression,
                &self.arguments,
                dialect,
            )))
            .space()
            .push(Token::As)
            .space()
            .push(Token::Ident(dialect.escape_alias(alias)));
            columns.push(col);
        }
        if columns.is_empty() {
            columns.push({
                let mut star = TokenStream::new();
                star.push(Token::Raw("*".into()));
                star
            });
        }
        for (i, col) in columns.iter().enumerate() {
            if i == 0 {
                ts.space();
            } else {
                ts.comma().space();
            }
            ts.append(col);
        }

        // FROM + JOINs
        let mut first = true;
        for (alias, entry) in &self.tables {
            let Some(table) = table_tokens(alias, entry, &self.arguments, dialect, first) else {
                continue;
            };
            ts.space();
            if first {
                ts.push(Token::From).space();
            }
            ts.append(&table);
            first = false;
        }

        // WHERE
        if !self.filter.is_empty() {
            let filter = self.filter.to_tokens_for_dialect(dialect);
            if !filter.is_empty() {
                ts.space().push(Token::Where).space().append(&filter);
            }
        }

        // GROUP BY
        let groups: Vec<&str> = self.group.values().filter_map(Node::as_text).collect();
        if !groups.is_empty() {
            ts.space().push(Token::GroupBy).space();
            for (i, group) in groups.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Raw(bind_placeholders(group, &self.arguments, dialect)));
            }
        }

        // HAVING
        if !self.having.is_empty() {
            let having = self.having.to_tokens_for_dialect(dialect);
            if !having.is_empty() {
                ts.space().push(Token::Having).space().append(&having);
            }
        }

        // ORDER BY
        if !self.order.is_empty() {
            ts.space().push(Token::OrderBy).space();
            for (i, (expression, dir)) in self.order.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                let dir = match dir.as_text().map(str::to_ascii_uppercase).as_deref() {
                    Some("DESC") => SortDir::Desc,
                    _ => SortDir::Asc,
                };
                ts.push(Token::Raw(bind_placeholders(
                    expression,
                    &self.arguments,
                    dialect,
                )))
                .space()
                .push(dir.token());
            }
        }

        // LIMIT / OFFSET
        if let Some(range) = &self.range {
            let lo = range.to_tokens(dialect);
            if !lo.is_empty() {
                ts.space().append(&lo);
            }
        }

        ts
    }

    /// Generate SQL string for a specific dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}

impl std::fmt::Display for SelectQuery {
    /// Formats the query using the default dialect (PostgreSQL).
    ///
    /// For dialect-specific SQL, use [`SelectQuery::to_sql`] instead.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_sql(Dialect::default()))
    }
}

// =============================================================================
// Tests
// =============================================================================
