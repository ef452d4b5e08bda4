//! Condition trees for WHERE, HAVING and join clauses.
//!
//! A [`Condition`] is a conjunction (`AND`/`OR`) over an ordered list of
//! items. Each item is a predicate on a field, a nested condition, or a raw
//! SQL snippet with its own placeholder arguments.
//!
//! How predicate fields are emitted depends on [`FieldEscaping`]:
//!
//! - `Escaped` (the default) runs every field through the dialect's
//!   `escape_field`, which strips parentheses, commas and spaces.
//! - `Raw` emits fields exactly as stored. This is the expression-safe
//!   variant: a field such as `COALESCE(o.status, n.status)` survives
//!   compilation. Fields must be sanitized before they are placed in a raw
//!   condition.

use serde::{Deserialize, Serialize};

use super::dialect::Dialect;
use super::node::{bind_placeholders, Arguments, Literal};
use super::query::SelectQuery;
use super::token::{Token, TokenStream};

// =============================================================================
// Operators
// =============================================================================

/// Logical operator joining the items of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    fn token(self) -> Token {
        match self {
            Conjunction::And => Token::And,
            Conjunction::Or => Token::Or,
        }
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT LIKE")]
    NotLike,
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "NOT IN")]
    NotIn,
    #[serde(rename = "BETWEEN")]
    Between,
    #[serde(rename = "IS NULL")]
    IsNull,
    #[serde(rename = "IS NOT NULL")]
    IsNotNull,
}

/// How predicate fields are emitted at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldEscaping {
    #[default]
    Escaped,
    /// Expression-safe: fields are emitted verbatim.
    Raw,
}

// =============================================================================
// Items
// =============================================================================

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Subquery { subquery: Box<SelectQuery> },
    List(Vec<Literal>),
    Single(Literal),
}

impl Default for ConditionValue {
    fn default() -> Self {
        ConditionValue::Single(Literal::Null)
    }
}

macro_rules! impl_single_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ConditionValue {
                fn from(value: $t) -> Self {
                    ConditionValue::Single(value.into())
                }
            }

            impl From<Vec<$t>> for ConditionValue {
                fn from(values: Vec<$t>) -> Self {
                    ConditionValue::List(values.into_iter().map(Into::into).collect())
                }
            }
        )*
    };
}

impl_single_value!(Literal, i64, i32, bool, f64, &str, String);

impl From<SelectQuery> for ConditionValue {
    fn from(query: SelectQuery) -> Self {
        ConditionValue::Subquery {
            subquery: Box::new(query),
        }
    }
}

/// One operand of a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionItem {
    /// `field <operator> value`
    Predicate {
        field: String,
        #[serde(default)]
        value: ConditionValue,
        #[serde(default)]
        operator: Operator,
    },
    /// Parenthesized sub-condition.
    Nested { condition: Condition },
    /// Raw SQL fragment. Never escaped.
    Snippet {
        snippet: String,
        #[serde(default)]
        arguments: Arguments,
    },
}

// =============================================================================
// Condition
// =============================================================================

/// A conjunction over an ordered list of items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Condition {
    #[serde(default)]
    conjunction: Conjunction,
    items: Vec<ConditionItem>,
    #[serde(default)]
    escaping: FieldEscaping,
}

impl Condition {
    pub fn new(conjunction: Conjunction) -> Self {
        Self {
            conjunction,
            items: Vec::new(),
            escaping: FieldEscaping::Escaped,
        }
    }

    pub fn and() -> Self {
        Self::new(Conjunction::And)
    }

    pub fn or() -> Self {
        Self::new(Conjunction::Or)
    }

    /// Build an expression-safe condition from existing parts.
    pub fn expression_safe(conjunction: Conjunction, items: Vec<ConditionItem>) -> Self {
        Self {
            conjunction,
            items,
            escaping: FieldEscaping::Raw,
        }
    }

    /// Add `field <operator> value`.
    pub fn condition(
        &mut self,
        field: &str,
        value: impl Into<ConditionValue>,
        operator: Operator,
    ) -> &mut Self {
        self.items.push(ConditionItem::Predicate {
            field: field.into(),
            value: value.into(),
            operator,
        });
        self
    }

    /// Add `field = value`.
    pub fn equals(&mut self, field: &str, value: impl Into<Literal>) -> &mut Self {
        self.condition(field, value.into(), Operator::Eq)
    }

    pub fn is_null(&mut self, field: &str) -> &mut Self {
        self.condition(field, Literal::Null, Operator::IsNull)
    }

    pub fn is_not_null(&mut self, field: &str) -> &mut Self {
        self.condition(field, Literal::Null, Operator::IsNotNull)
    }

    pub fn between(
        &mut self,
        field: &str,
        low: impl Into<Literal>,
        high: impl Into<Literal>,
    ) -> &mut Self {
        self.condition(
            field,
            ConditionValue::List(vec![low.into(), high.into()]),
            Operator::Between,
        )
    }

    /// Add a raw SQL snippet with `:name` placeholders.
    pub fn where_snippet(&mut self, snippet: &str, arguments: Arguments) -> &mut Self {
        self.items.push(ConditionItem::Snippet {
            snippet: snippet.into(),
            arguments,
        });
        self
    }

    /// Add a parenthesized sub-condition.
    pub fn nest(&mut self, condition: Condition) -> &mut Self {
        self.items.push(ConditionItem::Nested { condition });
        self
    }

    pub fn conjunction(&self) -> Conjunction {
        self.conjunction
    }

    pub fn escaping(&self) -> FieldEscaping {
        self.escaping
    }

    pub fn items(&self) -> &[ConditionItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [ConditionItem] {
        &mut self.items
    }

    pub fn into_parts(self) -> (Conjunction, Vec<ConditionItem>, FieldEscaping) {
        (self.conjunction, self.items, self.escaping)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    /// Convert to tokens. Empty nested conditions are skipped.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        let mut first = true;

        for item in &self.items {
            let compiled = self.item_tokens(item, dialect);
            if compiled.is_empty() {
                continue;
            }
            if !first {
                ts.space().push(self.conjunction.token()).space();
            }
            ts.append(&compiled);
            first = false;
        }

        ts
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }

    fn field_token(&self, field: &str) -> Token {
        match self.escaping {
            FieldEscaping::Escaped => Token::FieldRef(field.into()),
            FieldEscaping::Raw => Token::Raw(field.into()),
        }
    }

    fn item_tokens(&self, item: &ConditionItem, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        match item {
            ConditionItem::Predicate {
                field,
                value,
                operator,
            } => {
                ts.push(self.field_token(field));
                predicate_tokens(&mut ts, value, *operator, dialect);
            }
            ConditionItem::Nested { condition } => {
                let inner = condition.to_tokens_for_dialect(dialect);
                if !inner.is_empty() {
                    ts.lparen().append(&inner).rparen();
                }
            }
            ConditionItem::Snippet { snippet, arguments } => {
                ts.push(Token::Raw(bind_placeholders(snippet, arguments, dialect)));
            }
        }
        ts
    }
}

fn predicate_tokens(
    ts: &mut TokenStream,
    value: &ConditionValue,
    operator: Operator,
    dialect: Dialect,
) {
    let comparison = match operator {
        Operator::IsNull => {
            ts.space().push(Token::IsNull);
            return;
        }
        Operator::IsNotNull => {
            ts.space().push(Token::IsNotNull);
            return;
        }
        Operator::In | Operator::NotIn => {
            ts.space();
            if operator == Operator::NotIn {
                ts.push(Token::Not).space();
            }
            ts.push(Token::In).space().lparen();
            match value {
                ConditionValue::Subquery { subquery } => {
                    ts.append(&subquery.to_tokens_for_dialect(dialect));
                }
                ConditionValue::List(values) if values.is_empty() => {
                    // Matches nothing; `IN ()` is not valid SQL.
                    ts.push(Token::LitNull);
                }
                ConditionValue::List(values) => {
                    for (i, v) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.push(v.to_token());
                    }
                }
                ConditionValue::Single(v) => {
                    ts.push(v.to_token());
                }
            }
            ts.rparen();
            return;
        }
        Operator::Between => {
            ts.space().push(Token::Between).space();
            match value {
                ConditionValue::List(values) if values.len() == 2 => {
                    ts.push(values[0].to_token())
                        .space()
                        .push(Token::And)
                        .space()
                        .push(values[1].to_token());
                }
                _ => {
                    log::warn!("BETWEEN needs exactly two values, emitting NULL bounds");
                    ts.push(Token::LitNull)
                        .space()
                        .push(Token::And)
                        .space()
                        .push(Token::LitNull);
                }
            }
            return;
        }
        Operator::Like => Token::Like,
        Operator::NotLike => {
            ts.space().push(Token::Not);
            Token::Like
        }
        Operator::Eq => Token::Eq,
        Operator::Ne => Token::Ne,
        Operator::Lt => Token::Lt,
        Operator::Gt => Token::Gt,
        Operator::Lte => Token::Lte,
        Operator::Gte => Token::Gte,
    };

    ts.space().push(comparison).space();
    match value {
        ConditionValue::Subquery { subquery } => {
            ts.lparen()
                .append(&subquery.to_tokens_for_dialect(dialect))
                .rparen();
        }
        ConditionValue::Single(v) => {
            ts.push(v.to_token());
        }
        ConditionValue::List(values) => {
            // Comparison against a list only uses the first element.
            ts.push(values.first().map_or(Token::LitNull, Literal::to_token));
        }
    }
}
