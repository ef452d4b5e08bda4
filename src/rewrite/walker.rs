//! Recursive structure walker.
//!
//! Walks one query section and hands every text leaf to the
//! [`DatumRewriter`]. Keyed containers may have their keys rewritten too;
//! renames are collected during the walk and applied afterwards in one
//! order-preserving rebuild.
//!
//! Conditions get special treatment. The destination engine escapes plain
//! predicate fields, which strips the parentheses and commas of a
//! synthesized `COALESCE(..)`. Every condition met is therefore
//! transplanted: its predicate fields are sanitized with the engine's own
//! escaping rule and the node is replaced by the expression-safe variant
//! before any leaf inside it is rewritten.

use crate::sql::condition::{Condition, ConditionItem, FieldEscaping};
use crate::sql::dialect::helpers::escape_field;
use crate::sql::node::{Node, NodeMap};

use super::datum::DatumRewriter;

/// Replace an escaped condition with its expression-safe equivalent.
///
/// Predicate fields are sanitized first. Nested conditions are left to the
/// walker. Conditions that are already expression-safe are kept as they are.
pub fn transplant(condition: &mut Condition) {
    if condition.escaping() == FieldEscaping::Raw {
        return;
    }
    let (conjunction, mut items, _) = std::mem::take(condition).into_parts();
    for item in &mut items {
        if let ConditionItem::Predicate { field, .. } = item {
            *field = escape_field(field);
        }
    }
    *condition = Condition::expression_safe(conjunction, items);
}

pub struct Walker<'a> {
    datum: &'a DatumRewriter,
}

impl<'a> Walker<'a> {
    pub fn new(datum: &'a DatumRewriter) -> Self {
        Self { datum }
    }

    pub fn walk_node(&self, node: &mut Node) {
        match node {
            Node::Map(map) => self.walk_map(map),
            Node::List(items) => {
                for item in items {
                    self.walk_node(item);
                }
            }
            Node::Condition(condition) => self.walk_condition(condition),
            Node::Text(text) => {
                self.datum.rewrite_in_place(text);
            }
            Node::Subquery { .. } => {
                log::trace!("leaving nested subquery untouched");
            }
            Node::Null | Node::Bool(_) | Node::Int(_) | Node::Float(_) => {}
        }
    }

    /// Walk a keyed container, rewriting keys and values.
    ///
    /// When two keys end up equal the later value wins and keeps the
    /// position of the earlier key.
    pub fn walk_map(&self, map: &mut NodeMap) {
        let mut renames: Vec<(usize, String)> = Vec::new();
        for (index, (key, value)) in map.iter_mut().enumerate() {
            if let std::borrow::Cow::Owned(new_key) = self.datum.rewrite(key) {
                renames.push((index, new_key));
            }
            self.walk_node(value);
        }

        if renames.is_empty() {
            return;
        }

        let mut renames = renames.into_iter().peekable();
        let entries = std::mem::take(map);
        for (index, (key, value)) in entries.into_iter().enumerate() {
            let key = match renames.next_if(|(at, _)| *at == index) {
                Some((_, new_key)) => new_key,
                None => key,
            };
            if map.contains_key(&key) {
                log::warn!("rewritten key {key} collides with an existing entry, later value wins");
            }
            map.insert(key, value);
        }
    }

    /// Transplant a condition, then rewrite its predicate fields, nested
    /// conditions and raw snippets.
    ///
    /// Values and snippet arguments are bound data and stay as they are.
    pub fn walk_condition(&self, condition: &mut Condition) {
        transplant(condition);
        for item in condition.items_mut() {
            match item {
                ConditionItem::Predicate { field, .. } => {
                    self.datum.rewrite_in_place(field);
                }
                ConditionItem::Nested { condition } => self.walk_condition(condition),
                ConditionItem::Snippet { snippet, .. } => {
                    self.datum.rewrite_in_place(snippet);
                }
            }
        }
    }
}
