//! SQL Dialect definitions and formatting rules.
//!
//! A dialect plays the role of the destination engine: it decides how
//! identifiers and literals are quoted and how plain `table.field`
//! references are escaped before they reach the compiled text.
//!
//! - Identifier quoting: `"` (PostgreSQL/DuckDB), `` ` `` (MySQL)
//! - Boolean literals: true/false vs 1/0
//! - Reference escaping: everything except `[A-Za-z0-9_.]` is stripped
//!
//! # Usage
//!
//! ```
//! use overlay::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::Postgres;
//! assert_eq!(dialect.quote_identifier("node"), "\"node\"");
//! assert_eq!(dialect.escape_field("n.status; --"), "n.status");
//! ```

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;

pub use duckdb::DuckDb;
pub use mysql::MySql;
pub use postgres::Postgres;

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (physical table name, output alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a NULL literal.
    fn format_null(&self) -> &'static str {
        "NULL"
    }

    // =========================================================================
    // Reference Escaping
    // =========================================================================

    /// Escape a plain `table.field` reference.
    ///
    /// Parentheses and commas are stripped, so a function call that reaches
    /// this method is destroyed. Conditions compiled with
    /// [`FieldEscaping::Raw`](crate::sql::condition::FieldEscaping) skip it.
    fn escape_field(&self, field: &str) -> String {
        helpers::escape_field(field)
    }

    /// Escape a table alias.
    fn escape_table(&self, table: &str) -> String {
        helpers::escape_table(table)
    }

    /// Escape an output alias before quoting.
    fn escape_alias(&self, alias: &str) -> String {
        helpers::escape_alias(alias)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET or equivalent pagination clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    DuckDb,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::Postgres => &Postgres,
            Dialect::MySql => &MySql,
            Dialect::DuckDb => &DuckDb,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_null(&self) -> &'static str {
        self.dialect().format_null()
    }

    fn escape_field(&self, field: &str) -> String {
        self.dialect().escape_field(field)
    }

    fn escape_table(&self, table: &str) -> String {
        self.dialect().escape_table(table)
    }

    fn escape_alias(&self, alias: &str) -> String {
        self.dialect().escape_alias(alias)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
