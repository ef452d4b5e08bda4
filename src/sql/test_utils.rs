//! Test utilities for SQL emission validation.
//!
//! Rewritten queries are parsed back with sqlparser-rs so a test fails as
//! soon as a rewrite produces text the destination engine would reject.

use sqlparser::dialect::{DuckDbDialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Validates that a SQL string is syntactically valid for the given dialect.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
    };

    Parser::parse_sql(parser_dialect.as_ref(), sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_valid_sql() {
        validate_sql(r#"SELECT n.nid AS "nid" FROM "node" n"#, Dialect::Postgres).unwrap();
        validate_sql("SELECT n.nid AS `nid` FROM `node` n", Dialect::MySql).unwrap();
        validate_sql(r#"SELECT * FROM "node" n"#, Dialect::DuckDb).unwrap();
    }

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("SELEC * FORM node", Dialect::Postgres);
        assert!(result.is_err());
    }
}
