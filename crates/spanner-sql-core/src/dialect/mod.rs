//! SQL Dialect support.
//!
//! The ORM asks the dialect how to quote names, how to write parameters and
//! which clauses the database understands. Cloud Spanner differs from the
//! ANSI defaults in most of these answers; see [`SpannerDialect`].

mod spanner;

pub use spanner::{bind_named, bind_vars, SpannerDialect};

use crate::builder::value::SqlValue;

/// Trait for SQL dialect-specific behavior.
pub trait Dialect {
    /// Returns the name of the dialect.
    fn name(&self) -> &'static str;

    /// Returns the identifier quote character (e.g., `"` for standard SQL, `` ` `` for MySQL).
    fn identifier_quote(&self) -> char {
        '"'
    }

    /// Returns the placeholder for the parameter at `index` (1-based).
    fn parameter_placeholder(&self, index: usize) -> String {
        let _ = index;
        String::from("?")
    }

    /// Returns whether the dialect can return rows from DML statements.
    fn supports_returning(&self) -> bool {
        false
    }

    /// Returns the keyword that introduces the returned columns of a DML statement.
    fn returning_keyword(&self) -> &'static str {
        "RETURNING"
    }

    /// Returns whether the dialect supports UPSERT (ON CONFLICT).
    fn supports_upsert(&self) -> bool {
        false
    }

    /// Returns whether the dialect supports transaction savepoints.
    fn supports_savepoints(&self) -> bool {
        true
    }

    /// Returns whether the dialect accepts `FOR UPDATE` / `FOR SHARE`.
    fn supports_locking_clause(&self) -> bool {
        true
    }

    /// Returns whether the dialect supports LIMIT with OFFSET.
    fn supports_limit_offset(&self) -> bool {
        true
    }

    /// Quotes an identifier. Dotted names are quoted part by part.
    fn quote_identifier(&self, name: &str) -> String {
        let quote = self.identifier_quote();
        name.split('.')
            .map(|part| {
                if part == "*" {
                    String::from("*")
                } else {
                    format!("{quote}{part}{quote}")
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Renders `sql` with its parameters inlined, for logging only.
    fn explain(&self, sql: &str, params: &[SqlValue]) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut next = 0;
        for c in sql.chars() {
            if c == '?' {
                match params.get(next) {
                    Some(value) => out.push_str(&value.to_sql_inline()),
                    None => out.push(c),
                }
                next += 1;
            } else {
                out.push(c);
            }
        }
        out
    }
}
