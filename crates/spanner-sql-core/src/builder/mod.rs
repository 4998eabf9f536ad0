//! Type-Safe SQL Builder
//!
//! Typestate builders that produce Spanner DML. Expressions carry `?`
//! markers while they are composed; `build()` numbers them into `@p1`,
//! `@p2`, ... so the parameter list and the SQL always agree.
//!
//! # Example
//!
//! ```rust
//! use spanner_sql_core::builder::{Delete, col};
//!
//! let stmt = Delete::new()
//!     .from("albums")
//!     .where_clause(col("singer_id").eq(1))
//!     .build();
//!
//! assert_eq!(stmt.sql, "DELETE FROM `albums` WHERE `singer_id` = @p1");
//! ```

mod delete;
mod expr;
mod insert;
mod select;
mod update;
pub mod value;

pub use delete::Delete;
pub use expr::{col, Column, ExprBuilder};
pub use insert::Insert;
pub use select::Select;
pub use update::Update;
pub use value::{quote_string, FromSqlValue, Json, Numeric, SqlValue, ToSqlValue};

use crate::dialect::{bind_named, bind_vars, Dialect, SpannerDialect};
use crate::error::DialectError;

/// A SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text with `@pN` placeholders.
    pub sql: String,
    /// Parameter values; `params[0]` binds `@p1`.
    pub params: Vec<SqlValue>,
}

impl Statement {
    /// Creates a statement from SQL text and parameters.
    #[must_use]
    pub fn new(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Creates a statement without parameters.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, vec![])
    }

    /// Creates a statement from SQL text with `@name` arguments, which are
    /// rewritten to `@p1`, `@p2`, ... in order of use.
    ///
    /// # Errors
    ///
    /// Returns `DialectError::InvalidStatement` when the text uses a name
    /// that `args` does not bind.
    pub fn named(sql: &str, args: &[(&str, SqlValue)]) -> Result<Self, DialectError> {
        let (sql, params) = bind_named(sql, args)?;
        Ok(Self::new(bind_vars(&sql), params))
    }

    /// Renders the statement with its parameters inlined, for logs.
    #[must_use]
    pub fn explain(&self) -> String {
        SpannerDialect::new().explain(&self.sql, &self.params)
    }
}

/// Quotes an identifier with the Spanner dialect.
pub(crate) fn quote(name: &str) -> String {
    SpannerDialect::new().quote_identifier(name)
}

/// Quotes and joins a column list without spaces, as Spanner tooling prints it.
pub(crate) fn quote_list(names: &[String]) -> String {
    names.iter().map(|n| quote(n)).collect::<Vec<_>>().join(",")
}
