//! Statement clauses the ORM asks the dialect to render.
//!
//! Spanner accepts some of these in a different spelling (`THEN RETURN`)
//! and rejects others outright (`ON CONFLICT`, `FOR UPDATE`).

use crate::builder::quote_list;
use crate::dialect::{Dialect, SpannerDialect};
use crate::error::DialectError;

/// Clause order of an INSERT statement.
pub const CREATE_CLAUSES: &[&str] = &["INSERT", "VALUES", "THEN RETURN"];
/// Clause order of an UPDATE statement.
pub const UPDATE_CLAUSES: &[&str] = &["UPDATE", "SET", "WHERE", "THEN RETURN"];
/// Clause order of a DELETE statement.
pub const DELETE_CLAUSES: &[&str] = &["DELETE", "FROM", "WHERE", "THEN RETURN"];
/// Clause order of a SELECT statement.
pub const QUERY_CLAUSES: &[&str] = &["SELECT", "FROM", "WHERE", "GROUP BY", "ORDER BY", "LIMIT"];

/// Columns returned by a DML statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Returning {
    /// Column names; empty means all columns.
    pub columns: Vec<String>,
}

impl Returning {
    /// Creates a returning clause for the given columns.
    #[must_use]
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| String::from(c.as_ref())).collect(),
        }
    }

    /// Returns the clause keyword.
    #[must_use]
    pub fn name(&self) -> &'static str {
        SpannerDialect::new().returning_keyword()
    }

    /// Merges `other` into this clause; existing columns stay first.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.columns.extend(other.columns);
        self
    }

    /// Renders the column list, or `*` when no column was named.
    #[must_use]
    pub fn build_columns(&self) -> String {
        if self.columns.is_empty() {
            String::from("*")
        } else {
            quote_list(&self.columns)
        }
    }

    /// Renders the whole clause.
    #[must_use]
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.name(), self.build_columns())
    }
}

/// Row lock strength.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrength {
    /// `FOR UPDATE`
    Update,
    /// `FOR SHARE`
    Share,
}

/// A row locking clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locking {
    /// Lock strength.
    pub strength: LockStrength,
    /// Optional `OF` table.
    pub table: Option<String>,
    /// Optional trailing option such as `NOWAIT`.
    pub options: Option<String>,
}

impl Locking {
    /// Creates a `FOR UPDATE` clause.
    #[must_use]
    pub const fn for_update() -> Self {
        Self {
            strength: LockStrength::Update,
            table: None,
            options: None,
        }
    }

    /// Creates a `FOR SHARE` clause.
    #[must_use]
    pub const fn for_share() -> Self {
        Self {
            strength: LockStrength::Share,
            table: None,
            options: None,
        }
    }

    /// Renders the clause for `dialect`, or `None` when the dialect has no
    /// locking clause and it must be dropped.
    #[must_use]
    pub fn to_sql_for<D: Dialect>(&self, dialect: &D) -> Option<String> {
        if !dialect.supports_locking_clause() {
            return None;
        }
        let mut sql = String::from(match self.strength {
            LockStrength::Update => "FOR UPDATE",
            LockStrength::Share => "FOR SHARE",
        });
        if let Some(table) = &self.table {
            sql.push_str(" OF ");
            sql.push_str(&dialect.quote_identifier(table));
        }
        if let Some(options) = &self.options {
            sql.push(' ');
            sql.push_str(options);
        }
        Some(sql)
    }
}

/// An `ON CONFLICT` clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnConflict {
    /// Conflict target columns.
    pub columns: Vec<String>,
    /// `DO NOTHING` instead of an update.
    pub do_nothing: bool,
    /// Columns updated from the excluded row.
    pub update_columns: Vec<String>,
}

impl OnConflict {
    /// Renders the clause.
    ///
    /// # Errors
    ///
    /// Always fails: Spanner has no `ON CONFLICT`.
    pub fn to_sql(&self) -> Result<String, DialectError> {
        Err(DialectError::Unsupported("ON CONFLICT"))
    }
}
