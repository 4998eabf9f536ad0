//! DELETE statement builder using the typestate pattern.
//!
//! Spanner rejects a DELETE without a WHERE clause. `build()` is only
//! available after `where_clause()` or `all_rows()`.

use std::marker::PhantomData;

use super::expr::ExprBuilder;
use super::{quote, Statement};
use crate::clause::Returning;
use crate::dialect::bind_vars;

// Typestate markers

/// Marker: No table specified yet.
pub struct NoTable;
/// Marker: Table has been specified.
pub struct HasTable;
/// Marker: No WHERE clause specified yet.
pub struct NoWhere;
/// Marker: WHERE clause has been specified.
pub struct HasWhere;

/// A DELETE statement builder.
pub struct Delete<Table, Filter> {
    table: Option<String>,
    where_clause: Option<ExprBuilder>,
    returning: Option<Returning>,
    _state: PhantomData<(Table, Filter)>,
}

impl Delete<NoTable, NoWhere> {
    /// Creates a new DELETE builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: None,
            where_clause: None,
            returning: None,
            _state: PhantomData,
        }
    }

    /// Specifies the table to delete from.
    #[must_use]
    pub fn from(self, table: &str) -> Delete<HasTable, NoWhere> {
        Delete {
            table: Some(String::from(table)),
            where_clause: None,
            returning: self.returning,
            _state: PhantomData,
        }
    }
}

impl Default for Delete<NoTable, NoWhere> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Filter> Delete<HasTable, Filter> {
    /// Returns the given columns of the deleted rows (`THEN RETURN`).
    #[must_use]
    pub fn then_return<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        let next = Returning::new(cols);
        self.returning = Some(match self.returning.take() {
            Some(existing) => existing.merge(next),
            None => next,
        });
        self
    }
}

// Transition: NoWhere -> HasWhere
impl Delete<HasTable, NoWhere> {
    /// Adds the WHERE clause.
    #[must_use]
    pub fn where_clause(self, expr: ExprBuilder) -> Delete<HasTable, HasWhere> {
        Delete {
            table: self.table,
            where_clause: Some(expr),
            returning: self.returning,
            _state: PhantomData,
        }
    }

    /// Deletes every row of the table (`WHERE TRUE`).
    #[must_use]
    pub fn all_rows(self) -> Delete<HasTable, HasWhere> {
        self.where_clause(ExprBuilder::raw("TRUE"))
    }
}

impl Delete<HasTable, HasWhere> {
    /// Builds the DELETE statement.
    #[must_use]
    pub fn build(self) -> Statement {
        let mut sql = String::from("DELETE FROM ");
        let mut params = vec![];

        if let Some(ref table) = self.table {
            sql.push_str(&quote(table));
        }

        if let Some(where_expr) = self.where_clause {
            let (where_sql, where_params) = where_expr.build();
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params.extend(where_params);
        }

        if let Some(returning) = &self.returning {
            sql.push(' ');
            sql.push_str(&returning.to_sql());
        }

        Statement {
            sql: bind_vars(&sql),
            params,
        }
    }
}
