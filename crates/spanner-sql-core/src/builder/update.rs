//! UPDATE statement builder using the typestate pattern.
//!
//! Spanner rejects an UPDATE without a WHERE clause, so `build()` is only
//! available once a filter was given. Use `all_rows()` to update every row.

use std::marker::PhantomData;

use super::expr::ExprBuilder;
use super::value::{SqlValue, ToSqlValue};
use super::{quote, Statement};
use crate::clause::Returning;
use crate::dialect::bind_vars;

// Typestate markers

/// Marker: No table specified yet.
pub struct NoTable;
/// Marker: Table has been specified.
pub struct HasTable;
/// Marker: No SET clause specified yet.
pub struct NoSet;
/// Marker: SET clause has been specified.
pub struct HasSet;
/// Marker: No WHERE clause specified yet.
pub struct NoWhere;
/// Marker: WHERE clause has been specified.
pub struct HasWhere;

/// A column assignment.
#[derive(Debug, Clone)]
struct Assignment {
    column: String,
    value: SqlValue,
}

/// An UPDATE statement builder.
pub struct Update<Table, Set, Filter> {
    table: Option<String>,
    assignments: Vec<Assignment>,
    where_clause: Option<ExprBuilder>,
    returning: Option<Returning>,
    _state: PhantomData<(Table, Set, Filter)>,
}

impl Update<NoTable, NoSet, NoWhere> {
    /// Creates a new UPDATE builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: None,
            assignments: vec![],
            where_clause: None,
            returning: None,
            _state: PhantomData,
        }
    }
}

impl Default for Update<NoTable, NoSet, NoWhere> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Table, Set, Filter> Update<Table, Set, Filter> {
    fn transition<T, S, F>(self) -> Update<T, S, F> {
        Update {
            table: self.table,
            assignments: self.assignments,
            where_clause: self.where_clause,
            returning: self.returning,
            _state: PhantomData,
        }
    }
}

// Transition: NoTable -> HasTable
impl Update<NoTable, NoSet, NoWhere> {
    /// Specifies the table to update.
    #[must_use]
    pub fn table(mut self, table: &str) -> Update<HasTable, NoSet, NoWhere> {
        self.table = Some(String::from(table));
        self.transition()
    }
}

// Transition: NoSet -> HasSet
impl<Filter> Update<HasTable, NoSet, Filter> {
    /// Adds a SET assignment.
    #[must_use]
    pub fn set<T: ToSqlValue>(mut self, column: &str, value: T) -> Update<HasTable, HasSet, Filter> {
        self.assignments.push(Assignment {
            column: String::from(column),
            value: value.to_sql_value(),
        });
        self.transition()
    }
}

impl<Filter> Update<HasTable, HasSet, Filter> {
    /// Adds another SET assignment.
    #[must_use]
    pub fn and_set<T: ToSqlValue>(mut self, column: &str, value: T) -> Self {
        self.assignments.push(Assignment {
            column: String::from(column),
            value: value.to_sql_value(),
        });
        self
    }

    /// Returns the given columns of the updated rows (`THEN RETURN`).
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
impl Update<HasTable, HasSet, NoWhere> {
    /// Adds the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, expr: ExprBuilder) -> Update<HasTable, HasSet, HasWhere> {
        self.where_clause = Some(expr);
        self.transition()
    }

    /// Updates every row of the table (`WHERE TRUE`).
    #[must_use]
    pub fn all_rows(self) -> Update<HasTable, HasSet, HasWhere> {
        self.where_clause(ExprBuilder::raw("TRUE"))
    }
}

impl Update<HasTable, HasSet, HasWhere> {
    /// Builds the UPDATE statement.
    #[must_use]
    pub fn build(self) -> Statement {
        let mut sql = String::from("UPDATE ");
        let mut params = vec![];

        if let Some(ref table) = self.table {
            sql.push_str(&quote(table));
        }

        sql.push_str(" SET ");

        let set_parts: Vec<String> = self
            .assignments
            .iter()
            .map(|a| format!("{}=?", quote(&a.column)))
            .collect();
        sql.push_str(&set_parts.join(","));

        for assignment in self.assignments {
            params.push(assignment.value);
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
