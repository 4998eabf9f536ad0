//! INSERT statement builder using the typestate pattern.

use std::marker::PhantomData;

use super::value::{SqlValue, ToSqlValue};
use super::{quote, quote_list, Statement};
use crate::clause::Returning;
use crate::dialect::bind_vars;

// Typestate markers

/// Marker: No table specified yet.
pub struct NoTable;
/// Marker: Table has been specified.
pub struct HasTable;
/// Marker: No values specified yet.
pub struct NoValues;
/// Marker: Values have been specified.
pub struct HasValues;

/// An INSERT statement builder.
pub struct Insert<Table, Values> {
    table: Option<String>,
    columns: Vec<String>,
    values: Vec<Vec<SqlValue>>,
    returning: Option<Returning>,
    _state: PhantomData<(Table, Values)>,
}

impl Insert<NoTable, NoValues> {
    /// Creates a new INSERT builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: None,
            columns: vec![],
            values: vec![],
            returning: None,
            _state: PhantomData,
        }
    }
}

impl Default for Insert<NoTable, NoValues> {
    fn default() -> Self {
        Self::new()
    }
}

// Transition: NoTable -> HasTable
impl<Values> Insert<NoTable, Values> {
    /// Specifies the table to insert into.
    #[must_use]
    pub fn into_table(self, table: &str) -> Insert<HasTable, Values> {
        Insert {
            table: Some(String::from(table)),
            columns: self.columns,
            values: self.values,
            returning: self.returning,
            _state: PhantomData,
        }
    }
}

// Methods available after specifying table
impl<Values> Insert<HasTable, Values> {
    /// Specifies the columns to insert into.
    #[must_use]
    pub fn columns<S: AsRef<str>>(mut self, cols: &[S]) -> Self {
        self.columns = cols.iter().map(|s| String::from(s.as_ref())).collect();
        self
    }

    /// Returns the given columns of the inserted rows (`THEN RETURN`).
    ///
    /// An empty list returns every column. Calling it twice merges the lists.
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

// Transition: NoValues -> HasValues
impl Insert<HasTable, NoValues> {
    /// Adds a row of values to insert.
    #[must_use]
    pub fn values<T: ToSqlValue>(self, vals: Vec<T>) -> Insert<HasTable, HasValues> {
        self.values_many(vec![vals])
    }

    /// Adds multiple rows of values to insert.
    #[must_use]
    pub fn values_many<T: ToSqlValue>(self, rows: Vec<Vec<T>>) -> Insert<HasTable, HasValues> {
        let sql_rows: Vec<Vec<SqlValue>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(ToSqlValue::to_sql_value).collect())
            .collect();
        Insert {
            table: self.table,
            columns: self.columns,
            values: sql_rows,
            returning: self.returning,
            _state: PhantomData,
        }
    }
}

// Methods available after adding values
impl Insert<HasTable, HasValues> {
    /// Adds another row of values.
    #[must_use]
    pub fn and_values<T: ToSqlValue>(mut self, vals: Vec<T>) -> Self {
        self.values
            .push(vals.into_iter().map(ToSqlValue::to_sql_value).collect());
        self
    }

    /// Builds the INSERT statement.
    #[must_use]
    pub fn build(self) -> Statement {
        let mut sql = String::from("INSERT INTO ");
        let mut params = vec![];

        if let Some(ref table) = self.table {
            sql.push_str(&quote(table));
        }

        if !self.columns.is_empty() {
            sql.push_str(" (");
            sql.push_str(&quote_list(&self.columns));
            sql.push(')');
        }

        sql.push_str(" VALUES ");

        let rows: Vec<String> = self
            .values
            .into_iter()
            .map(|row| {
                let placeholders: Vec<&str> = row.iter().map(|_| "?").collect();
                params.extend(row);
                format!("({})", placeholders.join(","))
            })
            .collect();
        sql.push_str(&rows.join(","));

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
