//! SELECT statement builder using the typestate pattern.
//!
//! Invalid SQL constructs are caught at compile time: `build()` needs both
//! a column list and a FROM clause.

use std::marker::PhantomData;

use super::expr::ExprBuilder;
use super::{quote, quote_list, Statement};
use crate::clause::Locking;
use crate::dialect::{bind_vars, SpannerDialect};

// Typestate markers (zero-sized types)

/// Marker: No columns specified yet.
pub struct NoColumns;
/// Marker: Columns have been specified.
pub struct HasColumns;
/// Marker: No FROM clause specified yet.
pub struct NoFrom;
/// Marker: FROM clause has been specified.
pub struct HasFrom;

enum Projection {
    All,
    Columns(Vec<String>),
    Raw(String),
}

/// A SELECT statement builder.
///
/// Uses the typestate pattern to ensure that:
/// - `build()` is only available when both columns and FROM are specified
/// - `where_clause()` is only available after FROM is specified
pub struct Select<Cols, From> {
    distinct: bool,
    columns: Projection,
    from: Option<String>,
    where_clause: Option<ExprBuilder>,
    group_by: Vec<String>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    locking: Option<Locking>,
    _state: PhantomData<(Cols, From)>,
}

impl Select<NoColumns, NoFrom> {
    /// Creates a new SELECT builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            distinct: false,
            columns: Projection::All,
            from: None,
            where_clause: None,
            group_by: vec![],
            order_by: vec![],
            limit: None,
            offset: None,
            locking: None,
            _state: PhantomData,
        }
    }
}

impl Default for Select<NoColumns, NoFrom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cols, From> Select<Cols, From> {
    fn transition<C, F>(self) -> Select<C, F> {
        Select {
            distinct: self.distinct,
            columns: self.columns,
            from: self.from,
            where_clause: self.where_clause,
            group_by: self.group_by,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            locking: self.locking,
            _state: PhantomData,
        }
    }
}

// Transition: NoColumns -> HasColumns
impl<From> Select<NoColumns, From> {
    /// Specifies the columns to select.
    #[must_use]
    pub fn columns<S: AsRef<str>>(mut self, cols: &[S]) -> Select<HasColumns, From> {
        self.columns = Projection::Columns(cols.iter().map(|s| String::from(s.as_ref())).collect());
        self.transition()
    }

    /// Selects all columns (*).
    #[must_use]
    pub fn all(mut self) -> Select<HasColumns, From> {
        self.columns = Projection::All;
        self.transition()
    }

    /// Selects a raw projection such as `COUNT(*)`.
    ///
    /// **Warning**: Only use this for SQL fragments that don't contain user input.
    #[must_use]
    pub fn raw_columns(mut self, sql: &str) -> Select<HasColumns, From> {
        self.columns = Projection::Raw(String::from(sql));
        self.transition()
    }
}

// Transition: NoFrom -> HasFrom
impl<Cols> Select<Cols, NoFrom> {
    /// Specifies the table to select from.
    #[must_use]
    pub fn from(mut self, table: &str) -> Select<Cols, HasFrom> {
        self.from = Some(String::from(table));
        self.transition()
    }
}

// Methods available after FROM
impl<Cols> Select<Cols, HasFrom> {
    /// Adds a WHERE clause, AND-ed with any existing one.
    #[must_use]
    pub fn where_clause(mut self, expr: ExprBuilder) -> Self {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => existing.paren().and(expr.paren()),
            None => expr,
        });
        self
    }
}

impl Select<HasColumns, HasFrom> {
    /// Sets DISTINCT.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a GROUP BY clause.
    #[must_use]
    pub fn group_by(mut self, cols: &[&str]) -> Self {
        self.group_by = cols.iter().map(|s| String::from(*s)).collect();
        self
    }

    /// Adds ascending ORDER BY columns.
    #[must_use]
    pub fn order_by(mut self, cols: &[&str]) -> Self {
        self.order_by.extend(cols.iter().map(|c| quote(c)));
        self
    }

    /// Adds descending ORDER BY columns.
    #[must_use]
    pub fn order_by_desc(mut self, cols: &[&str]) -> Self {
        self.order_by.extend(cols.iter().map(|c| format!("{} DESC", quote(c))));
        self
    }

    /// Adds one ORDER BY column with an explicit direction.
    #[must_use]
    pub fn order_by_column(mut self, column: &str, descending: bool) -> Self {
        if descending {
            self.order_by.push(format!("{} DESC", quote(column)));
        } else {
            self.order_by.push(quote(column));
        }
        self
    }

    /// Adds a LIMIT clause.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Adds an OFFSET clause.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Adds a row locking clause. Spanner drops it when rendering.
    #[must_use]
    pub fn lock(mut self, locking: Locking) -> Self {
        self.locking = Some(locking);
        self
    }

    /// Builds the SELECT statement.
    #[must_use]
    pub fn build(self) -> Statement {
        let mut sql = String::from("SELECT ");
        let mut params = vec![];

        if self.distinct {
            sql.push_str("DISTINCT ");
        }

        match &self.columns {
            Projection::Columns(cols) if !cols.is_empty() => sql.push_str(&quote_list(cols)),
            Projection::Raw(raw) => sql.push_str(raw),
            _ => sql.push('*'),
        }

        if let Some(ref table) = self.from {
            sql.push_str(" FROM ");
            sql.push_str(&quote(table));
        }

        if let Some(where_expr) = self.where_clause {
            let (where_sql, where_params) = where_expr.build();
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params.extend(where_params);
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&quote_list(&self.group_by));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(","));
        }

        // GoogleSQL only accepts OFFSET after a LIMIT.
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {offset}", i64::MAX)),
            (None, None) => {}
        }

        if let Some(locking) = &self.locking {
            if let Some(lock_sql) = locking.to_sql_for(&SpannerDialect::new()) {
                sql.push(' ');
                sql.push_str(&lock_sql);
            }
        }

        Statement {
            sql: bind_vars(&sql),
            params,
        }
    }
}
