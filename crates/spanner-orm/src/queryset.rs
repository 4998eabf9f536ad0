//! QuerySet implementation for lazy, chainable database queries.
//!
//! QuerySets are lazy - they don't execute until you call a method that
//! evaluates the query (like `execute()`, `first()`, etc.).

use std::future::Future;
use std::marker::PhantomData;

use chrono::Utc;
use spanner_sql_core::builder::{
    col, Delete, ExprBuilder, FromSqlValue, Select, SqlValue, ToSqlValue, Update,
};
use spanner_sql_core::clause::Locking;
use spanner_sql_core::schema::ModelSchema;
use spanner_sql_core::{Client, Statement};
use tracing::debug;

use crate::db::Db;
use crate::error::{OrmError, Result};
use crate::model::{soft_delete_column, Model};
use crate::query::{FilterExpr, Q};

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

/// An ordering specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to order by
    pub column: String,
    /// Order direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Creates a new ascending order specification.
    #[must_use]
    pub fn asc(column: &str) -> Self {
        Self {
            column: String::from(column),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a new descending order specification.
    #[must_use]
    pub fn desc(column: &str) -> Self {
        Self {
            column: String::from(column),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses an order specification.
    ///
    /// Prefix with `-` for descending order.
    /// Example: `"-created_at"` for descending, `"name"` for ascending.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        spec.strip_prefix('-')
            .map_or_else(|| Self::asc(spec), Self::desc)
    }
}

/// A lazy, chainable query builder for database operations.
///
/// QuerySets are immutable - each method returns a new QuerySet with the
/// modification applied.
///
/// # Example
///
/// ```rust
/// use spanner_orm::{Model, StandardModel, Table, Q};
///
/// #[derive(Debug, Default, Table)]
/// pub struct Singer {
///     #[column(embed)]
///     pub base: StandardModel,
///     pub last_name: String,
///     pub active: bool,
/// }
///
/// let stmt = Singer::objects()
///     .filter(Q::eq("active", true))
///     .order_by("last_name")
///     .limit(5)
///     .only(&["id", "last_name"])
///     .build_select()
///     .unwrap();
/// assert_eq!(
///     stmt.sql,
///     "SELECT `id`,`last_name` FROM `singers` WHERE `active` = @p1 AND `deleted_at` IS NULL \
///      ORDER BY `last_name` LIMIT 5"
/// );
/// ```
#[derive(Debug)]
pub struct QuerySet<M: Model> {
    /// Filter expressions (combined with AND)
    filters: Vec<FilterExpr>,
    /// Exclude expressions (each negated, then combined with AND)
    excludes: Vec<FilterExpr>,
    /// Ordering specifications
    order_by: Vec<OrderBy>,
    /// LIMIT clause
    limit: Option<u64>,
    /// OFFSET clause
    offset: Option<u64>,
    /// Columns to select (None = all)
    select_columns: Option<Vec<String>>,
    /// Whether to select distinct rows
    distinct: bool,
    /// Requested row lock
    locking: Option<Locking>,
    /// Whether soft-deleted rows are included
    unscoped: bool,
    _marker: PhantomData<M>,
}

// Manual Clone implementation to avoid M: Clone bound
impl<M: Model> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
            excludes: self.excludes.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            select_columns: self.select_columns.clone(),
            distinct: self.distinct,
            locking: self.locking.clone(),
            unscoped: self.unscoped,
            _marker: PhantomData,
        }
    }
}

impl<M: Model> Default for QuerySet<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> QuerySet<M> {
    /// Creates a new empty QuerySet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            filters: Vec::new(),
            excludes: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            select_columns: None,
            distinct: false,
            locking: None,
            unscoped: false,
            _marker: PhantomData,
        }
    }

    /// Adds a filter to the QuerySet.
    ///
    /// Multiple filters are combined with AND.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        self.filters.push(q.into_expr());
        self
    }

    /// Adds an exclude filter to the QuerySet.
    ///
    /// Excluded rows are those that match the filter.
    #[must_use]
    pub fn exclude(mut self, q: Q) -> Self {
        self.excludes.push(q.into_expr());
        self
    }

    /// Adds an ordering column. Use a `-` prefix for descending order.
    #[must_use]
    pub fn order_by(mut self, spec: &str) -> Self {
        self.order_by.push(OrderBy::parse(spec));
        self
    }

    /// Clears all ordering and sets new ordering.
    #[must_use]
    pub fn order_by_clear(mut self, specs: &[&str]) -> Self {
        self.order_by = specs.iter().map(|s| OrderBy::parse(s)).collect();
        self
    }

    /// Limits the number of results.
    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Sets the offset for pagination.
    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Selects specific columns; the others keep their default value.
    #[must_use]
    pub fn only(mut self, columns: &[&str]) -> Self {
        self.select_columns = Some(columns.iter().map(|s| String::from(*s)).collect());
        self
    }

    /// Makes the query return distinct rows.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Requests `FOR UPDATE`.
    ///
    /// Spanner has no locking clause: with `disable_locking_clause` it is
    /// dropped, otherwise running the query fails.
    #[must_use]
    pub fn for_update(mut self) -> Self {
        self.locking = Some(Locking::for_update());
        self
    }

    /// Requests `FOR SHARE`; handled like [`for_update`](Self::for_update).
    #[must_use]
    pub fn for_share(mut self) -> Self {
        self.locking = Some(Locking::for_share());
        self
    }

    /// Includes soft-deleted rows, and makes [`delete`](Self::delete) remove
    /// rows instead of marking them.
    #[must_use]
    pub const fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    /// Returns a new QuerySet that is a copy of this one.
    #[must_use]
    pub fn all(&self) -> Self {
        self.clone()
    }

    /// Returns a QuerySet with no results.
    #[must_use]
    pub fn none() -> Self {
        Self::new().filter(Q::raw("FALSE", vec![]))
    }

    /// The soft-delete column this QuerySet hides rows by, if any.
    fn scope<'a>(&self, schema: &'a ModelSchema) -> Option<&'a str> {
        if self.unscoped {
            None
        } else {
            soft_delete_column(schema)
        }
    }

    /// Builds the WHERE expression from filters, excludes and the
    /// soft-delete scope.
    fn where_expr(&self, schema: &ModelSchema) -> Option<ExprBuilder> {
        let scope = self.scope(schema);
        let multiple = self.filters.len() + self.excludes.len() + usize::from(scope.is_some()) > 1;
        let conditions = self
            .filters
            .iter()
            .map(|f| {
                let expr = f.to_expr();
                if multiple && f.is_compound() {
                    expr.paren()
                } else {
                    expr
                }
            })
            .chain(self.excludes.iter().map(|e| e.to_expr().not()))
            .chain(scope.map(|column| col(column).is_null()));
        conditions.reduce(ExprBuilder::and)
    }

    /// Builds the SELECT statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be reflected.
    pub fn build_select(&self) -> Result<Statement> {
        let schema = M::schema()?;
        let select = match &self.select_columns {
            Some(cols) => Select::new().columns(cols),
            None => Select::new().columns(&schema.column_names()),
        };
        let mut select = select.from(&schema.table);
        if let Some(expr) = self.where_expr(&schema) {
            select = select.where_clause(expr);
        }
        if self.distinct {
            select = select.distinct();
        }
        for order in &self.order_by {
            select = select.order_by_column(&order.column, order.direction == OrderDirection::Desc);
        }
        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }
        if let Some(offset) = self.offset {
            select = select.offset(offset);
        }
        if let Some(locking) = &self.locking {
            select = select.lock(locking.clone());
        }
        Ok(select.build())
    }

    /// Builds the COUNT statement.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be reflected.
    pub fn build_count(&self) -> Result<Statement> {
        let schema = M::schema()?;
        let mut select = Select::new().raw_columns("COUNT(*)").from(&schema.table);
        if let Some(expr) = self.where_expr(&schema) {
            select = select.where_clause(expr);
        }
        Ok(select.build())
    }

    /// Builds the DELETE statement.
    ///
    /// Models with a soft-delete column get an UPDATE setting it to now.
    /// Spanner requires a WHERE clause, so an unfiltered QuerySet deletes
    /// with `WHERE TRUE`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be reflected.
    pub fn build_delete(&self) -> Result<Statement> {
        let schema = M::schema()?;
        let filter = self.where_expr(&schema);
        if let Some(column) = self.scope(&schema) {
            let update = Update::new()
                .table(&schema.table)
                .set(column, SqlValue::Timestamp(Utc::now()));
            return Ok(match filter {
                Some(expr) => update.where_clause(expr).build(),
                None => update.all_rows().build(),
            });
        }
        let delete = Delete::new().from(&schema.table);
        Ok(match filter {
            Some(expr) => delete.where_clause(expr).build(),
            None => delete.all_rows().build(),
        })
    }

    /// Builds an UPDATE statement setting `column` on every matching row.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::InvalidField` for columns the model does not have.
    pub fn build_update<V: ToSqlValue>(&self, column: &str, value: V) -> Result<Statement> {
        let schema = M::schema()?;
        if schema.field(column).is_none() {
            return Err(OrmError::InvalidField(String::from(column)));
        }
        let update = Update::new().table(&schema.table).set(column, value);
        let statement = match self.where_expr(&schema) {
            Some(expr) => update.where_clause(expr).build(),
            None => update.all_rows().build(),
        };
        Ok(statement)
    }

    fn check_locking<C: Client>(&self, db: &Db<C>) -> Result<()> {
        if let Some(locking) = &self.locking {
            db.dialector().locking(locking)?;
        }
        Ok(())
    }

    /// Executes the query and returns all matching rows.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged, and row errors for rows that do not
    /// fit the model.
    pub async fn execute<C: Client>(&self, db: &Db<C>) -> Result<Vec<M>> {
        self.check_locking(db)?;
        let rows = db.query(&self.build_select()?).await?;
        rows.iter()
            .map(|row| M::from_row(row).map_err(OrmError::from))
            .collect()
    }

    /// Returns the first matching row, or None if no rows match.
    ///
    /// Without an explicit ordering the rows are ordered by primary key.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn first<C: Client>(&self, db: &Db<C>) -> Result<Option<M>> {
        let mut qs = self.clone().limit(1);
        if qs.order_by.is_empty() {
            qs.order_by = M::schema()?.primary_key.iter().map(|c| OrderBy::asc(c)).collect();
        }
        Ok(qs.execute(db).await?.into_iter().next())
    }

    /// Returns exactly one matching row.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::NotFound` when nothing matches and
    /// `OrmError::MultipleObjectsReturned` when more than one row does.
    pub async fn get<C: Client>(&self, db: &Db<C>) -> Result<M> {
        let mut results = self.clone().limit(2).execute(db).await?.into_iter();
        match (results.next(), results.next()) {
            (Some(model), None) => Ok(model),
            (None, _) => Err(OrmError::NotFound),
            (Some(_), Some(_)) => Err(OrmError::MultipleObjectsReturned),
        }
    }

    /// Returns the count of matching rows.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn count<C: Client>(&self, db: &Db<C>) -> Result<i64> {
        let rows = db.query(&self.build_count()?).await?;
        let value = rows
            .first()
            .and_then(|row| row.values().first().cloned())
            .unwrap_or(SqlValue::Int64(0));
        Ok(i64::from_sql_value(value)?)
    }

    /// Returns whether any rows match the query.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn exists<C: Client>(&self, db: &Db<C>) -> Result<bool> {
        Ok(self.count(db).await? > 0)
    }

    /// Sets `column` to `value` on all matching rows and returns the count
    /// of updated rows.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::InvalidField` for unknown columns and client
    /// errors unchanged.
    pub async fn update<C: Client, V: ToSqlValue>(
        &self,
        db: &Db<C>,
        column: &str,
        value: V,
    ) -> Result<u64> {
        db.execute(&self.build_update(column, value)?).await
    }

    /// Deletes all matching rows and returns the count of deleted rows.
    ///
    /// Rows of models with a soft-delete column are only marked, unless
    /// the QuerySet is [`unscoped`](Self::unscoped). Child rows removed by
    /// `ON DELETE CASCADE` are not counted.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn delete<C: Client>(&self, db: &Db<C>) -> Result<u64> {
        db.execute(&self.build_delete()?).await
    }

    /// Reads the matching rows in batches of `batch_size`, ordered by
    /// primary key, and hands each batch to `f` with its 1-based number.
    /// Returns the number of rows read.
    ///
    /// Each batch continues after the key of the previous batch's last row,
    /// so rows that `f` updates are neither skipped nor read twice. Any
    /// ordering, limit or offset of the QuerySet is replaced.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::MissingPrimaryKey` for models without a key,
    /// client errors unchanged, and the first error `f` returns.
    pub async fn find_in_batches<C, F, Fut>(&self, db: &Db<C>, batch_size: u64, mut f: F) -> Result<u64>
    where
        C: Client,
        F: FnMut(Vec<M>, usize) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let schema = M::schema()?;
        if schema.primary_key.is_empty() {
            return Err(OrmError::MissingPrimaryKey(schema.table));
        }
        let size = batch_size.max(1);
        let mut base = self.clone().limit(size);
        base.offset = None;
        base.order_by = schema.primary_key.iter().map(|k| OrderBy::asc(k)).collect();

        let mut read = 0;
        let mut batch = 0;
        let mut last_key: Option<Vec<SqlValue>> = None;
        loop {
            let qs = match last_key.as_deref().and_then(|key| after_key(&schema.primary_key, key)) {
                Some(after) => base.clone().filter(after),
                None => base.clone(),
            };
            let rows = qs.execute(db).await?;
            let len = u64::try_from(rows.len()).unwrap_or(u64::MAX);
            if len == 0 {
                break;
            }
            last_key = rows.last().map(|model| {
                schema
                    .primary_key
                    .iter()
                    .map(|k| model.value_of(k).unwrap_or(SqlValue::Null))
                    .collect()
            });
            batch += 1;
            read += len;
            debug!(table = %schema.table, batch, rows = len, "Read batch");
            f(rows, batch).await?;
            if len < size {
                break;
            }
        }
        Ok(read)
    }
}

/// Rows whose key sorts after `key`: `a > x OR (a = x AND b > y) ...`.
fn after_key(columns: &[String], key: &[SqlValue]) -> Option<Q> {
    columns.iter().zip(key).rev().fold(None, |rest, (column, value)| {
        let greater = Q::gt(column, value.clone());
        Some(match rest {
            None => greater,
            Some(rest) => greater.or(Q::eq(column, value.clone()).and(rest)),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanner_sql_core::builder::value::SqlValue as Value;
    use spanner_sql_core::schema::{FieldSchema, ModelSchema, Record, Reflect, Row, RowError, Table};
    use spanner_sql_core::SchemaError;

    // Mock model for testing query building
    #[derive(Debug, Default)]
    struct TestModel;

    struct TestModelTable;

    impl Table for TestModelTable {
        type Row = TestModel;
        const NAME: &'static str = "test_models";
    }

    impl Reflect for TestModel {
        type Table = TestModelTable;
        const TABLE: &'static str = "test_models";

        fn schema() -> std::result::Result<ModelSchema, SchemaError> {
            ModelSchema::builder("TestModel")
                .field(FieldSchema::new("id", "i64"))
                .field(FieldSchema::new("name", "String"))
                .field(FieldSchema::new("email", "String"))
                .field(FieldSchema::new("created_at", "DateTime<Utc>"))
                .build()
        }
    }

    impl Record for TestModel {
        fn values(&self) -> Vec<(&'static str, Value)> {
            vec![]
        }

        fn from_row(_row: &Row) -> std::result::Result<Self, RowError> {
            Ok(Self)
        }

        fn set_value(&mut self, _column: &str, _value: Value) -> std::result::Result<bool, RowError> {
            Ok(false)
        }
    }

    fn select(qs: &QuerySet<TestModel>) -> (String, Vec<Value>) {
        let stmt = qs.build_select().unwrap();
        (stmt.sql, stmt.params)
    }

    #[test]
    fn test_basic_select() {
        let (sql, params) = select(&QuerySet::new());
        assert_eq!(
            sql,
            "SELECT `id`,`name`,`email`,`created_at` FROM `test_models`"
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_with_filter() {
        let (sql, params) = select(&QuerySet::new().filter(Q::eq("name", "Alice")));
        assert_eq!(
            sql,
            "SELECT `id`,`name`,`email`,`created_at` FROM `test_models` WHERE `name` = @p1"
        );
        assert_eq!(params, vec![Value::String(String::from("Alice"))]);
    }

    #[test]
    fn test_select_with_multiple_filters() {
        let qs = QuerySet::new()
            .filter(Q::eq("name", "Alice"))
            .filter(Q::gt("id", 10));
        let (sql, params) = select(&qs);
        assert!(sql.ends_with("WHERE `name` = @p1 AND `id` > @p2"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_or_filter_keeps_precedence() {
        let qs = QuerySet::new()
            .filter(Q::eq("name", "Alice").or(Q::eq("name", "Bob")))
            .filter(Q::gt("id", 10));
        let (sql, _) = select(&qs);
        assert!(sql.ends_with("WHERE ((`name` = @p1) OR (`name` = @p2)) AND `id` > @p3"));
    }

    #[test]
    fn test_select_with_exclude() {
        let (sql, params) = select(&QuerySet::new().exclude(Q::eq("name", "Bob")));
        assert!(sql.ends_with("WHERE NOT (`name` = @p1)"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_select_with_order_by() {
        let (sql, _) = select(&QuerySet::new().order_by("-created_at").order_by("name"));
        assert!(sql.ends_with("ORDER BY `created_at` DESC,`name`"));
    }

    #[test]
    fn test_select_with_limit_offset() {
        let (sql, _) = select(&QuerySet::new().limit(10).offset(20));
        assert!(sql.ends_with("LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_select_with_only() {
        let (sql, _) = select(&QuerySet::new().only(&["id", "name"]));
        assert_eq!(sql, "SELECT `id`,`name` FROM `test_models`");
    }

    #[test]
    fn test_select_distinct() {
        let (sql, _) = select(&QuerySet::new().distinct());
        assert!(sql.starts_with("SELECT DISTINCT"));
    }

    #[test]
    fn test_for_update_is_not_rendered() {
        let (sql, _) = select(&QuerySet::new().for_update());
        assert_eq!(
            sql,
            "SELECT `id`,`name`,`email`,`created_at` FROM `test_models`"
        );
    }

    #[test]
    fn test_none() {
        let (sql, _) = select(&QuerySet::none());
        assert!(sql.ends_with("WHERE FALSE"));
    }

    #[test]
    fn test_count() {
        let qs: QuerySet<TestModel> = QuerySet::new().filter(Q::eq("name", "Alice"));
        let stmt = qs.build_count().unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM `test_models` WHERE `name` = @p1");
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn test_delete() {
        let qs: QuerySet<TestModel> = QuerySet::new().filter(Q::eq("name", "Alice"));
        let stmt = qs.build_delete().unwrap();
        assert_eq!(stmt.sql, "DELETE FROM `test_models` WHERE `name` = @p1");
        let stmt = QuerySet::<TestModel>::new().build_delete().unwrap();
        assert_eq!(stmt.sql, "DELETE FROM `test_models` WHERE TRUE");
    }

    #[test]
    fn test_update() {
        let qs: QuerySet<TestModel> = QuerySet::new().filter(Q::gt("id", 5));
        let stmt = qs.build_update("name", "Alice").unwrap();
        assert_eq!(stmt.sql, "UPDATE `test_models` SET `name`=@p1 WHERE `id` > @p2");
        assert!(matches!(
            qs.build_update("nick", "A"),
            Err(OrmError::InvalidField(c)) if c == "nick"
        ));
    }

    #[test]
    fn test_after_key() {
        let columns = vec![String::from("id"), String::from("track_number")];
        let (sql, params) = after_key(&columns, &[Value::Int64(3), Value::Int64(9)])
            .unwrap()
            .build();
        assert_eq!(
            sql,
            "(`id` > ?) OR ((`id` = ?) AND (`track_number` > ?))"
        );
        assert_eq!(params, vec![Value::Int64(3), Value::Int64(3), Value::Int64(9)]);
        assert!(after_key(&[], &[]).is_none());
    }

    #[test]
    fn test_order_by_parsing() {
        assert_eq!(OrderBy::parse("-created_at"), OrderBy::desc("created_at"));
        assert_eq!(OrderBy::parse("name").direction, OrderDirection::Asc);
    }
}
