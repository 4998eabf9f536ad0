//! Manager for database access.
//!
//! The Manager is the entry point for reading and writing the rows of one
//! model. Writes follow what Spanner accepts:
//! - INSERT leaves out zero-valued keys and defaulted columns so the
//!   database fills them in, and reads them back with `THEN RETURN`
//!   together with generated columns
//! - there is no upsert; `first_or_create` selects, then inserts
//! - UPDATE and DELETE address rows by their full primary key
//! - models with a `deleted_at` column are soft-deleted

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use spanner_sql_core::builder::{col, Delete, ExprBuilder, Insert, SqlValue, ToSqlValue, Update};
use spanner_sql_core::clause::OnConflict;
use spanner_sql_core::schema::{FieldType, ModelSchema, Record};
use spanner_sql_core::{Client, Statement};
use tracing::{debug, warn};

use crate::db::Db;
use crate::error::{OrmError, Result};
use crate::model::{soft_delete_column, Model};
use crate::query::Q;
use crate::queryset::QuerySet;

/// A Manager provides database access methods for a Model.
///
/// Each Model has a default Manager accessible via `Model::objects()`.
/// Managers are lightweight and can be created freely.
#[derive(Debug)]
pub struct Manager<M: Model> {
    _marker: PhantomData<M>,
}

impl<M: Model> Clone for Manager<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Model> Copy for Manager<M> {}

impl<M: Model> Default for Manager<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Manager<M> {
    /// Creates a new Manager.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Returns a QuerySet for all objects.
    #[must_use]
    pub const fn all(&self) -> QuerySet<M> {
        QuerySet::new()
    }

    /// Returns a QuerySet filtered by the given Q expression.
    #[must_use]
    pub fn filter(&self, q: Q) -> QuerySet<M> {
        QuerySet::new().filter(q)
    }

    /// Returns a QuerySet excluding objects matching the Q expression.
    #[must_use]
    pub fn exclude(&self, q: Q) -> QuerySet<M> {
        QuerySet::new().exclude(q)
    }

    /// Returns a QuerySet with no results.
    #[must_use]
    pub fn none(&self) -> QuerySet<M> {
        QuerySet::none()
    }

    /// Returns a QuerySet over all objects, soft-deleted ones included.
    #[must_use]
    pub const fn unscoped(&self) -> QuerySet<M> {
        QuerySet::new().unscoped()
    }

    /// Gets an object by its single-column primary key.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::NotFound` when no row has the key, and
    /// `OrmError::InvalidField` for models with a composite key.
    pub async fn get<C: Client, V: ToSqlValue>(&self, db: &Db<C>, pk: V) -> Result<M> {
        self.get_or_none(db, pk).await?.ok_or(OrmError::NotFound)
    }

    /// Gets an object by its single-column primary key, returning None if not found.
    ///
    /// # Errors
    ///
    /// See [`get`](Self::get).
    pub async fn get_or_none<C: Client, V: ToSqlValue>(&self, db: &Db<C>, pk: V) -> Result<Option<M>> {
        let schema = M::schema()?;
        let key = match schema.primary_key.as_slice() {
            [key] => key.as_str(),
            [] => return Err(OrmError::MissingPrimaryKey(schema.table.clone())),
            _ => {
                return Err(OrmError::InvalidField(format!(
                    "`{}` has a composite primary key; filter on its columns",
                    schema.table
                )))
            }
        };
        self.filter(Q::eq(key, pk)).first(db).await
    }

    /// Returns the count of all objects.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn count<C: Client>(&self, db: &Db<C>) -> Result<i64> {
        self.all().count(db).await
    }

    /// Returns whether any objects exist.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn exists<C: Client>(&self, db: &Db<C>) -> Result<bool> {
        self.all().exists(db).await
    }

    /// Returns the first object by primary key, or None if no objects exist.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn first<C: Client>(&self, db: &Db<C>) -> Result<Option<M>> {
        self.all().first(db).await
    }

    /// Returns the last object by primary key, or None if no objects exist.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn last<C: Client>(&self, db: &Db<C>) -> Result<Option<M>> {
        let schema = M::schema()?;
        let order: Vec<String> = schema.primary_key.iter().map(|k| format!("-{k}")).collect();
        let order: Vec<&str> = order.iter().map(String::as_str).collect();
        self.all().order_by_clear(&order).first(db).await
    }

    /// Inserts `model` and copies the values the database generated back
    /// onto it.
    ///
    /// Unset `created_at` and `updated_at` timestamps are filled in first.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged, e.g. `AlreadyExists` for a
    /// duplicate key.
    pub async fn create<C: Client>(&self, db: &Db<C>, model: &mut M) -> Result<()> {
        let schema = M::schema()?;
        stamp_new(&schema, model, Utc::now())?;
        let parts = InsertParts::of(&schema, model);
        let statement = parts.statement(&schema.table, vec![parts.values.clone()]);
        run_insert(db, &statement, &parts.returning, std::slice::from_mut(model)).await?;
        Ok(())
    }

    /// Inserts `models` with one multi-row INSERT per batch of
    /// `batch_size` rows and returns the number of inserted rows.
    ///
    /// Rows of a batch that leave out different columns are split into
    /// separate statements.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged; earlier batches stay inserted.
    pub async fn create_in_batches<C: Client>(
        &self,
        db: &Db<C>,
        models: &mut [M],
        batch_size: usize,
    ) -> Result<u64> {
        let schema = M::schema()?;
        let mut inserted = 0;
        for batch in models.chunks_mut(batch_size.max(1)) {
            let now = Utc::now();
            for model in batch.iter_mut() {
                stamp_new(&schema, model, now)?;
            }
            let parts: Vec<InsertParts> = batch.iter().map(|m| InsertParts::of(&schema, m)).collect();
            let mut start = 0;
            while start < parts.len() {
                let end = (start + 1..parts.len())
                    .find(|&i| !parts[i].same_shape(&parts[start]))
                    .unwrap_or(parts.len());
                let rows = parts[start..end].iter().map(|p| p.values.clone()).collect();
                let statement = parts[start].statement(&schema.table, rows);
                inserted +=
                    run_insert(db, &statement, &parts[start].returning, &mut batch[start..end]).await?;
                start = end;
            }
            debug!(table = %schema.table, rows = batch.len(), "Inserted batch");
        }
        Ok(inserted)
    }

    /// Writes every writable column of `model` to the row with its primary
    /// key and returns the number of updated rows.
    ///
    /// A model whose key columns are all unset is inserted instead.
    /// Generated columns are read back with `THEN RETURN`.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::MissingPrimaryKey` for models without a key and
    /// client errors unchanged.
    pub async fn save<C: Client>(&self, db: &Db<C>, model: &mut M) -> Result<u64> {
        let schema = M::schema()?;
        if schema.primary_key.is_empty() {
            return Err(OrmError::MissingPrimaryKey(schema.table));
        }
        let unsaved = schema
            .primary_key
            .iter()
            .all(|k| model.value_of(k).is_none_or(|v| v.is_zero()));
        if unsaved {
            self.create(db, model).await?;
            return Ok(1);
        }

        let filter = key_filter(&schema, model)?;
        touch(&schema, model, "updated_at", Utc::now(), true)?;
        let values = model.values();
        let mut assignments = schema
            .fields
            .iter()
            .filter(|f| f.is_writable() && !f.primary_key)
            .filter_map(|f| values.iter().find(|(c, _)| *c == f.name));
        let Some((column, value)) = assignments.next() else {
            return Ok(0);
        };
        let mut update = Update::new().table(&schema.table).set(column, value.clone());
        for (column, value) in assignments {
            update = update.and_set(column, value.clone());
        }
        let returning = read_only_columns(&schema);
        if !returning.is_empty() {
            update = update.then_return(&returning);
        }
        let statement = update.where_clause(filter).build();

        if returning.is_empty() {
            return db.execute(&statement).await;
        }
        let rows = db.query(&statement).await?;
        if let Some(row) = rows.first() {
            model.apply_row(row)?;
        }
        Ok(row_count(rows.len()))
    }

    /// Sets one column of `model`, in memory and in its row, and returns
    /// the number of updated rows. `updated_at` is refreshed along with it.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::InvalidField` for unknown or read-only columns and
    /// client errors unchanged.
    pub async fn update_column<C: Client, V: ToSqlValue>(
        &self,
        db: &Db<C>,
        model: &mut M,
        column: &str,
        value: V,
    ) -> Result<u64> {
        let schema = M::schema()?;
        if !schema.field(column).is_some_and(|f| f.is_writable()) {
            return Err(OrmError::InvalidField(String::from(column)));
        }
        let filter = key_filter(&schema, model)?;
        let value = value.to_sql_value();
        model.set_value(column, value.clone())?;

        let mut update = Update::new().table(&schema.table).set(column, value);
        if column != "updated_at" {
            if let Some(now) = touch(&schema, model, "updated_at", Utc::now(), true)? {
                update = update.and_set("updated_at", now);
            }
        }
        db.execute(&update.where_clause(filter).build()).await
    }

    /// Deletes the row of `model` and returns the number of deleted rows.
    ///
    /// For models with a soft-delete column the row is kept and the column
    /// set to now, unless it was already deleted. Use
    /// [`hard_delete`](Self::hard_delete) to remove the row.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::MissingPrimaryKey` for models without a key and
    /// client errors unchanged.
    pub async fn delete<C: Client>(&self, db: &Db<C>, model: &M) -> Result<u64> {
        let schema = M::schema()?;
        let Some(column) = soft_delete_column(&schema) else {
            return self.hard_delete(db, model).await;
        };
        let filter = key_filter(&schema, model)?.and(col(column).is_null());
        let statement = Update::new()
            .table(&schema.table)
            .set(column, SqlValue::Timestamp(Utc::now()))
            .where_clause(filter)
            .build();
        db.execute(&statement).await
    }

    /// Removes the row of `model` and returns the number of deleted rows.
    ///
    /// Interleaved child rows removed by `ON DELETE CASCADE` are not counted.
    ///
    /// # Errors
    ///
    /// See [`delete`](Self::delete).
    pub async fn hard_delete<C: Client>(&self, db: &Db<C>, model: &M) -> Result<u64> {
        let schema = M::schema()?;
        let statement = Delete::new()
            .from(&schema.table)
            .where_clause(key_filter(&schema, model)?)
            .build();
        db.execute(&statement).await
    }

    async fn find_or_init<C: Client>(&self, db: &Db<C>, q: Q, init: M) -> Result<(M, bool)> {
        if let Some(found) = self.filter(q.clone()).first(db).await? {
            return Ok((found, true));
        }
        let mut model = init;
        for (column, value) in q.equalities() {
            model.set_value(column, value.clone())?;
        }
        Ok((model, false))
    }

    /// Returns the first object matching `q`, or `init` with the columns
    /// that `q` compares for equality set from it. Nothing is written.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn first_or_init<C: Client>(&self, db: &Db<C>, q: Q, init: M) -> Result<M> {
        Ok(self.find_or_init(db, q, init).await?.0)
    }

    /// Like [`first_or_init`](Self::first_or_init), but inserts the
    /// initialized object when nothing matched.
    ///
    /// This is a read followed by an INSERT, not an upsert; run it in a
    /// transaction to keep the two consistent.
    ///
    /// # Errors
    ///
    /// Returns client errors unchanged.
    pub async fn first_or_create<C: Client>(&self, db: &Db<C>, q: Q, init: M) -> Result<M> {
        let (mut model, found) = self.find_or_init(db, q, init).await?;
        if !found {
            self.create(db, &mut model).await?;
        }
        Ok(model)
    }

    /// Inserts or updates `model` in one statement.
    ///
    /// # Errors
    ///
    /// Always fails: Spanner has no `ON CONFLICT`. Use
    /// [`first_or_create`](Self::first_or_create) or [`save`](Self::save).
    pub fn upsert<C: Client>(&self, db: &Db<C>, model: &M) -> Result<u64> {
        let schema = M::schema()?;
        let parts = InsertParts::of(&schema, model);
        let clause = OnConflict {
            columns: schema.primary_key.clone(),
            do_nothing: false,
            update_columns: parts.columns,
        };
        warn!(table = %schema.table, "Upsert requested");
        db.dialector().on_conflict(&clause).map(|_| 0)
    }
}

/// Columns, values and returned columns of one INSERT row.
#[derive(Debug, Clone)]
struct InsertParts {
    columns: Vec<String>,
    values: Vec<SqlValue>,
    returning: Vec<String>,
}

impl InsertParts {
    fn of<M: Record>(schema: &ModelSchema, model: &M) -> Self {
        let model_values = model.values();
        let mut parts = Self {
            columns: vec![],
            values: vec![],
            returning: vec![],
        };
        for field in &schema.fields {
            let Some((_, value)) = model_values.iter().find(|(c, _)| *c == field.name) else {
                continue;
            };
            let filled_by_database =
                value.is_zero() && (field.is_auto_increment() || field.default.is_some());
            if !field.is_writable() || filled_by_database {
                parts.returning.push(field.name.clone());
            } else {
                parts.columns.push(field.name.clone());
                parts.values.push(value.clone());
            }
        }
        parts
    }

    fn same_shape(&self, other: &Self) -> bool {
        self.columns == other.columns && self.returning == other.returning
    }

    fn statement(&self, table: &str, rows: Vec<Vec<SqlValue>>) -> Statement {
        let insert = Insert::new().into_table(table).columns(&self.columns);
        let insert = if self.returning.is_empty() {
            insert
        } else {
            insert.then_return(&self.returning)
        };
        insert.values_many(rows).build()
    }
}

/// Runs an INSERT, applying returned rows onto `models` in order.
async fn run_insert<C: Client, M: Record>(
    db: &Db<C>,
    statement: &Statement,
    returning: &[String],
    models: &mut [M],
) -> Result<u64> {
    if returning.is_empty() {
        return db.execute(statement).await;
    }
    let rows = db.query(statement).await?;
    for (model, row) in models.iter_mut().zip(&rows) {
        model.apply_row(row)?;
    }
    Ok(row_count(rows.len()))
}

fn row_count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

fn read_only_columns(schema: &ModelSchema) -> Vec<String> {
    schema
        .fields
        .iter()
        .filter(|f| !f.is_writable())
        .map(|f| f.name.clone())
        .collect()
}

/// Builds `key1 = @p1 AND key2 = @p2 ...` from the primary key of `model`.
fn key_filter<M: Record>(schema: &ModelSchema, model: &M) -> Result<ExprBuilder> {
    schema
        .primary_key
        .iter()
        .map(|key| col(key).eq(model.value_of(key).unwrap_or(SqlValue::Null)))
        .reduce(ExprBuilder::and)
        .ok_or_else(|| OrmError::MissingPrimaryKey(schema.table.clone()))
}

/// Fills unset `created_at` and `updated_at` of a new row with the same
/// instant.
fn stamp_new<M: Record>(schema: &ModelSchema, model: &mut M, now: DateTime<Utc>) -> Result<()> {
    touch(schema, model, "created_at", now, false)?;
    touch(schema, model, "updated_at", now, false)?;
    Ok(())
}

/// Sets the timestamp `column` to `now` when it is unset, or always when
/// `force` is set. Returns the value written, if any.
fn touch<M: Record>(
    schema: &ModelSchema,
    model: &mut M,
    column: &str,
    now: DateTime<Utc>,
    force: bool,
) -> Result<Option<SqlValue>> {
    let managed = schema
        .field(column)
        .is_some_and(|f| f.field_type == FieldType::Timestamp && f.is_writable());
    if !managed {
        return Ok(None);
    }
    if !force && model.value_of(column).is_some_and(|v| !v.is_zero()) {
        return Ok(None);
    }
    let now = SqlValue::Timestamp(now);
    model.set_value(column, now.clone())?;
    Ok(Some(now))
}
