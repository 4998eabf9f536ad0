//! Type-safe CREATE TABLE builder using the typestate pattern.
//!
//! Every Spanner table needs a name, at least one column and a PRIMARY KEY
//! clause, so `build()` is only available once all three were given.

use std::marker::PhantomData;

use super::column_builder::ColumnDefinition;
use super::operation::CreateTableOp;
use crate::schema::{ForeignKeySchema, Interleave, OnDelete};

/// Marker: table has no name set.
#[derive(Debug, Clone, Copy)]
pub struct NoName;

/// Marker: table has a name set.
#[derive(Debug, Clone, Copy)]
pub struct HasName;

/// Marker: table has no columns.
#[derive(Debug, Clone, Copy)]
pub struct NoColumns;

/// Marker: table has at least one column.
#[derive(Debug, Clone, Copy)]
pub struct HasColumns;

/// Marker: no primary key declared.
#[derive(Debug, Clone, Copy)]
pub struct NoKey;

/// Marker: primary key declared.
#[derive(Debug, Clone, Copy)]
pub struct HasKey;

/// Type-safe CREATE TABLE builder.
///
/// # Example
///
/// ```rust
/// use spanner_sql_core::migrations::{int64, string, CreateTableBuilder, SpannerDdl, MigrationDialect, Operation};
///
/// let op = CreateTableBuilder::new()
///     .name("venues")
///     .column(int64("id").not_null().build())
///     .column(string("name", Some(100)).build())
///     .primary_key(&["id"])
///     .build();
///
/// let sql = SpannerDdl::new().generate_sql(&Operation::from(op)).unwrap();
/// assert_eq!(
///     sql,
///     "CREATE TABLE `venues` (`id` INT64 NOT NULL,`name` STRING(100)) PRIMARY KEY (`id`)"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct CreateTableBuilder<Name, Cols, Key> {
    name: Option<String>,
    columns: Vec<ColumnDefinition>,
    foreign_keys: Vec<ForeignKeySchema>,
    primary_key: Vec<String>,
    interleave: Option<Interleave>,
    _state: PhantomData<(Name, Cols, Key)>,
}

impl Default for CreateTableBuilder<NoName, NoColumns, NoKey> {
    fn default() -> Self {
        Self::new()
    }
}

impl CreateTableBuilder<NoName, NoColumns, NoKey> {
    /// Creates a new `CreateTableBuilder`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            primary_key: Vec::new(),
            interleave: None,
            _state: PhantomData,
        }
    }
}

impl<Name, Cols, Key> CreateTableBuilder<Name, Cols, Key> {
    fn transition<N, C, K>(self) -> CreateTableBuilder<N, C, K> {
        CreateTableBuilder {
            name: self.name,
            columns: self.columns,
            foreign_keys: self.foreign_keys,
            primary_key: self.primary_key,
            interleave: self.interleave,
            _state: PhantomData,
        }
    }

    /// Adds a foreign key constraint.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeySchema) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Interleaves the table in `parent`.
    #[must_use]
    pub fn interleave_in(mut self, parent: impl Into<String>, on_delete: OnDelete) -> Self {
        self.interleave = Some(Interleave {
            parent: parent.into(),
            on_delete,
        });
        self
    }
}

impl<Cols, Key> CreateTableBuilder<NoName, Cols, Key> {
    /// Sets the table name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> CreateTableBuilder<HasName, Cols, Key> {
        self.name = Some(name.into());
        self.transition()
    }
}

impl<Name, Cols, Key> CreateTableBuilder<Name, Cols, Key> {
    /// Adds a column to the table.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> CreateTableBuilder<Name, HasColumns, Key> {
        self.columns.push(column);
        self.transition()
    }
}

impl<Name> CreateTableBuilder<Name, HasColumns, NoKey> {
    /// Sets the primary key columns.
    #[must_use]
    pub fn primary_key<S: AsRef<str>>(mut self, columns: &[S]) -> CreateTableBuilder<Name, HasColumns, HasKey> {
        self.primary_key = columns.iter().map(|c| String::from(c.as_ref())).collect();
        self.transition()
    }
}

impl CreateTableBuilder<HasName, HasColumns, HasKey> {
    /// Builds the operation.
    #[must_use]
    pub fn build(self) -> CreateTableOp {
        CreateTableOp {
            name: self.name.unwrap_or_default(),
            columns: self.columns,
            foreign_keys: self.foreign_keys,
            primary_key: self.primary_key,
            interleave: self.interleave,
        }
    }
}
