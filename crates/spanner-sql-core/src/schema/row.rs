//! Rows read back from Spanner and the traits that map them onto models.

use thiserror::Error;

use super::model::ModelSchema;
use super::Table;
use crate::builder::value::{FromSqlValue, SqlValue};
use crate::error::SchemaError;

/// Errors raised while mapping a row onto a model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    /// The row has no such column.
    #[error("column `{0}` not found in row")]
    MissingColumn(String),

    /// The value has an incompatible type.
    #[error("cannot convert {found} to {expected}")]
    Conversion {
        /// Expected Spanner type.
        expected: &'static str,
        /// Actual Spanner type.
        found: &'static str,
    },

    /// The value does not fit the target Rust type.
    #[error("value {value} is out of range for {target}")]
    OutOfRange {
        /// Target Rust type.
        target: &'static str,
        /// The value as text.
        value: String,
    },

    /// A conversion failed for a specific column.
    #[error("column `{column}`: {source}")]
    Column {
        /// Column name.
        column: String,
        /// Underlying error.
        #[source]
        source: Box<RowError>,
    },
}

impl RowError {
    /// Attaches the column the error occurred in.
    #[must_use]
    pub fn in_column(self, column: &str) -> Self {
        match self {
            Self::Column { .. } | Self::MissingColumn(_) => self,
            other => Self::Column {
                column: String::from(column),
                source: Box::new(other),
            },
        }
    }
}

/// A result row: column names and values in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl Row {
    /// Creates a row. Extra values or columns beyond the shorter list are ignored.
    #[must_use]
    pub fn new(columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Creates a row from `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs<S: Into<String>>(pairs: Vec<(S, SqlValue)>) -> Self {
        let (columns, values) = pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self { columns, values }
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values.
    #[must_use]
    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    /// Returns the value of `column`.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Converts the value of `column` into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the column is missing or cannot be converted.
    pub fn try_get<T: FromSqlValue>(&self, column: &str) -> Result<T, RowError> {
        let value = self
            .get(column)
            .ok_or_else(|| RowError::MissingColumn(String::from(column)))?;
        T::from_sql_value(value.clone()).map_err(|e| e.in_column(column))
    }

    /// Like [`Row::try_get`], but a missing column yields `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the column cannot be converted.
    pub fn try_get_or_default<T: FromSqlValue + Default>(&self, column: &str) -> Result<T, RowError> {
        match self.get(column) {
            Some(value) => T::from_sql_value(value.clone()).map_err(|e| e.in_column(column)),
            None => Ok(T::default()),
        }
    }

    /// Iterates over `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len().min(self.values.len())
    }

    /// Returns whether the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Model metadata, implemented by `#[derive(Table)]`.
pub trait Reflect {
    /// The generated table type.
    type Table: Table;

    /// The table name.
    const TABLE: &'static str;

    /// Returns the resolved model schema.
    ///
    /// # Errors
    ///
    /// Returns an error when the model's attributes are inconsistent.
    fn schema() -> Result<ModelSchema, SchemaError>;
}

/// Conversion between a model value and column values.
pub trait Record: Sized {
    /// Returns `(column, value)` for every mapped field, embedded ones included.
    fn values(&self) -> Vec<(&'static str, SqlValue)>;

    /// Builds a model from a row; unmapped fields take their default.
    ///
    /// # Errors
    ///
    /// Returns an error if a column is missing or has an incompatible type.
    fn from_row(row: &Row) -> Result<Self, RowError>;

    /// Sets the field mapped to `column`. Returns `false` for unknown columns.
    ///
    /// # Errors
    ///
    /// Returns an error if the value has an incompatible type.
    fn set_value(&mut self, column: &str, value: SqlValue) -> Result<bool, RowError>;

    /// Returns the value of the field mapped to `column`.
    fn value_of(&self, column: &str) -> Option<SqlValue> {
        self.values()
            .into_iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    /// Copies every known column of `row` onto this model.
    ///
    /// # Errors
    ///
    /// Returns an error if a value has an incompatible type.
    fn apply_row(&mut self, row: &Row) -> Result<(), RowError> {
        for (column, value) in row.iter() {
            self.set_value(column, value.clone())?;
        }
        Ok(())
    }
}
