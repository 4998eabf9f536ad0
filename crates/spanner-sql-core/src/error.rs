//! Error types for the dialect and the schema layer.

use thiserror::Error;

/// Errors raised when a statement uses something Spanner cannot express.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DialectError {
    /// The clause or statement has no Spanner equivalent.
    #[error("{0} is not supported by Cloud Spanner")]
    Unsupported(&'static str),

    /// A statement was built with inconsistent parts.
    #[error("invalid statement: {0}")]
    InvalidStatement(String),
}

/// Errors raised while reflecting a model or generating DDL for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The Rust type of a field has no Spanner column type.
    #[error("field `{table}.{column}` has unsupported type `{rust_type}`; set an explicit column type")]
    UnsupportedType {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// The Rust type as written on the struct.
        rust_type: String,
    },

    /// Two fields map to the same column.
    #[error("duplicate column `{column}` in table `{table}`")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// An index or key names a column that the model does not have.
    #[error("`{context}` references unknown column `{column}` in table `{table}`")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Index, key or constraint that referenced the column.
        context: String,
    },

    /// Interleaved tables must declare a primary key.
    #[error("table `{0}` is interleaved but has no primary key")]
    InterleaveWithoutPrimaryKey(String),

    /// The operation has no Spanner DDL equivalent.
    #[error("{0} is not supported by Cloud Spanner DDL")]
    Unsupported(&'static str),
}
