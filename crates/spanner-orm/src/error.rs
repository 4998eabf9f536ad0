//! Error types for the ORM.

use spanner_migrate::error::MigrateError;
use spanner_sql_core::{ClientError, DialectError, RowError, SchemaError};
use thiserror::Error;

use crate::config::ConfigError;

/// ORM-specific errors.
#[derive(Debug, Error)]
pub enum OrmError {
    /// Error reported by the Spanner client, unchanged.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Invalid configuration or data source name.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A row could not be mapped onto a model.
    #[error("row error: {0}")]
    Row(#[from] RowError),

    /// The model cannot be reflected.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The statement uses something Spanner cannot express.
    #[error(transparent)]
    Dialect(#[from] DialectError),

    /// Schema migration failed.
    #[error(transparent)]
    Migrate(#[from] MigrateError),

    /// No object found matching the query.
    #[error("object not found")]
    NotFound,

    /// Multiple objects found when exactly one was expected.
    #[error("multiple objects returned when one was expected")]
    MultipleObjectsReturned,

    /// Cloud Spanner has no savepoints.
    #[error("savepoints are not supported by Cloud Spanner")]
    SavepointNotSupported,

    /// The operation has no Spanner equivalent.
    #[error("{0} is not supported by Cloud Spanner")]
    Unsupported(&'static str),

    /// Invalid field name.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// The model has no primary key to address a row with.
    #[error("model `{0}` has no primary key")]
    MissingPrimaryKey(String),
}

/// Result type alias for ORM operations.
pub type Result<T> = std::result::Result<T, OrmError>;
