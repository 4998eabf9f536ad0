//! Error types for the migration system.

use std::path::PathBuf;

use spanner_sql_core::{ClientError, RowError, SchemaError};

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Models reference each other in a cycle.
    #[error("Circular dependency detected between tables: {}", .0.join(", "))]
    CircularDependency(Vec<String>),

    /// Error reported by the Spanner client, unchanged.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The model cannot be expressed in Spanner DDL.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// An `INFORMATION_SCHEMA` query returned something unexpected.
    #[error("Unexpected introspection result: {0}")]
    Introspection(#[from] RowError),

    /// Failed to read or parse a schema file.
    #[error("Failed to load schema file '{path}': {message}")]
    SchemaFile {
        /// Path to the schema file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A model embeds a model the schema file does not define.
    #[error("Model '{model}' embeds unknown model '{embed}'")]
    UnknownEmbed {
        /// The embedding model.
        model: String,
        /// The missing model.
        embed: String,
    },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
