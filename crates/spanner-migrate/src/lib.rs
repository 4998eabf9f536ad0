//! Schema migrations for Cloud Spanner models.
//!
//! `spanner-migrate` keeps a Spanner database in line with the models that
//! use it:
//! - **Migrator** - creates missing tables, columns, indexes and foreign
//!   keys, and runs single schema operations
//! - **Introspection** - `INFORMATION_SCHEMA` queries (`has_table`,
//!   `has_column`, `has_index`, `has_constraint`, `get_tables`)
//! - **Schema files** - JSON model descriptions for use without the derive
//! - **Recording client** - captures DDL for dry runs and the CLI
//!
//! All statements produced by one migrator call go to the database as a
//! single schema update request.
//!
//! # Example
//!
//! ```rust
//! use spanner_migrate::prelude::*;
//! use spanner_sql_core::schema::{FieldSchema, ModelSchema};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let singer = ModelSchema::builder("Singer")
//!     .field(FieldSchema::new("id", "i64"))
//!     .field(FieldSchema::new("last_name", "String").not_null())
//!     .build()
//!     .unwrap();
//!
//! let client = RecordingClient::new();
//! let migrator = Migrator::new(&client);
//! migrator.auto_migrate(&[singer]).await.unwrap();
//!
//! assert_eq!(
//!     client.batches().await,
//!     vec![vec![String::from(
//!         "CREATE TABLE `singers` (`id` INT64,`last_name` STRING(MAX) NOT NULL) PRIMARY KEY (`id`)"
//!     )]]
//! );
//! # });
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Print the DDL creating every model of a schema file
//! spanner-migrate --schema models.json create-ddl
//!
//! # Print the DDL dropping them, children first
//! spanner-migrate --schema models.json drop-ddl
//!
//! # Validate the schema file
//! spanner-migrate --schema models.json check --json
//! ```

pub mod error;
pub mod migrator;
pub mod recording;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{MigrateError, Result};
    pub use crate::migrator::{order_models, Migrator, MigratorOptions};
    pub use crate::recording::RecordingClient;
    pub use crate::schema::{load_schema_file, SchemaFile};
}
