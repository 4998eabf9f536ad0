//! # spanner-orm
//!
//! An ORM for Cloud Spanner built on the Spanner dialect.
//!
//! This crate provides:
//! - `SpannerDialector`, which validates the configuration and answers the
//!   dialect questions the ORM asks: column types, defaults, bind variables,
//!   quoting, `THEN RETURN`, and the unsupported savepoints, upserts and
//!   locking clauses
//! - `Db` and `Transaction` for running statements through a `Client`
//! - `Model` trait for database models and the embeddable `StandardModel`
//! - `Manager` for create, save, delete and lookup by key
//! - `QuerySet` for lazy, chainable queries
//! - `Q` objects for complex filter expressions
//!
//! ## Quick Start
//!
//! ```ignore
//! use spanner_orm::{Config, Db, Model, SpannerDialector, StandardModel, Table, Q};
//!
//! #[derive(Debug, Default, Table)]
//! struct Singer {
//!     #[column(embed)]
//!     base: StandardModel,
//!     first_name: Option<String>,
//!     last_name: String,
//!     active: bool,
//! }
//!
//! async fn example<C: spanner_orm::Client>(client: C) -> spanner_orm::Result<()> {
//!     let dialector = SpannerDialector::new(Config::new(
//!         "projects/my-project/instances/my-instance/databases/my-database",
//!     ))?;
//!     let db = Db::open(dialector, client);
//!     db.auto_migrate(&[Singer::schema()?]).await?;
//!
//!     // Insert; the generated id comes back through THEN RETURN
//!     let mut singer = Singer {
//!         last_name: String::from("Trentor"),
//!         active: true,
//!         ..Default::default()
//!     };
//!     Singer::objects().create(&db, &mut singer).await?;
//!
//!     // Query
//!     let active = Singer::objects()
//!         .filter(Q::eq("active", true))
//!         .order_by("last_name")
//!         .execute(&db)
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Transactions
//!
//! ```ignore
//! let tx = db.begin().await?;
//! Singer::objects().save(&tx, &mut singer).await?;
//! tx.commit().await?;
//! ```
//!
//! Nested transactions join the outer transaction, since Spanner has no
//! savepoints.

mod config;
mod db;
mod dialector;
mod error;
mod manager;
mod model;
pub mod query;
mod queryset;

pub use config::{Config, ConfigError, DataSource, DRIVER_NAME};
pub use db::{Db, Transaction};
pub use dialector::SpannerDialector;
pub use error::{OrmError, Result};
pub use manager::Manager;
pub use model::{soft_delete_column, Model, StandardModel};
pub use query::Q;
pub use queryset::{OrderBy, OrderDirection, QuerySet};

// Re-export commonly used types from spanner-sql-core
pub use spanner_migrate::migrator::{Migrator, MigratorOptions};
pub use spanner_sql_core::builder::value::{SqlValue, ToSqlValue};
pub use spanner_sql_core::schema::{ModelSchema, Record, Reflect, Row, Table};
pub use spanner_sql_core::{Client, ClientError, ErrorCode, Statement};
pub use spanner_sql_derive::Table;
