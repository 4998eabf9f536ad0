//! # spanner-sql-core
//!
//! The Cloud Spanner (GoogleSQL) dialect for the ORM.
//!
//! This crate provides:
//! - The `SpannerDialect`: backtick quoting, `@pN` parameters and the
//!   capability flags the ORM consults (no upsert, no savepoints, no
//!   locking clauses, `THEN RETURN` instead of `RETURNING`)
//! - Typestate statement builders producing Spanner DML
//! - Model reflection (`ModelSchema`) and the Rust type to column type mapping
//! - Spanner DDL generation for tables, indexes, constraints and sequences
//! - The `Client` trait the database client library plugs into
//!
//! ## Building statements
//!
//! ```rust
//! use spanner_sql_core::builder::{Insert, Select, col};
//!
//! let stmt = Select::new()
//!     .columns(&["id", "name"])
//!     .from("singers")
//!     .where_clause(col("active").eq(true))
//!     .build();
//! assert_eq!(stmt.sql, "SELECT `id`,`name` FROM `singers` WHERE `active` = @p1");
//!
//! let stmt = Insert::new()
//!     .into_table("singers")
//!     .columns(&["first_name", "last_name"])
//!     .values(vec!["Alice", "Trentor"])
//!     .then_return(&["id", "full_name"])
//!     .build();
//! assert_eq!(
//!     stmt.sql,
//!     "INSERT INTO `singers` (`first_name`,`last_name`) VALUES (@p1,@p2) THEN RETURN `id`,`full_name`"
//! );
//! ```
//!
//! ## Generating DDL
//!
//! ```rust
//! use spanner_sql_core::migrations::ddl_for_model;
//! use spanner_sql_core::schema::{FieldSchema, ModelSchema};
//!
//! let schema = ModelSchema::builder("Venue")
//!     .field(FieldSchema::new("id", "i64"))
//!     .field(FieldSchema::new("name", "String"))
//!     .build()
//!     .unwrap();
//!
//! let ddl = ddl_for_model(&schema).unwrap();
//! assert_eq!(
//!     ddl,
//!     vec!["CREATE TABLE `venues` (`id` INT64,`name` STRING(MAX)) PRIMARY KEY (`id`)"]
//! );
//! ```

pub mod builder;
pub mod clause;
pub mod client;
pub mod dialect;
mod error;
pub mod migrations;
pub mod schema;

pub use builder::{col, Delete, Insert, Select, Statement, Update};
pub use client::{Client, ClientError, ErrorCode};
pub use dialect::{Dialect, SpannerDialect};
pub use error::{DialectError, SchemaError};
pub use schema::{
    Column, FieldSchema, FieldType, ModelSchema, Record, Reflect, Row, RowError, Selectable,
    Table, TypedColumn,
};
