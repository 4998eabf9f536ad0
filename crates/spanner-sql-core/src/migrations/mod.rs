//! Cloud Spanner DDL generation.
//!
//! Two ways in:
//! - [`ddl_for_model`] walks a reflected [`ModelSchema`] and returns the
//!   `CREATE TABLE` statement followed by its `CREATE INDEX` statements
//! - [`Operation`] values built by hand (or by the migrator) are rendered
//!   with [`SpannerDdl`] through the [`MigrationDialect`] trait
//!
//! # Example
//!
//! ```rust
//! use spanner_sql_core::migrations::{int64, string, CreateTableBuilder, MigrationDialect, Operation, SpannerDdl};
//!
//! let op = CreateTableBuilder::new()
//!     .name("singers")
//!     .column(int64("id").not_null().build())
//!     .column(string("first_name", Some(200)).build())
//!     .primary_key(&["id"])
//!     .build();
//!
//! assert_eq!(
//!     SpannerDdl::new().generate_sql(&Operation::from(op)).unwrap(),
//!     "CREATE TABLE `singers` (`id` INT64 NOT NULL,`first_name` STRING(200)) PRIMARY KEY (`id`)"
//! );
//! ```

mod column_builder;
pub mod dialect;
mod operation;
mod table_builder;

pub use column_builder::{
    boolean, bytes, date, float32, float64, int64, json, numeric, string, timestamp,
    ColumnBuilder, ColumnDefinition, DefaultValue, SpannerType, MAX_BYTES_LENGTH,
    MAX_STRING_LENGTH,
};
pub use dialect::{MigrationDialect, SpannerDdl};
pub use operation::{
    AddColumnOp, AddForeignKeyOp, AlterColumnOp, CreateIndexOp, CreateTableOp, DropColumnOp,
    DropConstraintOp, DropIndexOp, DropTableOp, Operation, RenameColumnOp, RenameIndexOp,
    RenameTableOp, SequenceOp,
};
pub use table_builder::{
    CreateTableBuilder, HasColumns, HasKey, HasName, NoColumns, NoKey, NoName,
};

use crate::error::SchemaError;
use crate::schema::{ModelSchema, NamingStrategy};

/// Options for DDL generation from models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DdlOptions {
    /// Back auto-increment keys with a bit-reversed sequence.
    pub sequence_backed_keys: bool,
}

/// Returns the name of the sequence backing `table`'s key.
#[must_use]
pub fn sequence_name(table: &str) -> String {
    NamingStrategy::default().sequence_name(table)
}

/// Converts a model schema into a `CreateTableOp`.
///
/// # Errors
///
/// Returns `SchemaError::UnsupportedType` for fields without a Spanner type.
pub fn create_table_op(schema: &ModelSchema, options: &DdlOptions) -> Result<CreateTableOp, SchemaError> {
    let sequence = sequence_name(&schema.table);
    let mut columns = Vec::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let mut column = ColumnDefinition::from_field(&schema.table, field)?;
        if options.sequence_backed_keys
            && field.is_auto_increment()
            && column.default.is_none()
            && column.generated.is_none()
        {
            column.default = Some(DefaultValue::Expression(format!(
                "GET_NEXT_SEQUENCE_VALUE(SEQUENCE {})",
                SpannerDdl::new().quote_identifier(&sequence)
            )));
        }
        columns.push(column);
    }
    Ok(CreateTableOp {
        name: schema.table.clone(),
        columns,
        foreign_keys: schema.foreign_keys.clone(),
        primary_key: schema.primary_key.clone(),
        interleave: schema.interleave.clone(),
    })
}

/// Returns the operations creating a model's table and its indexes.
///
/// # Errors
///
/// Returns `SchemaError::UnsupportedType` for fields without a Spanner type.
pub fn create_operations(schema: &ModelSchema, options: &DdlOptions) -> Result<Vec<Operation>, SchemaError> {
    let mut ops = vec![];
    if options.sequence_backed_keys && schema.fields.iter().any(|f| f.is_auto_increment()) {
        ops.push(Operation::create_sequence(sequence_name(&schema.table)));
    }
    ops.push(create_table_op(schema, options)?.into());
    ops.extend(
        schema
            .indexes
            .iter()
            .map(|index| Operation::create_index(schema.table.clone(), index.clone())),
    );
    Ok(ops)
}

/// Returns the DDL statements creating a model's table and its indexes.
///
/// # Errors
///
/// Returns `SchemaError::UnsupportedType` for fields without a Spanner type.
pub fn ddl_for_model(schema: &ModelSchema) -> Result<Vec<String>, SchemaError> {
    ddl_for_model_with(schema, &DdlOptions::default())
}

/// Same as [`ddl_for_model`] with explicit options.
///
/// # Errors
///
/// Returns `SchemaError::UnsupportedType` for fields without a Spanner type.
pub fn ddl_for_model_with(schema: &ModelSchema, options: &DdlOptions) -> Result<Vec<String>, SchemaError> {
    let dialect = SpannerDdl::new();
    create_operations(schema, options)?
        .iter()
        .map(|op| dialect.generate_sql(op))
        .collect()
}

/// Returns the DDL statements dropping a model's indexes, table and sequence.
///
/// Spanner refuses to drop a table that still has secondary indexes.
#[must_use]
pub fn drop_ddl_for_model(schema: &ModelSchema, options: &DdlOptions) -> Vec<String> {
    let dialect = SpannerDdl::new();
    let mut ddl: Vec<String> = schema
        .indexes
        .iter()
        .map(|index| dialect.drop_index(&DropIndexOp { name: index.name.clone() }))
        .collect();
    ddl.push(dialect.drop_table(&DropTableOp { name: schema.table.clone() }));
    if options.sequence_backed_keys && schema.fields.iter().any(|f| f.is_auto_increment()) {
        ddl.push(dialect.drop_sequence(&SequenceOp { name: sequence_name(&schema.table) }));
    }
    ddl
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, OnDelete};

    fn singer() -> ModelSchema {
        ModelSchema::builder("Singer")
            .field(FieldSchema::new("id", "i64"))
            .field(FieldSchema::new("first_name", "Option<String>"))
            .field(FieldSchema::new("last_name", "String").not_null().size(200))
            .field(FieldSchema::new("full_name", "String").type_override(
                "STRING(400) AS (ARRAY_TO_STRING([first_name, last_name], \" \")) STORED",
            ))
            .field(FieldSchema::new("active", "bool").default_value("true"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_ddl_for_model_field_order() {
        assert_eq!(
            ddl_for_model(&singer()).unwrap(),
            vec![
                "CREATE TABLE `singers` (`id` INT64,`first_name` STRING(MAX),`last_name` STRING(200) NOT NULL,`full_name` STRING(400) AS (ARRAY_TO_STRING([first_name, last_name], \" \")) STORED,`active` BOOL DEFAULT (TRUE)) PRIMARY KEY (`id`)"
            ]
        );
    }

    #[test]
    fn test_sequence_backed_keys() {
        let options = DdlOptions {
            sequence_backed_keys: true,
        };
        let ddl = ddl_for_model_with(&singer(), &options).unwrap();
        assert_eq!(ddl.len(), 2);
        assert_eq!(
            ddl[0],
            "CREATE SEQUENCE `seq_singers` OPTIONS (sequence_kind = \"bit_reversed_positive\")"
        );
        assert!(ddl[1].starts_with(
            "CREATE TABLE `singers` (`id` INT64 DEFAULT (GET_NEXT_SEQUENCE_VALUE(SEQUENCE `seq_singers`)),"
        ));
    }

    #[test]
    fn test_interleaved_model() {
        let schema = ModelSchema::builder("Track")
            .field(FieldSchema::new("id", "i64").primary_key())
            .field(FieldSchema::new("track_number", "i64").primary_key())
            .field(FieldSchema::new("title", "String").not_null())
            .interleave_in("albums", OnDelete::Cascade)
            .build()
            .unwrap();
        let options = DdlOptions {
            sequence_backed_keys: true,
        };
        assert_eq!(
            ddl_for_model_with(&schema, &options).unwrap(),
            vec![
                "CREATE TABLE `tracks` (`id` INT64,`track_number` INT64,`title` STRING(MAX) NOT NULL) PRIMARY KEY (`id`,`track_number`), INTERLEAVE IN PARENT `albums` ON DELETE CASCADE"
            ]
        );
    }

    #[test]
    fn test_unsupported_field_type() {
        let schema = ModelSchema::builder("Singer")
            .field(FieldSchema::new("id", "i64"))
            .field(FieldSchema::new("tags", "HashMap<String, String>"))
            .build()
            .unwrap();
        assert!(matches!(
            ddl_for_model(&schema),
            Err(SchemaError::UnsupportedType { column, .. }) if column == "tags"
        ));
    }

    #[test]
    fn test_drop_ddl_drops_indexes_first() {
        let schema = ModelSchema::builder("Album")
            .field(FieldSchema::new("id", "i64"))
            .field(FieldSchema::new("title", "String").index(None))
            .build()
            .unwrap();
        assert_eq!(
            drop_ddl_for_model(&schema, &DdlOptions::default()),
            vec!["DROP INDEX `idx_albums_title`", "DROP TABLE `albums`"]
        );
    }
}
