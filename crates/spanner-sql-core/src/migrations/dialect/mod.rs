//! Dialect-specific DDL generation.

mod spanner;

pub use spanner::SpannerDdl;

use super::column_builder::ColumnDefinition;
use super::operation::{
    AddColumnOp, AddForeignKeyOp, AlterColumnOp, CreateIndexOp, CreateTableOp, DropColumnOp,
    DropConstraintOp, DropIndexOp, DropTableOp, Operation, RenameTableOp, SequenceOp,
};
use crate::error::SchemaError;
use crate::schema::ForeignKeySchema;

/// Trait for dialect-specific SQL generation for schema changes.
pub trait MigrationDialect {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates SQL for an operation.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Unsupported` for operations the dialect cannot express.
    fn generate_sql(&self, operation: &Operation) -> Result<String, SchemaError> {
        Ok(match operation {
            Operation::CreateTable(op) => self.create_table(op),
            Operation::DropTable(op) => self.drop_table(op),
            Operation::RenameTable(op) => self.rename_table(op),
            Operation::AddColumn(op) => self.add_column(op),
            Operation::DropColumn(op) => self.drop_column(op),
            Operation::AlterColumn(op) => self.alter_column(op),
            Operation::RenameColumn(_) => return Err(SchemaError::Unsupported("RENAME COLUMN")),
            Operation::CreateIndex(op) => self.create_index(op),
            Operation::DropIndex(op) => self.drop_index(op),
            Operation::RenameIndex(_) => return Err(SchemaError::Unsupported("RENAME INDEX")),
            Operation::AddForeignKey(op) => self.add_foreign_key(op),
            Operation::DropConstraint(op) => self.drop_constraint(op),
            Operation::CreateSequence(op) => self.create_sequence(op),
            Operation::DropSequence(op) => self.drop_sequence(op),
            Operation::RunSql(sql) => sql.clone(),
        })
    }

    /// Generates SQL for CREATE TABLE.
    fn create_table(&self, op: &CreateTableOp) -> String;

    /// Generates SQL for DROP TABLE.
    fn drop_table(&self, op: &DropTableOp) -> String {
        format!("DROP TABLE {}", self.quote_identifier(&op.name))
    }

    /// Generates SQL for RENAME TABLE.
    fn rename_table(&self, op: &RenameTableOp) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(&op.old_name),
            self.quote_identifier(&op.new_name)
        )
    }

    /// Generates SQL for ADD COLUMN.
    fn add_column(&self, op: &AddColumnOp) -> String {
        format!(
            "ALTER TABLE {} ADD COLUMN {}",
            self.quote_identifier(&op.table),
            self.column_definition(&op.column)
        )
    }

    /// Generates SQL for DROP COLUMN.
    fn drop_column(&self, op: &DropColumnOp) -> String {
        format!(
            "ALTER TABLE {} DROP COLUMN {}",
            self.quote_identifier(&op.table),
            self.quote_identifier(&op.column)
        )
    }

    /// Generates SQL for ALTER COLUMN.
    fn alter_column(&self, op: &AlterColumnOp) -> String {
        format!(
            "ALTER TABLE {} ALTER COLUMN {}",
            self.quote_identifier(&op.table),
            self.column_definition(&op.column)
        )
    }

    /// Generates SQL for CREATE INDEX.
    fn create_index(&self, op: &CreateIndexOp) -> String;

    /// Generates SQL for DROP INDEX.
    fn drop_index(&self, op: &DropIndexOp) -> String {
        format!("DROP INDEX {}", self.quote_identifier(&op.name))
    }

    /// Generates SQL for ADD CONSTRAINT ... FOREIGN KEY.
    fn add_foreign_key(&self, op: &AddForeignKeyOp) -> String {
        format!(
            "ALTER TABLE {} ADD {}",
            self.quote_identifier(&op.table),
            self.foreign_key_constraint(&op.foreign_key)
        )
    }

    /// Generates SQL for DROP CONSTRAINT.
    fn drop_constraint(&self, op: &DropConstraintOp) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(&op.table),
            self.quote_identifier(&op.name)
        )
    }

    /// Generates SQL for CREATE SEQUENCE.
    fn create_sequence(&self, op: &SequenceOp) -> String;

    /// Generates SQL for DROP SEQUENCE.
    fn drop_sequence(&self, op: &SequenceOp) -> String {
        format!("DROP SEQUENCE {}", self.quote_identifier(&op.name))
    }

    /// Generates SQL for a column definition.
    fn column_definition(&self, col: &ColumnDefinition) -> String;

    /// Generates SQL for a named foreign key constraint.
    fn foreign_key_constraint(&self, fk: &ForeignKeySchema) -> String {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
            self.quote_identifier(&fk.name),
            self.quote_list(&fk.columns),
            self.quote_identifier(&fk.references_table),
            self.quote_list(&fk.references_columns)
        );
        if let Some(action) = fk.on_delete {
            sql.push_str(" ON DELETE ");
            sql.push_str(action.as_sql());
        }
        sql
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String;

    /// Quotes and joins identifiers with `,`.
    fn quote_list(&self, names: &[String]) -> String {
        names
            .iter()
            .map(|n| self.quote_identifier(n))
            .collect::<Vec<_>>()
            .join(",")
    }
}
