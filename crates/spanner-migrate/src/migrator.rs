//! Migrator.
//!
//! This module compares models with the live schema and sends the DDL that
//! brings the database up to date. Every call sends at most one schema update
//! request: Spanner applies a batch of DDL statements as one long-running
//! operation, which is far cheaper than one request per statement.

use std::collections::{HashMap, VecDeque};

use spanner_sql_core::builder::{FromSqlValue, SqlValue, Statement, ToSqlValue};
use spanner_sql_core::migrations::{
    create_operations, drop_ddl_for_model, ColumnDefinition, DdlOptions, MigrationDialect,
    Operation, RenameIndexOp, SpannerDdl,
};
use spanner_sql_core::schema::{FieldSchema, ForeignKeySchema, IndexSchema, ModelSchema};
use spanner_sql_core::Client;
use tracing::{debug, info};

use crate::error::{MigrateError, Result};

const TABLE_COUNT_SQL: &str = "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES \
     WHERE table_schema = '' AND table_name = @p1";
const TABLES_SQL: &str = "SELECT table_name FROM INFORMATION_SCHEMA.TABLES \
     WHERE table_schema = '' ORDER BY table_name";
const COLUMN_COUNT_SQL: &str = "SELECT COUNT(*) FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE table_schema = '' AND table_name = @p1 AND column_name = @p2";
const COLUMNS_SQL: &str = "SELECT column_name FROM INFORMATION_SCHEMA.COLUMNS \
     WHERE table_schema = '' AND table_name = @p1 ORDER BY ordinal_position";
const INDEX_COUNT_SQL: &str = "SELECT COUNT(*) FROM INFORMATION_SCHEMA.INDEXES \
     WHERE table_schema = '' AND table_name = @p1 AND index_name = @p2";
const CONSTRAINT_COUNT_SQL: &str = "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS \
     WHERE table_schema = '' AND table_name = @p1 AND constraint_name = @p2";

/// Migrator settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigratorOptions {
    /// Back auto-increment keys with bit-reversed sequences.
    pub sequence_backed_keys: bool,
    /// Compute the DDL but do not send it.
    pub dry_run: bool,
}

/// Applies model schemas to a Spanner database.
#[derive(Debug)]
pub struct Migrator<C: Client> {
    client: C,
    dialect: SpannerDdl,
    options: MigratorOptions,
}

impl<C: Client> Migrator<C> {
    /// Creates a migrator with default options.
    pub fn new(client: C) -> Self {
        Self::with_options(client, MigratorOptions::default())
    }

    /// Creates a migrator.
    pub const fn with_options(client: C, options: MigratorOptions) -> Self {
        Self {
            client,
            dialect: SpannerDdl::new(),
            options,
        }
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &MigratorOptions {
        &self.options
    }

    /// Returns the client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    const fn ddl_options(&self) -> DdlOptions {
        DdlOptions {
            sequence_backed_keys: self.options.sequence_backed_keys,
        }
    }

    /// Creates missing tables and adds missing columns, indexes and
    /// foreign keys. Returns the statements of the batch.
    ///
    /// Columns are never altered or dropped.
    pub async fn auto_migrate(&self, models: &[ModelSchema]) -> Result<Vec<String>> {
        let ordered = order_models(models)?;
        let mut statements = Vec::new();
        for model in ordered {
            if self.has_table(&model.table).await? {
                statements.extend(self.missing_ddl(model).await?);
            } else {
                info!(table = %model.table, "Creating table");
                statements.extend(self.generate(&create_operations(model, &self.ddl_options())?)?);
            }
        }
        self.execute_ddl(statements).await
    }

    async fn missing_ddl(&self, model: &ModelSchema) -> Result<Vec<String>> {
        let existing = self.column_names(&model.table).await?;
        let mut ops = Vec::new();
        for field in &model.fields {
            if !existing.contains(&field.name) {
                info!(table = %model.table, column = %field.name, "Adding column");
                ops.push(Operation::add_column(
                    model.table.clone(),
                    ColumnDefinition::from_field(&model.table, field)?,
                ));
            }
        }
        for index in &model.indexes {
            if !self.has_index(&model.table, &index.name).await? {
                info!(table = %model.table, index = %index.name, "Creating index");
                ops.push(Operation::create_index(model.table.clone(), index.clone()));
            }
        }
        for fk in &model.foreign_keys {
            if !self.has_constraint(&model.table, &fk.name).await? {
                info!(table = %model.table, constraint = %fk.name, "Adding foreign key");
                ops.push(Operation::add_foreign_key(model.table.clone(), fk.clone()));
            }
        }
        self.generate(&ops)
    }

    /// Creates the tables of `models`, parents first, in one batch.
    pub async fn create_table(&self, models: &[ModelSchema]) -> Result<Vec<String>> {
        let mut ops = Vec::new();
        for model in order_models(models)? {
            ops.extend(create_operations(model, &self.ddl_options())?);
        }
        let statements = self.generate(&ops)?;
        self.execute_ddl(statements).await
    }

    /// Drops the tables of `models`, children first, in one batch.
    ///
    /// A table's secondary indexes are dropped before the table.
    pub async fn drop_table(&self, models: &[ModelSchema]) -> Result<Vec<String>> {
        let statements = order_models(models)?
            .into_iter()
            .rev()
            .flat_map(|model| drop_ddl_for_model(model, &self.ddl_options()))
            .collect();
        self.execute_ddl(statements).await
    }

    /// Returns whether `table` exists.
    pub async fn has_table(&self, table: &str) -> Result<bool> {
        self.count(TABLE_COUNT_SQL, vec![table.to_sql_value()])
            .await
            .map(|n| n > 0)
    }

    /// Returns the names of all user tables.
    pub async fn get_tables(&self) -> Result<Vec<String>> {
        self.strings(Statement::raw(TABLES_SQL)).await
    }

    /// Returns whether `table` has `column`.
    pub async fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        self.count(
            COLUMN_COUNT_SQL,
            vec![table.to_sql_value(), column.to_sql_value()],
        )
        .await
        .map(|n| n > 0)
    }

    /// Returns the column names of `table`, in ordinal order.
    pub async fn column_names(&self, table: &str) -> Result<Vec<String>> {
        self.strings(Statement::new(COLUMNS_SQL, vec![table.to_sql_value()]))
            .await
    }

    /// Returns whether `table` has the index `name`.
    pub async fn has_index(&self, table: &str, name: &str) -> Result<bool> {
        self.count(
            INDEX_COUNT_SQL,
            vec![table.to_sql_value(), name.to_sql_value()],
        )
        .await
        .map(|n| n > 0)
    }

    /// Returns whether `table` has the constraint `name`.
    pub async fn has_constraint(&self, table: &str, name: &str) -> Result<bool> {
        self.count(
            CONSTRAINT_COUNT_SQL,
            vec![table.to_sql_value(), name.to_sql_value()],
        )
        .await
        .map(|n| n > 0)
    }

    /// Adds a column for `field` to `table`.
    pub async fn add_column(&self, table: &str, field: &FieldSchema) -> Result<Vec<String>> {
        let column = ColumnDefinition::from_field(table, field)?;
        self.run(Operation::add_column(table, column)).await
    }

    /// Drops `column` from `table`.
    pub async fn drop_column(&self, table: &str, column: &str) -> Result<Vec<String>> {
        self.run(Operation::drop_column(table, column)).await
    }

    /// Changes the type or nullability of the column of `field`.
    pub async fn alter_column(&self, table: &str, field: &FieldSchema) -> Result<Vec<String>> {
        let column = ColumnDefinition::from_field(table, field)?;
        self.run(Operation::alter_column(table, column)).await
    }

    /// Renames a table.
    pub async fn rename_table(&self, old_name: &str, new_name: &str) -> Result<Vec<String>> {
        self.run(Operation::rename_table(old_name, new_name)).await
    }

    /// Renames a column. Spanner cannot do this.
    pub async fn rename_column(
        &self,
        table: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<Vec<String>> {
        self.run(Operation::rename_column(table, old_name, new_name))
            .await
    }

    /// Creates an index on `table`.
    pub async fn create_index(&self, table: &str, index: IndexSchema) -> Result<Vec<String>> {
        self.run(Operation::create_index(table, index)).await
    }

    /// Drops an index.
    pub async fn drop_index(&self, name: &str) -> Result<Vec<String>> {
        self.run(Operation::drop_index(name)).await
    }

    /// Renames an index. Spanner cannot do this.
    pub async fn rename_index(&self, old_name: &str, new_name: &str) -> Result<Vec<String>> {
        self.run(Operation::RenameIndex(RenameIndexOp {
            old_name: String::from(old_name),
            new_name: String::from(new_name),
        }))
        .await
    }

    /// Adds a foreign key constraint to `table`.
    pub async fn create_constraint(
        &self,
        table: &str,
        foreign_key: ForeignKeySchema,
    ) -> Result<Vec<String>> {
        self.run(Operation::add_foreign_key(table, foreign_key))
            .await
    }

    /// Drops the constraint `name` of `table`.
    pub async fn drop_constraint(&self, table: &str, name: &str) -> Result<Vec<String>> {
        self.run(Operation::drop_constraint(table, name)).await
    }

    /// Creates a bit-reversed sequence.
    pub async fn create_sequence(&self, name: &str) -> Result<Vec<String>> {
        self.run(Operation::create_sequence(name)).await
    }

    /// Drops a sequence.
    pub async fn drop_sequence(&self, name: &str) -> Result<Vec<String>> {
        self.run(Operation::drop_sequence(name)).await
    }

    /// Sends `statements` as one schema update unless empty or dry-running.
    pub async fn execute_ddl(&self, statements: Vec<String>) -> Result<Vec<String>> {
        if statements.is_empty() {
            debug!("Schema is up to date");
            return Ok(statements);
        }
        for sql in &statements {
            debug!(sql = %sql, "DDL");
        }
        if self.options.dry_run {
            info!(count = statements.len(), "Dry run, DDL batch not sent");
            return Ok(statements);
        }
        info!(count = statements.len(), "Applying DDL batch");
        self.client.update_ddl(&statements).await?;
        Ok(statements)
    }

    async fn run(&self, operation: Operation) -> Result<Vec<String>> {
        let statements = self.generate(&[operation])?;
        self.execute_ddl(statements).await
    }

    fn generate(&self, operations: &[Operation]) -> Result<Vec<String>> {
        operations
            .iter()
            .map(|op| self.dialect.generate_sql(op).map_err(MigrateError::from))
            .collect()
    }

    async fn count(&self, sql: &str, params: Vec<SqlValue>) -> Result<i64> {
        let statement = Statement::new(sql, params);
        debug!(sql = %statement.explain(), "Introspecting");
        let rows = self.client.query(&statement).await?;
        match rows.first().and_then(|row| row.values().first()) {
            Some(value) => Ok(i64::from_sql_value(value.clone())?),
            None => Ok(0),
        }
    }

    async fn strings(&self, statement: Statement) -> Result<Vec<String>> {
        debug!(sql = %statement.explain(), "Introspecting");
        let rows = self.client.query(&statement).await?;
        let mut names = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(value) = row.values().first() {
                names.push(String::from_sql_value(value.clone())?);
            }
        }
        Ok(names)
    }
}

/// Orders models so that parent and referenced tables come first.
///
/// Models keep their given order where dependencies allow. References to
/// tables outside `models` and to the model's own table are ignored.
///
/// # Errors
///
/// Returns `MigrateError::CircularDependency` with the tables left unordered.
pub fn order_models(models: &[ModelSchema]) -> Result<Vec<&ModelSchema>> {
    let position: HashMap<&str, usize> = models
        .iter()
        .enumerate()
        .map(|(i, m)| (m.table.as_str(), i))
        .collect();

    let mut in_degree = vec![0_usize; models.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); models.len()];
    for (i, model) in models.iter().enumerate() {
        for dep in model.dependencies() {
            if let Some(&j) = position.get(dep) {
                if j != i {
                    in_degree[i] += 1;
                    dependents[j].push(i);
                }
            }
        }
    }

    // Kahn's algorithm, seeded in input order
    let mut queue: VecDeque<usize> = (0..models.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut ordered = Vec::with_capacity(models.len());
    while let Some(i) = queue.pop_front() {
        ordered.push(&models[i]);
        for &dependent in &dependents[i] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if ordered.len() != models.len() {
        let cyclic = models
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree[*i] > 0)
            .map(|(_, m)| m.table.clone())
            .collect();
        return Err(MigrateError::CircularDependency(cyclic));
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanner_sql_core::schema::{FieldSchema, OnDelete};

    fn model(name: &str, references: &[&str]) -> ModelSchema {
        let mut builder = ModelSchema::builder(name).field(FieldSchema::new("id", "i64"));
        for table in references {
            let column = format!("{}_id", table.trim_end_matches('s'));
            builder = builder.field(FieldSchema::new(&column, "i64").references(table, "id"));
        }
        builder.build().unwrap()
    }

    fn tables(models: &[&ModelSchema]) -> Vec<String> {
        models.iter().map(|m| m.table.clone()).collect()
    }

    #[test]
    fn test_order_keeps_input_order_without_dependencies() {
        let models = vec![model("Venue", &[]), model("Singer", &[])];
        assert_eq!(
            tables(&order_models(&models).unwrap()),
            vec!["venues", "singers"]
        );
    }

    #[test]
    fn test_order_puts_referenced_tables_first() {
        let models = vec![
            model("Concert", &["venues", "singers"]),
            model("Album", &["singers"]),
            model("Singer", &[]),
            model("Venue", &[]),
        ];
        assert_eq!(
            tables(&order_models(&models).unwrap()),
            vec!["singers", "venues", "albums", "concerts"]
        );
    }

    #[test]
    fn test_order_interleaved_child_after_parent() {
        let track = ModelSchema::builder("Track")
            .field(FieldSchema::new("id", "i64").primary_key())
            .field(FieldSchema::new("track_number", "i64").primary_key())
            .interleave_in("albums", OnDelete::Cascade)
            .build()
            .unwrap();
        let models = vec![track, model("Album", &[])];
        assert_eq!(tables(&order_models(&models).unwrap()), vec!["albums", "tracks"]);
    }

    #[test]
    fn test_order_ignores_self_and_unknown_references() {
        let models = vec![model("Singer", &["singers", "labels"])];
        assert_eq!(tables(&order_models(&models).unwrap()), vec!["singers"]);
    }

    #[test]
    fn test_order_detects_cycles() {
        let models = vec![
            model("Singer", &["albums"]),
            model("Album", &["singers"]),
            model("Venue", &[]),
        ];
        match order_models(&models) {
            Err(MigrateError::CircularDependency(tables)) => {
                assert_eq!(tables, vec!["singers", "albums"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }
}
