//! The Spanner dialector: the answers the ORM asks of its database dialect.

use spanner_sql_core::builder::SqlValue;
use spanner_sql_core::clause::{Locking, OnConflict, Returning};
use spanner_sql_core::migrations::{ColumnDefinition, DefaultValue};
use spanner_sql_core::schema::{FieldSchema, FieldType, ModelSchema};
use spanner_sql_core::{Dialect, SpannerDialect};
use tracing::debug;

use crate::config::{Config, DataSource};
use crate::error::{OrmError, Result};

/// Dialector for Cloud Spanner.
///
/// Wraps a validated [`Config`] and the [`SpannerDialect`]. Everything the
/// ORM renders goes through here, so the configuration switches
/// (`disable_locking_clause`, `default_string_size`) apply everywhere.
#[derive(Debug, Clone)]
pub struct SpannerDialector {
    config: Config,
    data_source: DataSource,
    dialect: SpannerDialect,
}

impl SpannerDialector {
    /// Creates a dialector, validating the driver name and data source name.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Config` when the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let data_source = config.validate()?;
        Ok(Self {
            config,
            data_source,
            dialect: SpannerDialect::new(),
        })
    }

    /// Returns the dialect name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.dialect.name()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the parsed data source name.
    #[must_use]
    pub const fn data_source(&self) -> &DataSource {
        &self.data_source
    }

    /// Fills in the configured default length of unsized string columns.
    #[must_use]
    pub fn with_default_size(&self, field: &FieldSchema) -> FieldSchema {
        let mut field = field.clone();
        if field.size.is_none() && field.type_override.is_none() && field.field_type == FieldType::String {
            field.size = self.config.default_string_size;
        }
        field
    }

    /// Applies [`with_default_size`](Self::with_default_size) to every field of `schema`.
    #[must_use]
    pub fn apply_defaults(&self, schema: &ModelSchema) -> ModelSchema {
        let mut schema = schema.clone();
        for field in &mut schema.fields {
            *field = self.with_default_size(field);
        }
        schema
    }

    /// Returns the Spanner column type of `field` in `table`.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Schema` when the field type has no Spanner mapping.
    pub fn data_type_of(&self, table: &str, field: &FieldSchema) -> Result<String> {
        let definition = ColumnDefinition::from_field(table, &self.with_default_size(field))?;
        Ok(definition.data_type.to_sql())
    }

    /// Returns the DDL default of `field`, if it declares one.
    #[must_use]
    pub fn default_value_of(&self, field: &FieldSchema) -> Option<String> {
        if field.generated {
            return None;
        }
        field
            .default
            .as_deref()
            .map(|expr| DefaultValue::from_field_default(expr, &field.field_type).to_sql())
    }

    /// Writes the placeholder of the parameter at `index` (1-based).
    pub fn bind_var_to(&self, buf: &mut String, index: usize) {
        buf.push_str(&self.dialect.parameter_placeholder(index));
    }

    /// Writes `name` as a quoted identifier.
    pub fn quote_to(&self, buf: &mut String, name: &str) {
        buf.push_str(&self.dialect.quote_identifier(name));
    }

    /// Renders a statement with its parameters inlined.
    #[must_use]
    pub fn explain(&self, sql: &str, params: &[SqlValue]) -> String {
        self.dialect.explain(sql, params)
    }

    /// Creates a savepoint.
    ///
    /// # Errors
    ///
    /// Always fails: Spanner has no savepoints.
    pub fn savepoint(&self, name: &str) -> Result<()> {
        debug!(savepoint = name, "Savepoint requested");
        Err(OrmError::SavepointNotSupported)
    }

    /// Rolls back to a savepoint.
    ///
    /// # Errors
    ///
    /// Always fails: Spanner has no savepoints.
    pub fn rollback_to(&self, name: &str) -> Result<()> {
        debug!(savepoint = name, "Rollback to savepoint requested");
        Err(OrmError::SavepointNotSupported)
    }

    /// Builds the `THEN RETURN` clause for `columns`.
    #[must_use]
    pub fn returning<S: AsRef<str>>(&self, columns: &[S]) -> Returning {
        Returning::new(columns)
    }

    /// Renders an `ON CONFLICT` clause.
    ///
    /// # Errors
    ///
    /// Always fails: Spanner has no upsert clause.
    pub fn on_conflict(&self, clause: &OnConflict) -> Result<String> {
        Ok(clause.to_sql()?)
    }

    /// Renders a locking clause.
    ///
    /// Returns `None` when locking clauses are disabled, in which case the
    /// clause is dropped from the statement.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::Unsupported` when locking clauses are not disabled.
    pub fn locking(&self, locking: &Locking) -> Result<Option<String>> {
        if self.config.disable_locking_clause {
            debug!(strength = ?locking.strength, "Dropping locking clause");
            return Ok(None);
        }
        Err(OrmError::Unsupported("FOR UPDATE"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanner_sql_core::DialectError;

    fn dialector() -> SpannerDialector {
        SpannerDialector::new(Config::new("projects/p/instances/i/databases/d")).unwrap()
    }

    #[test]
    fn test_new_validates_config() {
        let err = SpannerDialector::new(Config::new("not-a-dsn")).unwrap_err();
        assert!(matches!(err, OrmError::Config(_)));
        assert_eq!(dialector().name(), "spanner");
        assert_eq!(dialector().data_source().database, "d");
    }

    #[test]
    fn test_data_type_of() {
        let d = dialector();
        assert_eq!(
            d.data_type_of("singers", &FieldSchema::new("name", "String")).unwrap(),
            "STRING(MAX)"
        );
        assert_eq!(
            d.data_type_of("singers", &FieldSchema::new("name", "String").size(100)).unwrap(),
            "STRING(100)"
        );
        assert_eq!(
            d.data_type_of("singers", &FieldSchema::new("active", "Option<bool>")).unwrap(),
            "BOOL"
        );
        assert!(matches!(
            d.data_type_of("singers", &FieldSchema::new("x", "HashMap<String, i64>")),
            Err(OrmError::Schema(_))
        ));
    }

    #[test]
    fn test_default_string_size() {
        let d = SpannerDialector::new(
            Config::new("projects/p/instances/i/databases/d").default_string_size(256),
        )
        .unwrap();
        assert_eq!(
            d.data_type_of("singers", &FieldSchema::new("name", "String")).unwrap(),
            "STRING(256)"
        );
        assert_eq!(
            d.data_type_of("singers", &FieldSchema::new("name", "String").size(10)).unwrap(),
            "STRING(10)"
        );
        assert_eq!(
            d.data_type_of("singers", &FieldSchema::new("cover", "Vec<u8>")).unwrap(),
            "BYTES(MAX)"
        );
    }

    #[test]
    fn test_default_value_of() {
        let d = dialector();
        let field = FieldSchema::new("active", "bool").default_value("true");
        assert_eq!(d.default_value_of(&field).as_deref(), Some("TRUE"));
        let field = FieldSchema::new("name", "String").default_value("unknown");
        assert_eq!(d.default_value_of(&field).as_deref(), Some("\"unknown\""));
        let field = FieldSchema::new("name", "String").default_value("it's");
        assert_eq!(d.default_value_of(&field).as_deref(), Some("\"it's\""));
        let field = FieldSchema::new("name", "String").default_value("'quoted'");
        assert_eq!(d.default_value_of(&field).as_deref(), Some("'quoted'"));
        assert_eq!(d.default_value_of(&FieldSchema::new("name", "String")), None);
    }

    #[test]
    fn test_bind_and_quote() {
        let d = dialector();
        let mut sql = String::from("SELECT * FROM ");
        d.quote_to(&mut sql, "singers");
        sql.push_str(" WHERE ");
        d.quote_to(&mut sql, "id");
        sql.push_str(" = ");
        d.bind_var_to(&mut sql, 1);
        assert_eq!(sql, "SELECT * FROM `singers` WHERE `id` = @p1");
        assert_eq!(
            d.explain(&sql, &[SqlValue::Int64(7)]),
            "SELECT * FROM `singers` WHERE `id` = 7"
        );
    }

    #[test]
    fn test_unsupported_clauses() {
        let d = dialector();
        assert!(matches!(d.savepoint("sp1"), Err(OrmError::SavepointNotSupported)));
        assert!(matches!(d.rollback_to("sp1"), Err(OrmError::SavepointNotSupported)));
        assert!(matches!(
            d.on_conflict(&OnConflict::default()),
            Err(OrmError::Dialect(DialectError::Unsupported("ON CONFLICT")))
        ));
        assert_eq!(d.returning(&["id", "full_name"]).to_sql(), "THEN RETURN `id`,`full_name`");
    }

    #[test]
    fn test_locking_clause() {
        assert_eq!(dialector().locking(&Locking::for_update()).unwrap(), None);
        let strict = SpannerDialector::new(Config {
            disable_locking_clause: false,
            ..Config::new("projects/p/instances/i/databases/d")
        })
        .unwrap();
        assert!(matches!(
            strict.locking(&Locking::for_share()),
            Err(OrmError::Unsupported("FOR UPDATE"))
        ));
    }
}
