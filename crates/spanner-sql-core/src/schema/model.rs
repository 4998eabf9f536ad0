//! Reflected model metadata.
//!
//! A [`ModelSchema`] is what the derive macro (or a schema file) knows about
//! a model: its table, its fields in declaration order and the indexes,
//! foreign keys and interleaving it asks for. [`ModelSchemaBuilder::build`]
//! resolves names and primary keys so DDL generation can walk it directly.

use super::field_type::FieldType;
use super::naming::NamingStrategy;
use crate::error::SchemaError;

/// Action taken on child rows when a parent row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OnDelete {
    /// Delete the child rows too.
    Cascade,
    /// Reject the delete while child rows exist.
    #[default]
    NoAction,
}

impl OnDelete {
    /// Returns the SQL representation.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::NoAction => "NO ACTION",
        }
    }

    /// Parses `cascade` or `no action` (case-insensitive, `_` allowed).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('_', " ").as_str() {
            "cascade" => Some(Self::Cascade),
            "no action" => Some(Self::NoAction),
            _ => None,
        }
    }
}

/// A secondary index requested on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldIndex {
    /// Index name; fields sharing a name form one composite index.
    pub name: Option<String>,
    /// Whether the index is unique.
    pub unique: bool,
}

/// A foreign key declared on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldReference {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub column: String,
    /// Delete action.
    pub on_delete: Option<OnDelete>,
}

/// A model field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldSchema {
    /// Column name.
    pub name: String,
    /// Rust type as written on the struct.
    pub rust_type: String,
    /// Abstract type derived from `rust_type`.
    pub field_type: FieldType,
    /// Whether the Rust type is `Option<T>`.
    pub nullable: bool,
    /// Maximum length for STRING/BYTES columns.
    pub size: Option<u32>,
    /// Part of the primary key.
    pub primary_key: bool,
    /// Key generated by the database; `None` until resolved by the builder.
    pub auto_increment: Option<bool>,
    /// Explicit NOT NULL.
    pub not_null: bool,
    /// Values must be unique (backed by a unique index).
    pub unique: bool,
    /// Default value expression.
    pub default: Option<String>,
    /// Column type used verbatim instead of the mapped one.
    pub type_override: Option<String>,
    /// Never written by the ORM.
    pub read_only: bool,
    /// Computed by the database (`AS (...) STORED`).
    pub generated: bool,
    /// `OPTIONS (allow_commit_timestamp=true)`.
    pub commit_timestamp: bool,
    /// Indexes this field takes part in.
    pub indexes: Vec<FieldIndex>,
    /// Foreign key declared on this field.
    pub references: Option<FieldReference>,
}

impl FieldSchema {
    /// Creates a field from its column name and Rust type text.
    #[must_use]
    pub fn new(name: &str, rust_type: &str) -> Self {
        let (field_type, nullable) = FieldType::from_rust_type(rust_type);
        Self {
            name: String::from(name),
            rust_type: String::from(rust_type),
            field_type,
            nullable,
            size: None,
            primary_key: false,
            auto_increment: None,
            not_null: false,
            unique: false,
            default: None,
            type_override: None,
            read_only: false,
            generated: false,
            commit_timestamp: false,
            indexes: vec![],
            references: None,
        }
    }

    /// Marks the field as part of the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets whether the database generates the key value.
    #[must_use]
    pub const fn auto_increment(mut self, enabled: bool) -> Self {
        self.auto_increment = Some(enabled);
        self
    }

    /// Adds NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Requires unique values.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value expression.
    #[must_use]
    pub fn default_value(mut self, expr: &str) -> Self {
        self.default = Some(String::from(expr));
        self
    }

    /// Sets the STRING/BYTES length.
    #[must_use]
    pub const fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Uses `sql_type` verbatim as the column type.
    #[must_use]
    pub fn type_override(mut self, sql_type: &str) -> Self {
        self.type_override = Some(String::from(sql_type));
        self
    }

    /// Marks the field read-only.
    #[must_use]
    pub const fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Allows `PENDING_COMMIT_TIMESTAMP()` values.
    #[must_use]
    pub const fn commit_timestamp(mut self) -> Self {
        self.commit_timestamp = true;
        self
    }

    /// Adds the field to an index; `None` uses `idx_{table}_{column}`.
    #[must_use]
    pub fn index(mut self, name: Option<&str>) -> Self {
        self.indexes.push(FieldIndex {
            name: name.map(String::from),
            unique: false,
        });
        self
    }

    /// Adds the field to a unique index; `None` uses `idx_{table}_{column}`.
    #[must_use]
    pub fn unique_index(mut self, name: Option<&str>) -> Self {
        self.indexes.push(FieldIndex {
            name: name.map(String::from),
            unique: true,
        });
        self
    }

    /// Declares a foreign key to `table`.`column`.
    #[must_use]
    pub fn references(mut self, table: &str, column: &str) -> Self {
        self.references = Some(FieldReference {
            table: String::from(table),
            column: String::from(column),
            on_delete: None,
        });
        self
    }

    /// Sets the delete action of this field's foreign key.
    #[must_use]
    pub fn on_delete(mut self, action: OnDelete) -> Self {
        if let Some(reference) = self.references.as_mut() {
            reference.on_delete = Some(action);
        }
        self
    }

    /// Returns whether the database generates this field's key value.
    #[must_use]
    pub fn is_auto_increment(&self) -> bool {
        self.auto_increment == Some(true)
    }

    /// Returns whether the ORM writes this field on INSERT/UPDATE.
    #[must_use]
    pub const fn is_writable(&self) -> bool {
        !self.read_only && !self.generated
    }
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexSchema {
    /// Index name; empty until resolved.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// `UNIQUE`
    pub unique: bool,
    /// `NULL_FILTERED`
    pub null_filtered: bool,
    /// `STORING` columns.
    pub storing: Vec<String>,
}

impl IndexSchema {
    /// Creates an index; pass an empty name to derive it from the columns.
    #[must_use]
    pub fn new<S: AsRef<str>>(name: &str, columns: &[S]) -> Self {
        Self {
            name: String::from(name),
            columns: columns.iter().map(|c| String::from(c.as_ref())).collect(),
            unique: false,
            null_filtered: false,
            storing: vec![],
        }
    }

    /// Makes the index unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Makes the index NULL_FILTERED.
    #[must_use]
    pub const fn null_filtered(mut self) -> Self {
        self.null_filtered = true;
        self
    }

    /// Stores extra columns in the index.
    #[must_use]
    pub fn storing<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.storing = columns.iter().map(|c| String::from(c.as_ref())).collect();
        self
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForeignKeySchema {
    /// Constraint name; empty until resolved.
    pub name: String,
    /// Referencing columns.
    pub columns: Vec<String>,
    /// Referenced table.
    pub references_table: String,
    /// Referenced columns.
    pub references_columns: Vec<String>,
    /// Delete action.
    pub on_delete: Option<OnDelete>,
}

impl ForeignKeySchema {
    /// Creates a foreign key; pass an empty name to derive it.
    #[must_use]
    pub fn new<S: AsRef<str>>(
        name: &str,
        columns: &[S],
        references_table: &str,
        references_columns: &[S],
    ) -> Self {
        Self {
            name: String::from(name),
            columns: columns.iter().map(|c| String::from(c.as_ref())).collect(),
            references_table: String::from(references_table),
            references_columns: references_columns
                .iter()
                .map(|c| String::from(c.as_ref()))
                .collect(),
            on_delete: None,
        }
    }

    /// Sets the delete action.
    #[must_use]
    pub const fn on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = Some(action);
        self
    }
}

/// Interleaving of a table in its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interleave {
    /// Parent table.
    pub parent: String,
    /// Delete action for child rows.
    pub on_delete: OnDelete,
}

/// Resolved metadata of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelSchema {
    /// Rust struct name.
    pub name: String,
    /// Table name.
    pub table: String,
    /// Fields in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Secondary indexes.
    pub indexes: Vec<IndexSchema>,
    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKeySchema>,
    /// Parent table, for interleaved tables.
    pub interleave: Option<Interleave>,
    /// Primary key columns, in order.
    pub primary_key: Vec<String>,
}

impl ModelSchema {
    /// Starts building the schema of the struct `name`.
    #[must_use]
    pub fn builder(name: &str) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: String::from(name),
            table: None,
            naming: NamingStrategy::default(),
            fields: vec![],
            indexes: vec![],
            foreign_keys: vec![],
            interleave: None,
        }
    }

    /// Returns the field mapped to `column`.
    #[must_use]
    pub fn field(&self, column: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == column)
    }

    /// Returns the column names in field order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Returns the index named `name`.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<&IndexSchema> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Returns the tables this table must be created after.
    #[must_use]
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = vec![];
        if let Some(interleave) = &self.interleave {
            deps.push(interleave.parent.as_str());
        }
        for fk in &self.foreign_keys {
            if fk.references_table != self.table && !deps.contains(&fk.references_table.as_str()) {
                deps.push(fk.references_table.as_str());
            }
        }
        deps
    }
}

/// Builder for [`ModelSchema`].
#[derive(Debug, Clone)]
pub struct ModelSchemaBuilder {
    name: String,
    table: Option<String>,
    naming: NamingStrategy,
    fields: Vec<FieldSchema>,
    indexes: Vec<IndexSchema>,
    foreign_keys: Vec<ForeignKeySchema>,
    interleave: Option<Interleave>,
}

impl ModelSchemaBuilder {
    /// Sets an explicit table name.
    #[must_use]
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(String::from(table));
        self
    }

    /// Sets the naming strategy.
    #[must_use]
    pub fn naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    /// Splices the fields of an embedded model at this position.
    ///
    /// Index and foreign key names are resolved again against this table.
    #[must_use]
    pub fn embed(mut self, embedded: &ModelSchema) -> Self {
        self.fields.extend(embedded.fields.iter().cloned());
        self
    }

    /// Adds an explicit (possibly composite) index.
    #[must_use]
    pub fn index(mut self, index: IndexSchema) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds an explicit (possibly composite) foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeySchema) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    /// Interleaves the table in `parent`.
    #[must_use]
    pub fn interleave_in(mut self, parent: &str, on_delete: OnDelete) -> Self {
        self.interleave = Some(Interleave {
            parent: String::from(parent),
            on_delete,
        });
        self
    }

    /// Resolves names and keys and returns the schema.
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate columns, indexes or keys naming
    /// unknown columns, and interleaved tables without a primary key.
    pub fn build(self) -> Result<ModelSchema, SchemaError> {
        let table = self
            .table
            .clone()
            .unwrap_or_else(|| self.naming.table_name(&self.name));
        let mut fields = self.fields;

        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateColumn {
                    table,
                    column: field.name.clone(),
                });
            }
        }

        if !fields.iter().any(|f| f.primary_key) {
            if let Some(id) = fields.iter_mut().find(|f| f.name == "id") {
                id.primary_key = true;
            }
        }
        let primary_key: Vec<String> = fields
            .iter()
            .filter(|f| f.primary_key)
            .map(|f| f.name.clone())
            .collect();

        let single_key = primary_key.len() == 1;
        for field in &mut fields {
            if field.auto_increment.is_none() {
                field.auto_increment =
                    Some(field.primary_key && single_key && field.field_type == FieldType::Int);
            }
            let generated = field
                .type_override
                .as_deref()
                .is_some_and(|t| t.to_ascii_uppercase().contains(" AS ("));
            if generated {
                field.generated = true;
                field.read_only = true;
            }
        }

        let indexes = resolve_indexes(&self.naming, &table, &fields, self.indexes)?;
        let foreign_keys = resolve_foreign_keys(&self.naming, &table, &fields, self.foreign_keys)?;

        if self.interleave.is_some() && primary_key.is_empty() {
            return Err(SchemaError::InterleaveWithoutPrimaryKey(table));
        }

        Ok(ModelSchema {
            name: self.name,
            table,
            fields,
            indexes,
            foreign_keys,
            interleave: self.interleave,
            primary_key,
        })
    }
}

fn check_columns(
    table: &str,
    fields: &[FieldSchema],
    columns: &[String],
    context: &str,
) -> Result<(), SchemaError> {
    match columns.iter().find(|c| !fields.iter().any(|f| &f.name == *c)) {
        Some(missing) => Err(SchemaError::UnknownColumn {
            table: String::from(table),
            column: missing.clone(),
            context: String::from(context),
        }),
        None => Ok(()),
    }
}

fn resolve_indexes(
    naming: &NamingStrategy,
    table: &str,
    fields: &[FieldSchema],
    explicit: Vec<IndexSchema>,
) -> Result<Vec<IndexSchema>, SchemaError> {
    let mut indexes: Vec<IndexSchema> = vec![];

    for field in fields {
        for requested in &field.indexes {
            let name = requested
                .name
                .clone()
                .unwrap_or_else(|| naming.index_name(table, &field.name));
            match indexes.iter_mut().find(|i| i.name == name) {
                Some(existing) => {
                    existing.columns.push(field.name.clone());
                    existing.unique |= requested.unique;
                }
                None => {
                    let mut index = IndexSchema::new(&name, &[field.name.as_str()]);
                    index.unique = requested.unique;
                    indexes.push(index);
                }
            }
        }
    }

    for field in fields.iter().filter(|f| f.unique) {
        let covered = indexes
            .iter()
            .any(|i| i.unique && i.columns.len() == 1 && i.columns[0] == field.name);
        if !covered {
            let name = naming.index_name(table, &field.name);
            indexes.push(IndexSchema::new(&name, &[field.name.as_str()]).unique());
        }
    }

    for mut index in explicit {
        if index.name.is_empty() {
            index.name = naming.index_name(table, &index.columns.join("_"));
        }
        check_columns(table, fields, &index.columns, &index.name)?;
        check_columns(table, fields, &index.storing, &index.name)?;
        indexes.push(index);
    }

    Ok(indexes)
}

fn resolve_foreign_keys(
    naming: &NamingStrategy,
    table: &str,
    fields: &[FieldSchema],
    explicit: Vec<ForeignKeySchema>,
) -> Result<Vec<ForeignKeySchema>, SchemaError> {
    let mut foreign_keys: Vec<ForeignKeySchema> = fields
        .iter()
        .filter_map(|field| {
            field.references.as_ref().map(|reference| ForeignKeySchema {
                name: naming.foreign_key_name(table, &naming.relation_name(&field.name)),
                columns: vec![field.name.clone()],
                references_table: reference.table.clone(),
                references_columns: vec![reference.column.clone()],
                on_delete: reference.on_delete,
            })
        })
        .collect();

    for mut fk in explicit {
        if fk.name.is_empty() {
            let first = fk.columns.first().map_or("", String::as_str);
            fk.name = naming.foreign_key_name(table, &naming.relation_name(first));
        }
        check_columns(table, fields, &fk.columns, &fk.name)?;
        foreign_keys.push(fk);
    }

    Ok(foreign_keys)
}
