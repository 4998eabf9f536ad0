//! Schema files.
//!
//! A schema file describes models in JSON, for use without the derive
//! macro (the CLI reads one). Field entries are either a field or an
//! `{"embed": "Model"}` marker that splices another model's fields at that
//! position. Models marked `"abstract": true` only exist to be embedded.
//!
//! ```json
//! {
//!   "models": [
//!     { "name": "BaseModel", "abstract": true, "fields": [
//!         { "name": "id", "type": "i64" },
//!         { "name": "deleted_at", "type": "Option<DateTime<Utc>>", "index": true }
//!     ]},
//!     { "name": "Singer", "fields": [
//!         { "embed": "BaseModel" },
//!         { "name": "last_name", "type": "String", "not_null": true, "size": 200 }
//!     ]}
//!   ]
//! }
//! ```
//!
//! Tables named by `interleave_in` and `references` may be given as a model
//! name; they resolve to that model's table.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use spanner_sql_core::schema::{
    FieldSchema, ForeignKeySchema, IndexSchema, ModelSchema, NamingStrategy, OnDelete,
};

use crate::error::{MigrateError, Result};

/// Top-level schema file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    /// Models in creation order (dependencies are reordered by the migrator).
    pub models: Vec<ModelDef>,
}

/// A model in a schema file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDef {
    /// Struct name.
    pub name: String,
    /// Explicit table name.
    #[serde(default)]
    pub table: Option<String>,
    /// Only used through `embed`.
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    /// Parent table for interleaving.
    #[serde(default)]
    pub interleave_in: Option<InterleaveDef>,
    /// Fields and embeds, in column order.
    #[serde(default)]
    pub fields: Vec<FieldEntry>,
    /// Composite indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDef>,
    /// Composite foreign keys.
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDef>,
}

/// A field or an embedded model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    /// Splices the fields of another model.
    Embed {
        /// Embedded model name.
        embed: String,
    },
    /// A column.
    Field(Box<FieldDef>),
}

/// Index request on a field: `true` or an index name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexFlag {
    /// Index under the default name when `true`.
    Enabled(bool),
    /// Index under this name; fields sharing it form a composite index.
    Named(String),
}

impl IndexFlag {
    fn name(&self) -> Option<Option<&str>> {
        match self {
            Self::Enabled(true) => Some(None),
            Self::Enabled(false) => None,
            Self::Named(name) => Some(Some(name.as_str())),
        }
    }
}

/// A column in a schema file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Column name.
    pub name: String,
    /// Rust type text, as the derive would see it.
    #[serde(rename = "type")]
    pub rust_type: String,
    /// Column type used verbatim.
    #[serde(default)]
    pub sql_type: Option<String>,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub auto_increment: Option<bool>,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub index: Option<IndexFlag>,
    #[serde(default)]
    pub unique_index: Option<IndexFlag>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub commit_timestamp: bool,
    /// Foreign key on this column.
    #[serde(default)]
    pub references: Option<ReferenceDef>,
}

/// A single-column foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDef {
    /// Referenced model or table.
    pub table: String,
    /// Referenced column.
    #[serde(default = "default_reference_column")]
    pub column: String,
    #[serde(default)]
    pub on_delete: Option<OnDelete>,
}

fn default_reference_column() -> String {
    String::from("id")
}

/// Interleaving of a model in a parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterleaveDef {
    /// Parent model or table.
    pub parent: String,
    #[serde(default)]
    pub on_delete: OnDelete,
}

/// A composite index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub null_filtered: bool,
    #[serde(default)]
    pub storing: Vec<String>,
}

/// A composite foreign key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub name: String,
    pub columns: Vec<String>,
    /// Referenced model or table.
    pub references_table: String,
    pub references_columns: Vec<String>,
    #[serde(default)]
    pub on_delete: Option<OnDelete>,
}

impl FieldDef {
    fn to_field_schema(&self, tables: &HashMap<&str, String>) -> FieldSchema {
        let mut field = FieldSchema::new(&self.name, &self.rust_type);
        if self.primary_key {
            field = field.primary_key();
        }
        if let Some(enabled) = self.auto_increment {
            field = field.auto_increment(enabled);
        }
        if self.not_null {
            field = field.not_null();
        }
        if self.unique {
            field = field.unique();
        }
        if let Some(name) = self.index.as_ref().and_then(IndexFlag::name) {
            field = field.index(name);
        }
        if let Some(name) = self.unique_index.as_ref().and_then(IndexFlag::name) {
            field = field.unique_index(name);
        }
        if let Some(size) = self.size {
            field = field.size(size);
        }
        if let Some(sql_type) = &self.sql_type {
            field = field.type_override(sql_type);
        }
        if let Some(default) = &self.default {
            field = field.default_value(default);
        }
        if self.read_only {
            field = field.read_only();
        }
        if self.commit_timestamp {
            field = field.commit_timestamp();
        }
        if let Some(reference) = &self.references {
            field = field.references(resolve_table(tables, &reference.table), &reference.column);
            if let Some(action) = reference.on_delete {
                field = field.on_delete(action);
            }
        }
        field
    }
}

fn resolve_table<'a>(tables: &'a HashMap<&str, String>, name: &'a str) -> &'a str {
    tables.get(name).map_or(name, String::as_str)
}

impl SchemaFile {
    /// Parses a schema file from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `MigrateError::Serialization` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Resolves every non-abstract model into a `ModelSchema`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown or cyclic embeds and for models the
    /// schema builder rejects.
    pub fn to_model_schemas(&self) -> Result<Vec<ModelSchema>> {
        let naming = NamingStrategy::default();
        let tables: HashMap<&str, String> = self
            .models
            .iter()
            .map(|m| {
                let table = m.table.clone().unwrap_or_else(|| naming.table_name(&m.name));
                (m.name.as_str(), table)
            })
            .collect();

        self.models
            .iter()
            .filter(|m| !m.is_abstract)
            .map(|m| self.resolve(m, &tables, &mut vec![]))
            .collect()
    }

    fn model(&self, name: &str) -> Option<&ModelDef> {
        self.models.iter().find(|m| m.name == name)
    }

    fn resolve(
        &self,
        model: &ModelDef,
        tables: &HashMap<&str, String>,
        embedding: &mut Vec<String>,
    ) -> Result<ModelSchema> {
        if embedding.contains(&model.name) {
            embedding.push(model.name.clone());
            return Err(MigrateError::CircularDependency(embedding.clone()));
        }
        embedding.push(model.name.clone());

        let mut builder = ModelSchema::builder(&model.name);
        if let Some(table) = &model.table {
            builder = builder.table(table);
        }
        for entry in &model.fields {
            builder = match entry {
                FieldEntry::Field(field) => builder.field(field.to_field_schema(tables)),
                FieldEntry::Embed { embed } => {
                    let embedded = self.model(embed).ok_or_else(|| MigrateError::UnknownEmbed {
                        model: model.name.clone(),
                        embed: embed.clone(),
                    })?;
                    builder.embed(&self.resolve(embedded, tables, embedding)?)
                }
            };
        }
        for index in &model.indexes {
            let mut schema = IndexSchema::new(&index.name, &index.columns).storing(&index.storing);
            schema.unique = index.unique;
            schema.null_filtered = index.null_filtered;
            builder = builder.index(schema);
        }
        for fk in &model.foreign_keys {
            let mut schema = ForeignKeySchema::new(
                &fk.name,
                &fk.columns,
                resolve_table(tables, &fk.references_table),
                &fk.references_columns,
            );
            schema.on_delete = fk.on_delete;
            builder = builder.foreign_key(schema);
        }
        if let Some(interleave) = &model.interleave_in {
            builder =
                builder.interleave_in(resolve_table(tables, &interleave.parent), interleave.on_delete);
        }

        embedding.pop();
        Ok(builder.build()?)
    }
}

/// Loads the models of a schema file.
///
/// # Errors
///
/// Returns `MigrateError::SchemaFile` when the file cannot be read or parsed,
/// and the errors of [`SchemaFile::to_model_schemas`].
pub fn load_schema_file(path: &Path) -> Result<Vec<ModelSchema>> {
    let text = std::fs::read_to_string(path).map_err(|e| MigrateError::SchemaFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let file: SchemaFile = serde_json::from_str(&text).map_err(|e| MigrateError::SchemaFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    file.to_model_schemas()
}

#[cfg(test)]
mod tests {
    use super::*;
    use spanner_sql_core::migrations::ddl_for_model;

    const SINGERS: &str = r#"{
      "models": [
        { "name": "BaseModel", "abstract": true, "fields": [
            { "name": "id", "type": "i64" },
            { "name": "created_at", "type": "DateTime<Utc>" },
            { "name": "updated_at", "type": "DateTime<Utc>" },
            { "name": "deleted_at", "type": "Option<DateTime<Utc>>", "index": true }
        ]},
        { "name": "Singer", "fields": [
            { "embed": "BaseModel" },
            { "name": "first_name", "type": "Option<String>" },
            { "name": "last_name", "type": "String", "not_null": true },
            { "name": "full_name", "type": "String",
              "sql_type": "STRING(MAX) AS (ARRAY_TO_STRING([first_name, last_name], \" \")) STORED" },
            { "name": "active", "type": "bool" }
        ]},
        { "name": "Album", "fields": [
            { "embed": "BaseModel" },
            { "name": "title", "type": "String" },
            { "name": "marketing_budget", "type": "Option<Numeric>" },
            { "name": "release_date", "type": "Option<NaiveDate>" },
            { "name": "cover_picture", "type": "Option<Vec<u8>>" },
            { "name": "singer_id", "type": "i64",
              "references": { "table": "Singer" } }
        ]}
      ]
    }"#;

    #[test]
    fn test_abstract_models_are_not_tables() {
        let models = SchemaFile::from_json(SINGERS).unwrap().to_model_schemas().unwrap();
        let tables: Vec<&str> = models.iter().map(|m| m.table.as_str()).collect();
        assert_eq!(tables, vec!["singers", "albums"]);
    }

    #[test]
    fn test_embedded_fields_keep_position() {
        let models = SchemaFile::from_json(SINGERS).unwrap().to_model_schemas().unwrap();
        assert_eq!(
            models[0].column_names(),
            vec![
                "id",
                "created_at",
                "updated_at",
                "deleted_at",
                "first_name",
                "last_name",
                "full_name",
                "active"
            ]
        );
        assert_eq!(
            ddl_for_model(&models[0]).unwrap()[1],
            "CREATE INDEX `idx_singers_deleted_at` ON `singers`(`deleted_at`)"
        );
    }

    #[test]
    fn test_references_resolve_model_names() {
        let models = SchemaFile::from_json(SINGERS).unwrap().to_model_schemas().unwrap();
        let album = &models[1];
        assert_eq!(album.foreign_keys.len(), 1);
        assert_eq!(album.foreign_keys[0].references_table, "singers");
        assert_eq!(album.foreign_keys[0].references_columns, vec!["id"]);
        assert_eq!(album.dependencies(), vec!["singers"]);
    }

    #[test]
    fn test_interleave_and_composite_index() {
        let json = r#"{
          "models": [
            { "name": "Album", "fields": [{ "name": "id", "type": "i64" }] },
            { "name": "Track", "interleave_in": { "parent": "Album", "on_delete": "cascade" },
              "fields": [
                { "name": "id", "type": "i64", "primary_key": true },
                { "name": "track_number", "type": "i64", "primary_key": true },
                { "name": "title", "type": "String", "index": "idx_tracks_title_number" }
              ],
              "indexes": [
                { "name": "idx_tracks_number", "columns": ["track_number"], "storing": ["title"] }
              ]
            }
          ]
        }"#;
        let models = SchemaFile::from_json(json).unwrap().to_model_schemas().unwrap();
        let track = &models[1];
        assert_eq!(track.interleave.as_ref().unwrap().parent, "albums");
        assert_eq!(track.interleave.as_ref().unwrap().on_delete, OnDelete::Cascade);
        assert_eq!(track.primary_key, vec!["id", "track_number"]);
        assert!(track.index("idx_tracks_title_number").is_some());
        assert_eq!(track.index("idx_tracks_number").unwrap().storing, vec!["title"]);
    }

    #[test]
    fn test_unknown_embed() {
        let json = r#"{ "models": [ { "name": "Singer", "fields": [ { "embed": "Missing" } ] } ] }"#;
        let err = SchemaFile::from_json(json).unwrap().to_model_schemas().unwrap_err();
        assert!(matches!(err, MigrateError::UnknownEmbed { model, embed } if model == "Singer" && embed == "Missing"));
    }

    #[test]
    fn test_cyclic_embed() {
        let json = r#"{ "models": [
            { "name": "A", "fields": [ { "embed": "B" } ] },
            { "name": "B", "abstract": true, "fields": [ { "embed": "A" } ] }
        ] }"#;
        let err = SchemaFile::from_json(json).unwrap().to_model_schemas().unwrap_err();
        assert!(matches!(err, MigrateError::CircularDependency(names) if names == vec!["A", "B", "A"]));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SchemaFile::from_json("{ \"models\": 3 }"),
            Err(MigrateError::Serialization(_))
        ));
    }
}
