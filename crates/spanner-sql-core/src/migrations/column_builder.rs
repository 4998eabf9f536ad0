//! Spanner column types, defaults and column definitions.

use crate::builder::value::quote_string;
use crate::error::SchemaError;
use crate::schema::{FieldSchema, FieldType};

/// Largest STRING length before `MAX` is used instead.
pub const MAX_STRING_LENGTH: u32 = 2_621_440;
/// Largest BYTES length before `MAX` is used instead.
pub const MAX_BYTES_LENGTH: u32 = 10_485_760;

/// A Spanner column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpannerType {
    /// `BOOL`
    Bool,
    /// `INT64`
    Int64,
    /// `FLOAT64`
    Float64,
    /// `FLOAT32`
    Float32,
    /// `STRING(n)`; `None` is `STRING(MAX)`.
    String(Option<u32>),
    /// `BYTES(n)`; `None` is `BYTES(MAX)`.
    Bytes(Option<u32>),
    /// `TIMESTAMP`
    Timestamp,
    /// `DATE`
    Date,
    /// `NUMERIC`
    Numeric,
    /// `JSON`
    Json,
    /// `ARRAY<T>`
    Array(Box<SpannerType>),
    /// A type written out verbatim.
    Custom(String),
}

impl SpannerType {
    /// Returns the DDL spelling of the type.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Bool => String::from("BOOL"),
            Self::Int64 => String::from("INT64"),
            Self::Float64 => String::from("FLOAT64"),
            Self::Float32 => String::from("FLOAT32"),
            Self::String(len) => format!("STRING({})", length_sql(*len)),
            Self::Bytes(len) => format!("BYTES({})", length_sql(*len)),
            Self::Timestamp => String::from("TIMESTAMP"),
            Self::Date => String::from("DATE"),
            Self::Numeric => String::from("NUMERIC"),
            Self::Json => String::from("JSON"),
            Self::Array(inner) => format!("ARRAY<{}>", inner.to_sql()),
            Self::Custom(sql) => sql.clone(),
        }
    }

    /// Maps an abstract field type. Returns `None` for unknown types.
    #[must_use]
    pub fn from_field_type(field_type: &FieldType, size: Option<u32>) -> Option<Self> {
        let ty = match field_type {
            FieldType::Bool => Self::Bool,
            FieldType::Int => Self::Int64,
            FieldType::Float64 => Self::Float64,
            FieldType::Float32 => Self::Float32,
            FieldType::String => Self::String(bounded(size, MAX_STRING_LENGTH)),
            FieldType::Bytes => Self::Bytes(bounded(size, MAX_BYTES_LENGTH)),
            FieldType::Timestamp => Self::Timestamp,
            FieldType::Date => Self::Date,
            FieldType::Json => Self::Json,
            FieldType::Numeric => Self::Numeric,
            FieldType::Array(inner) => Self::Array(Box::new(Self::from_field_type(inner, None)?)),
            FieldType::Unknown(_) => return None,
        };
        Some(ty)
    }
}

fn bounded(size: Option<u32>, max: u32) -> Option<u32> {
    size.filter(|&n| n > 0 && n <= max)
}

fn length_sql(len: Option<u32>) -> String {
    len.map_or_else(|| String::from("MAX"), |n| n.to_string())
}

/// Default value for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// NULL default.
    Null,
    /// Boolean default.
    Boolean(bool),
    /// Integer default.
    Integer(i64),
    /// Float default.
    Float(f64),
    /// String default.
    String(String),
    /// Timestamp literal default.
    Timestamp(String),
    /// Date literal default.
    Date(String),
    /// Raw SQL expression (e.g. `CURRENT_TIMESTAMP()`).
    Expression(String),
}

impl DefaultValue {
    /// Interprets a default written on a model field.
    ///
    /// Numbers and booleans become literals for numeric and boolean
    /// columns. Text is quoted unless it is already a quoted literal or
    /// looks like a function call.
    #[must_use]
    pub fn from_field_default(expr: &str, field_type: &FieldType) -> Self {
        let trimmed = expr.trim();
        if trimmed.eq_ignore_ascii_case("null") {
            return Self::Null;
        }
        if is_quoted(trimmed) || is_call(trimmed) {
            return Self::Expression(String::from(trimmed));
        }
        match field_type {
            FieldType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Self::Boolean(true),
                "false" => Self::Boolean(false),
                _ => Self::Expression(String::from(trimmed)),
            },
            FieldType::Int => trimmed
                .parse()
                .map_or_else(|_| Self::Expression(String::from(trimmed)), Self::Integer),
            FieldType::Float64 | FieldType::Float32 => trimmed
                .parse()
                .map_or_else(|_| Self::Expression(String::from(trimmed)), Self::Float),
            FieldType::String | FieldType::Json => Self::String(String::from(trimmed)),
            FieldType::Timestamp => Self::Timestamp(String::from(trimmed)),
            FieldType::Date => Self::Date(String::from(trimmed)),
            _ => Self::Expression(String::from(trimmed)),
        }
    }

    /// Returns the SQL representation of the default value.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Boolean(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => quote_string(s),
            Self::Timestamp(s) => format!("TIMESTAMP {}", quote_string(s)),
            Self::Date(s) => format!("DATE {}", quote_string(s)),
            Self::Expression(expr) => expr.clone(),
        }
    }
}

fn is_quoted(s: &str) -> bool {
    s.len() >= 2
        && ((s.starts_with('\'') && s.ends_with('\'')) || (s.starts_with('"') && s.ends_with('"')))
}

fn is_call(s: &str) -> bool {
    s.ends_with(')') && s.contains('(')
}

/// A complete column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Column type.
    pub data_type: SpannerType,
    /// Whether NOT NULL is emitted.
    pub not_null: bool,
    /// Default value.
    pub default: Option<DefaultValue>,
    /// `AS (expr) STORED` expression of a generated column.
    pub generated: Option<String>,
    /// Whether the column accepts commit timestamps.
    pub commit_timestamp: bool,
}

impl ColumnDefinition {
    /// Creates a new nullable column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: SpannerType) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null: false,
            default: None,
            generated: None,
            commit_timestamp: false,
        }
    }

    /// Builds the definition of a model field of `table`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::UnsupportedType` when the field type has no
    /// Spanner mapping and no explicit type.
    pub fn from_field(table: &str, field: &FieldSchema) -> Result<Self, SchemaError> {
        let mut generated = None;
        let data_type = match &field.type_override {
            Some(custom) => match split_generated(custom) {
                Some((ty, expr)) => {
                    generated = Some(String::from(expr));
                    SpannerType::Custom(String::from(ty))
                }
                None => SpannerType::Custom(custom.clone()),
            },
            None => SpannerType::from_field_type(&field.field_type, field.size).ok_or_else(|| {
                SchemaError::UnsupportedType {
                    table: String::from(table),
                    column: field.name.clone(),
                    rust_type: field.rust_type.clone(),
                }
            })?,
        };
        let default = if generated.is_some() {
            None
        } else {
            field
                .default
                .as_deref()
                .map(|d| DefaultValue::from_field_default(d, &field.field_type))
        };
        Ok(Self {
            name: field.name.clone(),
            data_type,
            not_null: field.not_null,
            default,
            generated,
            commit_timestamp: field.commit_timestamp,
        })
    }
}

/// Splits `TYPE AS (expr) STORED` into the type and the `AS ...` part.
fn split_generated(custom: &str) -> Option<(&str, &str)> {
    let pos = custom.to_ascii_uppercase().find(" AS (")?;
    Some((custom[..pos].trim_end(), custom[pos + 1..].trim()))
}

/// Fluent column definition builder for hand-written migrations.
#[derive(Debug, Clone)]
pub struct ColumnBuilder {
    def: ColumnDefinition,
}

impl ColumnBuilder {
    /// Creates a new column builder with name and type.
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: SpannerType) -> Self {
        Self {
            def: ColumnDefinition::new(name, data_type),
        }
    }

    /// Marks the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.def.not_null = true;
        self
    }

    /// Sets a boolean default value.
    #[must_use]
    pub fn default_bool(mut self, value: bool) -> Self {
        self.def.default = Some(DefaultValue::Boolean(value));
        self
    }

    /// Sets an integer default value.
    #[must_use]
    pub fn default_int(mut self, value: i64) -> Self {
        self.def.default = Some(DefaultValue::Integer(value));
        self
    }

    /// Sets a float default value.
    #[must_use]
    pub fn default_float(mut self, value: f64) -> Self {
        self.def.default = Some(DefaultValue::Float(value));
        self
    }

    /// Sets a string default value.
    #[must_use]
    pub fn default_str(mut self, value: impl Into<String>) -> Self {
        self.def.default = Some(DefaultValue::String(value.into()));
        self
    }

    /// Sets a raw SQL expression as default (e.g. `CURRENT_TIMESTAMP()`).
    #[must_use]
    pub fn default_expr(mut self, expr: impl Into<String>) -> Self {
        self.def.default = Some(DefaultValue::Expression(expr.into()));
        self
    }

    /// Makes this a stored generated column computed from `expr`.
    #[must_use]
    pub fn generated(mut self, expr: impl Into<String>) -> Self {
        self.def.generated = Some(format!("AS ({}) STORED", expr.into()));
        self.def.default = None;
        self
    }

    /// Allows commit timestamps in this column.
    #[must_use]
    pub const fn commit_timestamp(mut self) -> Self {
        self.def.commit_timestamp = true;
        self
    }

    /// Builds the column definition.
    #[must_use]
    pub fn build(self) -> ColumnDefinition {
        self.def
    }
}

/// Creates a BOOL column builder.
#[must_use]
pub fn boolean(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Bool)
}

/// Creates an INT64 column builder.
#[must_use]
pub fn int64(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Int64)
}

/// Creates a FLOAT64 column builder.
#[must_use]
pub fn float64(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Float64)
}

/// Creates a FLOAT32 column builder.
#[must_use]
pub fn float32(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Float32)
}

/// Creates a STRING column builder; `None` is `STRING(MAX)`.
#[must_use]
pub fn string(name: impl Into<String>, len: Option<u32>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::String(bounded(len, MAX_STRING_LENGTH)))
}

/// Creates a BYTES column builder; `None` is `BYTES(MAX)`.
#[must_use]
pub fn bytes(name: impl Into<String>, len: Option<u32>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Bytes(bounded(len, MAX_BYTES_LENGTH)))
}

/// Creates a TIMESTAMP column builder.
#[must_use]
pub fn timestamp(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Timestamp)
}

/// Creates a DATE column builder.
#[must_use]
pub fn date(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Date)
}

/// Creates a NUMERIC column builder.
#[must_use]
pub fn numeric(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Numeric)
}

/// Creates a JSON column builder.
#[must_use]
pub fn json(name: impl Into<String>) -> ColumnBuilder {
    ColumnBuilder::new(name, SpannerType::Json)
}
