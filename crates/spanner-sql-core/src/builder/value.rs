//! SQL values and parameter handling.
//!
//! Values travel as statement parameters. `to_sql_inline` exists for
//! `Dialect::explain` and for literal column defaults in DDL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::schema::RowError;

/// A Spanner value that can be used as a parameter or read from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// BOOL value.
    Bool(bool),
    /// INT64 value.
    Int64(i64),
    /// FLOAT64 value.
    Float64(f64),
    /// FLOAT32 value.
    Float32(f32),
    /// STRING value.
    String(String),
    /// BYTES value.
    Bytes(Vec<u8>),
    /// TIMESTAMP value, always UTC.
    Timestamp(DateTime<Utc>),
    /// DATE value.
    Date(NaiveDate),
    /// NUMERIC value in its canonical decimal text form.
    Numeric(String),
    /// JSON value in its text form.
    Json(String),
    /// ARRAY value.
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Returns the GoogleSQL literal for inline use.
    ///
    /// **Warning**: Prefer parameters; this is for logging and DDL defaults.
    #[must_use]
    pub fn to_sql_inline(&self) -> String {
        match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => {
                if *b {
                    String::from("TRUE")
                } else {
                    String::from("FALSE")
                }
            }
            Self::Int64(n) => n.to_string(),
            Self::Float64(f) => float_literal(*f, "FLOAT64"),
            Self::Float32(f) => format!("CAST({} AS FLOAT32)", float_literal(f64::from(*f), "FLOAT64")),
            Self::String(s) => quote_string(s),
            Self::Bytes(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02x}")).collect();
                format!("FROM_HEX('{hex}')")
            }
            Self::Timestamp(ts) => format!(
                "TIMESTAMP '{}'",
                ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
            ),
            Self::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
            Self::Numeric(n) => format!("NUMERIC '{n}'"),
            Self::Json(j) => format!("JSON '{}'", j.replace('\\', "\\\\").replace('\'', "\\'")),
            Self::Array(items) => {
                let parts: Vec<String> = items.iter().map(Self::to_sql_inline).collect();
                format!("[{}]", parts.join(", "))
            }
        }
    }

    /// Returns whether this is NULL.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns whether this is the zero value of its type.
    ///
    /// The ORM leaves zero-valued keys out of INSERTs when the column has a
    /// database default, so the database can fill them in.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Int64(n) => *n == 0,
            Self::Float64(f) => *f == 0.0,
            Self::Float32(f) => *f == 0.0,
            Self::String(s) | Self::Numeric(s) | Self::Json(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Array(items) => items.is_empty(),
            Self::Timestamp(ts) => ts.timestamp() == 0 && ts.timestamp_subsec_nanos() == 0,
            Self::Date(_) => false,
        }
    }

    /// Returns the Spanner type name of this value, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool(_) => "BOOL",
            Self::Int64(_) => "INT64",
            Self::Float64(_) => "FLOAT64",
            Self::Float32(_) => "FLOAT32",
            Self::String(_) => "STRING",
            Self::Bytes(_) => "BYTES",
            Self::Timestamp(_) => "TIMESTAMP",
            Self::Date(_) => "DATE",
            Self::Numeric(_) => "NUMERIC",
            Self::Json(_) => "JSON",
            Self::Array(_) => "ARRAY",
        }
    }
}

fn float_literal(f: f64, type_name: &str) -> String {
    if f.is_nan() {
        format!("CAST('nan' AS {type_name})")
    } else if f.is_infinite() {
        let sign = if f.is_sign_negative() { "-" } else { "" };
        format!("CAST('{sign}inf' AS {type_name})")
    } else {
        format!("{f}")
    }
}

/// Quotes a GoogleSQL string literal.
#[must_use]
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// A JSON document stored in a `JSON` column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json(pub String);

/// An exact decimal stored in a `NUMERIC` column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Numeric(pub String);

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

/// Trait for types that can be read back from SQL values.
pub trait FromSqlValue: Sized {
    /// Converts a `SqlValue` into `Self`.
    ///
    /// # Errors
    ///
    /// Returns an error when the value has an incompatible type or is out of range.
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError>;
}

fn mismatch(expected: &'static str, found: &SqlValue) -> RowError {
    RowError::Conversion {
        expected,
        found: found.type_name(),
    }
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        Ok(value)
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Bool(b) => Ok(b),
            other => Err(mismatch("BOOL", &other)),
        }
    }
}

macro_rules! impl_small_int {
    ($($t:ty),+) => {
        $(
            impl ToSqlValue for $t {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Int64(i64::from(self))
                }
            }

            impl FromSqlValue for $t {
                fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
                    match value {
                        SqlValue::Int64(n) => <$t>::try_from(n).map_err(|_| RowError::OutOfRange {
                            target: stringify!($t),
                            value: n.to_string(),
                        }),
                        other => Err(mismatch("INT64", &other)),
                    }
                }
            }
        )+
    };
}

impl_small_int!(i8, i16, i32, u8, u16, u32);

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int64(self)
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Int64(n) => Ok(n),
            other => Err(mismatch("INT64", &other)),
        }
    }
}

macro_rules! impl_wide_unsigned {
    ($($t:ty),+) => {
        $(
            impl ToSqlValue for $t {
                fn to_sql_value(self) -> SqlValue {
                    i64::try_from(self).map_or_else(|_| SqlValue::Numeric(self.to_string()), SqlValue::Int64)
                }
            }

            impl FromSqlValue for $t {
                fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
                    match value {
                        SqlValue::Int64(n) => <$t>::try_from(n).map_err(|_| RowError::OutOfRange {
                            target: stringify!($t),
                            value: n.to_string(),
                        }),
                        SqlValue::Numeric(s) => s.parse::<$t>().map_err(|_| RowError::OutOfRange {
                            target: stringify!($t),
                            value: s,
                        }),
                        other => Err(mismatch("INT64", &other)),
                    }
                }
            }
        )+
    };
}

impl_wide_unsigned!(u64, usize);

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float64(self)
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Float64(f) => Ok(f),
            SqlValue::Float32(f) => Ok(Self::from(f)),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int64(n) => Ok(n as Self),
            other => Err(mismatch("FLOAT64", &other)),
        }
    }
}

impl ToSqlValue for f32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float32(self)
    }
}

impl FromSqlValue for f32 {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Float32(f) => Ok(f),
            #[allow(clippy::cast_possible_truncation)]
            SqlValue::Float64(f) => Ok(f as Self),
            other => Err(mismatch("FLOAT32", &other)),
        }
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::String(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::String(String::from(self))
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::String(s) | SqlValue::Json(s) | SqlValue::Numeric(s) => Ok(s),
            other => Err(mismatch("STRING", &other)),
        }
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bytes(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bytes(self.to_vec())
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Bytes(b) => Ok(b),
            other => Err(mismatch("BYTES", &other)),
        }
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self)
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Timestamp(ts) => Ok(ts),
            other => Err(mismatch("TIMESTAMP", &other)),
        }
    }
}

impl ToSqlValue for NaiveDateTime {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self.and_utc())
    }
}

impl FromSqlValue for NaiveDateTime {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Timestamp(ts) => Ok(ts.naive_utc()),
            other => Err(mismatch("TIMESTAMP", &other)),
        }
    }
}

impl ToSqlValue for NaiveDate {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Date(self)
    }
}

impl FromSqlValue for NaiveDate {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Date(d) => Ok(d),
            other => Err(mismatch("DATE", &other)),
        }
    }
}

impl ToSqlValue for Json {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Json(self.0)
    }
}

impl FromSqlValue for Json {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Json(s) | SqlValue::String(s) => Ok(Self(s)),
            other => Err(mismatch("JSON", &other)),
        }
    }
}

impl ToSqlValue for Numeric {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Numeric(self.0)
    }
}

impl FromSqlValue for Numeric {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Numeric(s) | SqlValue::String(s) => Ok(Self(s)),
            SqlValue::Int64(n) => Ok(Self(n.to_string())),
            other => Err(mismatch("NUMERIC", &other)),
        }
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

macro_rules! impl_array {
    ($($t:ty),+) => {
        $(
            impl ToSqlValue for Vec<$t> {
                fn to_sql_value(self) -> SqlValue {
                    SqlValue::Array(self.into_iter().map(ToSqlValue::to_sql_value).collect())
                }
            }

            impl FromSqlValue for Vec<$t> {
                fn from_sql_value(value: SqlValue) -> Result<Self, RowError> {
                    match value {
                        SqlValue::Array(items) => items.into_iter().map(<$t>::from_sql_value).collect(),
                        other => Err(mismatch("ARRAY", &other)),
                    }
                }
            }
        )+
    };
}

impl_array!(bool, i64, f64, String, NaiveDate, DateTime<Utc>);
