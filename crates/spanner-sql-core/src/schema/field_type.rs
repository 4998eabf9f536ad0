//! Mapping from Rust field types to abstract column types.

/// The abstract type of a model field, before dialect mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FieldType {
    /// Boolean.
    Bool,
    /// Any integer width.
    Int,
    /// 64-bit float.
    Float64,
    /// 32-bit float.
    Float32,
    /// Text.
    String,
    /// Binary data.
    Bytes,
    /// Point in time.
    Timestamp,
    /// Calendar date.
    Date,
    /// JSON document.
    Json,
    /// Exact decimal.
    Numeric,
    /// Array of another type.
    Array(Box<FieldType>),
    /// A type with no known mapping; carries the Rust type text.
    Unknown(String),
}

impl FieldType {
    /// Maps Rust type text (as written on a struct field) to a field type.
    ///
    /// Returns the type and whether the field is nullable (`Option<T>`).
    #[must_use]
    pub fn from_rust_type(rust_type: &str) -> (Self, bool) {
        let compact: String = rust_type.chars().filter(|c| !c.is_whitespace()).collect();
        match generic_argument(&compact, "Option") {
            Some(inner) => (Self::from_non_optional(inner), true),
            None => (Self::from_non_optional(&compact), false),
        }
    }

    fn from_non_optional(ty: &str) -> Self {
        if let Some(inner) = generic_argument(ty, "Vec") {
            let inner = generic_argument(inner, "Option").unwrap_or(inner);
            return match last_segment(inner) {
                "u8" => Self::Bytes,
                _ => Self::Array(Box::new(Self::from_non_optional(inner))),
            };
        }
        if ty == "&[u8]" || ty == "[u8]" {
            return Self::Bytes;
        }
        let base = ty.split('<').next().unwrap_or(ty);
        match last_segment(base) {
            "bool" => Self::Bool,
            "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
            | "u128" | "usize" => Self::Int,
            "f64" => Self::Float64,
            "f32" => Self::Float32,
            "String" | "&str" | "str" | "char" | "Uuid" => Self::String,
            "DateTime" | "NaiveDateTime" | "SystemTime" => Self::Timestamp,
            "NaiveDate" => Self::Date,
            "Json" | "Value" => Self::Json,
            "Numeric" | "Decimal" | "BigDecimal" => Self::Numeric,
            _ => Self::Unknown(String::from(ty)),
        }
    }

    /// Returns whether the type has a known mapping.
    #[must_use]
    pub fn is_known(&self) -> bool {
        match self {
            Self::Unknown(_) => false,
            Self::Array(inner) => inner.is_known(),
            _ => true,
        }
    }
}

/// Returns `T` for `Name<T>` (also for a path ending in `Name`).
fn generic_argument<'a>(ty: &'a str, name: &str) -> Option<&'a str> {
    let open = ty.find('<')?;
    let inner = ty[open + 1..].strip_suffix('>')?;
    (last_segment(&ty[..open]) == name).then_some(inner)
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_types() {
        assert_eq!(FieldType::from_rust_type("bool"), (FieldType::Bool, false));
        assert_eq!(FieldType::from_rust_type("u32"), (FieldType::Int, false));
        assert_eq!(FieldType::from_rust_type("i64"), (FieldType::Int, false));
        assert_eq!(FieldType::from_rust_type("f64"), (FieldType::Float64, false));
        assert_eq!(FieldType::from_rust_type("f32"), (FieldType::Float32, false));
        assert_eq!(FieldType::from_rust_type("String"), (FieldType::String, false));
        assert_eq!(FieldType::from_rust_type("Vec<u8>"), (FieldType::Bytes, false));
        assert_eq!(FieldType::from_rust_type("NaiveDate"), (FieldType::Date, false));
    }

    #[test]
    fn test_paths_and_generics() {
        assert_eq!(
            FieldType::from_rust_type("chrono::DateTime<chrono::Utc>"),
            (FieldType::Timestamp, false)
        );
        assert_eq!(
            FieldType::from_rust_type("std::time::SystemTime"),
            (FieldType::Timestamp, false)
        );
        assert_eq!(
            FieldType::from_rust_type("serde_json::Value"),
            (FieldType::Json, false)
        );
    }

    #[test]
    fn test_option_is_nullable() {
        assert_eq!(
            FieldType::from_rust_type("Option<String>"),
            (FieldType::String, true)
        );
        assert_eq!(
            FieldType::from_rust_type("Option < DateTime < Utc > >"),
            (FieldType::Timestamp, true)
        );
    }

    #[test]
    fn test_arrays() {
        assert_eq!(
            FieldType::from_rust_type("Vec<String>"),
            (FieldType::Array(Box::new(FieldType::String)), false)
        );
        assert_eq!(
            FieldType::from_rust_type("Vec<Option<i64>>"),
            (FieldType::Array(Box::new(FieldType::Int)), false)
        );
    }

    #[test]
    fn test_unknown_type() {
        let (ty, _) = FieldType::from_rust_type("HashMap<String,i64>");
        assert_eq!(ty, FieldType::Unknown(String::from("HashMap<String,i64>")));
        assert!(!ty.is_known());
    }
}
