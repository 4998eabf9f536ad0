//! Table, column, index and constraint naming.

/// Derives database names from Rust names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamingStrategy {
    /// Prefix added to every table name.
    pub table_prefix: String,
    /// Use singular table names (`singer` instead of `singers`).
    pub singular_table: bool,
}

impl NamingStrategy {
    /// Returns the table name for a struct name: `Singer` -> `singers`.
    #[must_use]
    pub fn table_name(&self, struct_name: &str) -> String {
        let snake = to_snake_case(struct_name);
        let name = if self.singular_table {
            snake
        } else {
            pluralize(&snake)
        };
        format!("{}{name}", self.table_prefix)
    }

    /// Returns the column name for a field name.
    #[must_use]
    pub fn column_name(&self, field_name: &str) -> String {
        to_snake_case(field_name)
    }

    /// Returns the default index name: `idx_{table}_{column}`.
    #[must_use]
    pub fn index_name(&self, table: &str, column: &str) -> String {
        format!("idx_{table}_{column}")
    }

    /// Returns the default foreign key name: `fk_{table}_{relation}`.
    #[must_use]
    pub fn foreign_key_name(&self, table: &str, relation: &str) -> String {
        format!("fk_{table}_{relation}")
    }

    /// Returns the relation name of a foreign key column: `singer_id` -> `singer`.
    #[must_use]
    pub fn relation_name(&self, column: &str) -> String {
        column
            .strip_suffix("_id")
            .filter(|s| !s.is_empty())
            .unwrap_or(column)
            .to_string()
    }

    /// Returns the name of the sequence backing a table's key.
    #[must_use]
    pub fn sequence_name(&self, table: &str) -> String {
        format!("seq_{table}")
    }
}

/// Converts `PascalCase` or `camelCase` to `snake_case`.
///
/// Runs of capitals are kept together: `HTTPServer` -> `http_server`.
#[must_use]
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase()
                    || prev.is_ascii_digit()
                    || (prev.is_uppercase() && next_is_lower)
                {
                    result.push('_');
                }
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

/// Pluralizes an English snake_case noun by its last word.
#[must_use]
pub fn pluralize(word: &str) -> String {
    if word.ends_with("ss")
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        return format!("{word}es");
    }
    if word.ends_with('s') {
        return word.to_string();
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before_vowel = stem
            .chars()
            .last()
            .is_some_and(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u'));
        if !before_vowel && !stem.is_empty() {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}
