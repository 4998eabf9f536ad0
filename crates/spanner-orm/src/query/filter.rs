//! Q objects for complex query filtering.
//!
//! Q objects build filter expressions that can be combined with AND, OR and
//! NOT. They render to the core expression builder, so column names are
//! quoted with backticks and values always travel as parameters.

use std::fmt;

use spanner_sql_core::builder::{ExprBuilder, SqlValue, ToSqlValue};
use spanner_sql_core::dialect::bind_named;
use spanner_sql_core::DialectError;

/// A filter expression that can be combined with other expressions.
///
/// # Example
///
/// ```rust
/// use spanner_orm::Q;
///
/// let filter = Q::eq("active", true).and(Q::gt("id", 10).or(Q::is_null("deleted_at")));
/// let (sql, params) = filter.build();
/// assert_eq!(sql, "(`active` = ?) AND ((`id` > ?) OR (`deleted_at` IS NULL))");
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Q {
    expr: FilterExpr,
}

/// Internal filter expression representation.
#[derive(Debug, Clone)]
pub enum FilterExpr {
    /// Simple comparison: field op value
    Comparison {
        field: String,
        op: CompareOp,
        value: SqlValue,
    },
    /// IS NULL check
    IsNull { field: String },
    /// IS NOT NULL check
    IsNotNull { field: String },
    /// IN list check
    InList {
        field: String,
        values: Vec<SqlValue>,
    },
    /// NOT IN list check
    NotInList {
        field: String,
        values: Vec<SqlValue>,
    },
    /// LIKE pattern match
    Like { field: String, pattern: String },
    /// Literal prefix match
    StartsWith { field: String, prefix: String },
    /// Literal suffix match
    EndsWith { field: String, suffix: String },
    /// BETWEEN range check
    Between {
        field: String,
        low: SqlValue,
        high: SqlValue,
    },
    /// AND combination
    And(Box<FilterExpr>, Box<FilterExpr>),
    /// OR combination
    Or(Box<FilterExpr>, Box<FilterExpr>),
    /// NOT negation
    Not(Box<FilterExpr>),
    /// Raw SQL with `?` markers (use with caution)
    Raw { sql: String, params: Vec<SqlValue> },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

impl Q {
    fn compare<V: ToSqlValue>(field: &str, op: CompareOp, value: V) -> Self {
        Self {
            expr: FilterExpr::Comparison {
                field: String::from(field),
                op,
                value: value.to_sql_value(),
            },
        }
    }

    /// Creates an equality filter (field = value).
    #[must_use]
    pub fn eq<V: ToSqlValue>(field: &str, value: V) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    /// Creates an inequality filter (field != value).
    #[must_use]
    pub fn ne<V: ToSqlValue>(field: &str, value: V) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    /// Creates a greater-than filter (field > value).
    #[must_use]
    pub fn gt<V: ToSqlValue>(field: &str, value: V) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    /// Creates a greater-than-or-equal filter (field >= value).
    #[must_use]
    pub fn gte<V: ToSqlValue>(field: &str, value: V) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    /// Creates a less-than filter (field < value).
    #[must_use]
    pub fn lt<V: ToSqlValue>(field: &str, value: V) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    /// Creates a less-than-or-equal filter (field <= value).
    #[must_use]
    pub fn lte<V: ToSqlValue>(field: &str, value: V) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    /// Creates an IS NULL filter.
    #[must_use]
    pub fn is_null(field: &str) -> Self {
        Self {
            expr: FilterExpr::IsNull {
                field: String::from(field),
            },
        }
    }

    /// Creates an IS NOT NULL filter.
    #[must_use]
    pub fn is_not_null(field: &str) -> Self {
        Self {
            expr: FilterExpr::IsNotNull {
                field: String::from(field),
            },
        }
    }

    /// Creates an IN list filter. An empty list matches nothing.
    #[must_use]
    pub fn in_list<V: ToSqlValue>(field: &str, values: Vec<V>) -> Self {
        Self {
            expr: FilterExpr::InList {
                field: String::from(field),
                values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
            },
        }
    }

    /// Creates a NOT IN list filter. An empty list matches everything.
    #[must_use]
    pub fn not_in_list<V: ToSqlValue>(field: &str, values: Vec<V>) -> Self {
        Self {
            expr: FilterExpr::NotInList {
                field: String::from(field),
                values: values.into_iter().map(ToSqlValue::to_sql_value).collect(),
            },
        }
    }

    /// Creates a LIKE filter (case-sensitive pattern match).
    ///
    /// Use `%` for wildcard matching.
    #[must_use]
    pub fn like(field: &str, pattern: &str) -> Self {
        Self {
            expr: FilterExpr::Like {
                field: String::from(field),
                pattern: String::from(pattern),
            },
        }
    }

    /// Creates a contains filter (LIKE %value%).
    #[must_use]
    pub fn contains(field: &str, value: &str) -> Self {
        Self::like(field, &format!("%{value}%"))
    }

    /// Creates a starts-with filter (`STARTS_WITH`); `%` and `_` in `value`
    /// match literally.
    #[must_use]
    pub fn startswith(field: &str, value: &str) -> Self {
        Self {
            expr: FilterExpr::StartsWith {
                field: String::from(field),
                prefix: String::from(value),
            },
        }
    }

    /// Creates an ends-with filter (`ENDS_WITH`).
    #[must_use]
    pub fn endswith(field: &str, value: &str) -> Self {
        Self {
            expr: FilterExpr::EndsWith {
                field: String::from(field),
                suffix: String::from(value),
            },
        }
    }

    /// Creates a BETWEEN filter (low <= field <= high).
    #[must_use]
    pub fn between<V: ToSqlValue>(field: &str, low: V, high: V) -> Self {
        Self {
            expr: FilterExpr::Between {
                field: String::from(field),
                low: low.to_sql_value(),
                high: high.to_sql_value(),
            },
        }
    }

    /// Creates a raw SQL filter expression; each `?` binds one of `params`.
    ///
    /// **Warning**: Use parameters for values to prevent SQL injection.
    #[must_use]
    pub fn raw(sql: &str, params: Vec<SqlValue>) -> Self {
        Self {
            expr: FilterExpr::Raw {
                sql: String::from(sql),
                params,
            },
        }
    }

    /// Creates a raw SQL filter with `@name` arguments.
    ///
    /// ```rust
    /// use spanner_orm::{Q, ToSqlValue};
    ///
    /// let q = Q::raw_named("title LIKE @title", &[("title", "e%".to_sql_value())]).unwrap();
    /// assert_eq!(q.build().0, "title LIKE ?");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `DialectError::InvalidStatement` for a name without a value.
    pub fn raw_named(sql: &str, args: &[(&str, SqlValue)]) -> Result<Self, DialectError> {
        let (sql, params) = bind_named(sql, args)?;
        Ok(Self::raw(&sql, params))
    }

    /// Combines this filter with another using AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self {
            expr: FilterExpr::And(Box::new(self.expr), Box::new(other.expr)),
        }
    }

    /// Combines this filter with another using OR.
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        Self {
            expr: FilterExpr::Or(Box::new(self.expr), Box::new(other.expr)),
        }
    }

    /// Negates this filter with NOT.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self {
            expr: FilterExpr::Not(Box::new(self.expr)),
        }
    }

    /// Returns the internal filter expression.
    #[must_use]
    pub fn into_expr(self) -> FilterExpr {
        self.expr
    }

    /// Returns the `column = value` pairs this filter pins down.
    ///
    /// Only equalities joined by AND count; anything under OR or NOT does
    /// not fix a column.
    #[must_use]
    pub fn equalities(&self) -> Vec<(&str, &SqlValue)> {
        let mut pairs = vec![];
        self.expr.collect_equalities(&mut pairs);
        pairs
    }

    /// Builds the SQL (with `?` markers) and parameters.
    #[must_use]
    pub fn build(&self) -> (String, Vec<SqlValue>) {
        self.expr.to_expr().build()
    }
}

impl From<Q> for FilterExpr {
    fn from(q: Q) -> Self {
        q.expr
    }
}

impl FilterExpr {
    /// Returns whether the expression needs parentheses when joined with others.
    #[must_use]
    pub const fn is_compound(&self) -> bool {
        matches!(self, Self::And(..) | Self::Or(..) | Self::Raw { .. })
    }

    fn collect_equalities<'a>(&'a self, pairs: &mut Vec<(&'a str, &'a SqlValue)>) {
        match self {
            Self::Comparison {
                field,
                op: CompareOp::Eq,
                value,
            } => pairs.push((field.as_str(), value)),
            Self::And(left, right) => {
                left.collect_equalities(pairs);
                right.collect_equalities(pairs);
            }
            _ => {}
        }
    }

    /// Renders the expression with the core expression builder.
    #[must_use]
    pub fn to_expr(&self) -> ExprBuilder {
        match self {
            Self::Comparison { field, op, value } => {
                let column = ExprBuilder::column(field);
                let value = value.clone();
                match op {
                    CompareOp::Eq => column.eq(value),
                    CompareOp::Ne => column.not_eq(value),
                    CompareOp::Gt => column.gt(value),
                    CompareOp::Gte => column.gt_eq(value),
                    CompareOp::Lt => column.lt(value),
                    CompareOp::Lte => column.lt_eq(value),
                }
            }
            Self::IsNull { field } => ExprBuilder::column(field).is_null(),
            Self::IsNotNull { field } => ExprBuilder::column(field).is_not_null(),
            Self::InList { field, values } => ExprBuilder::column(field).in_list(values.clone()),
            Self::NotInList { field, values } => {
                ExprBuilder::column(field).not_in_list(values.clone())
            }
            Self::Like { field, pattern } => ExprBuilder::column(field).like(pattern.as_str()),
            Self::StartsWith { field, prefix } => {
                ExprBuilder::column(field).starts_with(prefix.as_str())
            }
            Self::EndsWith { field, suffix } => ExprBuilder::column(field).ends_with(suffix.as_str()),
            Self::Between { field, low, high } => {
                ExprBuilder::column(field).between(low.clone(), high.clone())
            }
            Self::And(left, right) => left.to_expr().paren().and(right.to_expr().paren()),
            Self::Or(left, right) => left.to_expr().paren().or(right.to_expr().paren()),
            Self::Not(inner) => inner.to_expr().not(),
            Self::Raw { sql, params } => ExprBuilder::raw_with_params(sql.clone(), params.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_eq() {
        let q = Q::eq("status", "active");
        let (sql, params) = q.build();
        assert_eq!(sql, "`status` = ?");
        assert_eq!(params, vec![SqlValue::String(String::from("active"))]);
    }

    #[test]
    fn test_and_combination() {
        let q = Q::eq("status", "active").and(Q::gt("age", 18));
        let (sql, params) = q.build();
        assert_eq!(sql, "(`status` = ?) AND (`age` > ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_or_combination() {
        let q = Q::eq("role", "admin").or(Q::eq("role", "moderator"));
        let (sql, params) = q.build();
        assert_eq!(sql, "(`role` = ?) OR (`role` = ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_not() {
        let q = Q::eq("deleted", true).not();
        let (sql, params) = q.build();
        assert_eq!(sql, "NOT (`deleted` = ?)");
        assert_eq!(params, vec![SqlValue::Bool(true)]);
    }

    #[test]
    fn test_in_list() {
        let q = Q::in_list("status", vec!["active", "pending"]);
        let (sql, params) = q.build();
        assert_eq!(sql, "`status` IN (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_empty_in_list() {
        let (sql, params) = Q::in_list::<i64>("id", vec![]).build();
        assert_eq!(sql, "FALSE");
        assert!(params.is_empty());
    }

    #[test]
    fn test_contains() {
        let q = Q::contains("title", "love");
        let (sql, params) = q.build();
        assert_eq!(sql, "`title` LIKE ?");
        assert_eq!(params[0], SqlValue::String(String::from("%love%")));
    }

    #[test]
    fn test_startswith_matches_literally() {
        let (sql, params) = Q::startswith("title", "100%").build();
        assert_eq!(sql, "STARTS_WITH(`title`, ?)");
        assert_eq!(params, vec![SqlValue::String(String::from("100%"))]);
        assert_eq!(Q::endswith("title", "_x").build().0, "ENDS_WITH(`title`, ?)");
    }

    #[test]
    fn test_between() {
        let q = Q::between("sample_rate", 44.1, 48.0);
        let (sql, params) = q.build();
        assert_eq!(sql, "`sample_rate` BETWEEN ? AND ?");
        assert_eq!(params, vec![SqlValue::Float64(44.1), SqlValue::Float64(48.0)]);
    }

    #[test]
    fn test_qualified_column() {
        let (sql, _) = Q::eq("albums.title", "Go").build();
        assert_eq!(sql, "`albums`.`title` = ?");
    }

    #[test]
    fn test_raw() {
        let q = Q::raw("LOWER(SUBSTR(title, 1, 1)) = ?", vec![SqlValue::String(String::from("e"))]);
        let (sql, params) = q.build();
        assert_eq!(sql, "LOWER(SUBSTR(title, 1, 1)) = ?");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_raw_named() {
        let title = SqlValue::String(String::from("e%"));
        let q = Q::raw_named(
            "title LIKE @title OR LOWER(title) LIKE @title",
            &[("title", title.clone())],
        )
        .unwrap();
        let (sql, params) = q.build();
        assert_eq!(sql, "title LIKE ? OR LOWER(title) LIKE ?");
        assert_eq!(params, vec![title.clone(), title]);
        assert!(Q::raw_named("title LIKE @name", &[]).is_err());
    }

    #[test]
    fn test_equalities() {
        let q = Q::eq("name", "Berlin Arena")
            .and(Q::eq("active", true))
            .and(Q::eq("id", 1).or(Q::eq("id", 2)));
        assert_eq!(
            q.equalities(),
            vec![
                ("name", &SqlValue::String(String::from("Berlin Arena"))),
                ("active", &SqlValue::Bool(true)),
            ]
        );
        assert!(Q::eq("id", 1).not().equalities().is_empty());
    }
}
