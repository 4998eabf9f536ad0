//! Expressions for WHERE clauses.
//!
//! Expressions carry `?` markers and their values side by side; the
//! statement builders number the markers (`@p1`, `@p2`, ...) once the whole
//! statement is assembled, so sub-expressions compose in any order.

use super::quote;
use super::value::{SqlValue, ToSqlValue};

/// Creates a column reference.
#[must_use]
pub fn col(name: &str) -> Column {
    Column {
        table: None,
        name: String::from(name),
    }
}

/// A column reference, optionally qualified by its table.
#[derive(Debug, Clone)]
pub struct Column {
    /// Optional table qualifier.
    pub table: Option<String>,
    /// Column name.
    pub name: String,
}

impl Column {
    /// Creates a qualified column reference.
    #[must_use]
    pub fn qualified(table: &str, name: &str) -> Self {
        Self {
            table: Some(String::from(table)),
            name: String::from(name),
        }
    }

    /// Returns the column with backtick-quoted parts.
    #[must_use]
    pub fn to_sql(&self) -> String {
        match &self.table {
            Some(t) => format!("{}.{}", quote(t), quote(&self.name)),
            None => quote(&self.name),
        }
    }
}

/// Forwards each method to the same-named [`ExprBuilder`] method.
macro_rules! column_ops {
    ($($(#[$doc:meta])* $method:ident($($arg:ident: $ty:ident),*);)+) => {
        impl Column {
            $(
                $(#[$doc])*
                #[must_use]
                pub fn $method<$($ty: ToSqlValue),*>(self, $($arg: $ty),*) -> ExprBuilder {
                    ExprBuilder::from(self).$method($($arg),*)
                }
            )+
        }
    };
}

column_ops! {
    /// `column = value`
    eq(value: T);
    /// `column != value`
    not_eq(value: T);
    /// `column < value`
    lt(value: T);
    /// `column <= value`
    lt_eq(value: T);
    /// `column > value`
    gt(value: T);
    /// `column >= value`
    gt_eq(value: T);
    /// `column LIKE pattern`
    like(pattern: T);
    /// `column NOT LIKE pattern`
    not_like(pattern: T);
    /// `STARTS_WITH(column, prefix)`
    starts_with(prefix: T);
    /// `ENDS_WITH(column, suffix)`
    ends_with(suffix: T);
    /// `column BETWEEN low AND high`
    between(low: T, high: U);
    /// `column NOT BETWEEN low AND high`
    not_between(low: T, high: U);
}

impl Column {
    /// `column IS NULL`
    #[must_use]
    pub fn is_null(self) -> ExprBuilder {
        ExprBuilder::from(self).is_null()
    }

    /// `column IS NOT NULL`
    #[must_use]
    pub fn is_not_null(self) -> ExprBuilder {
        ExprBuilder::from(self).is_not_null()
    }

    /// `column IN (?, ?, ...)`
    #[must_use]
    pub fn in_list<T: ToSqlValue>(self, values: Vec<T>) -> ExprBuilder {
        ExprBuilder::from(self).in_list(values)
    }

    /// `column NOT IN (?, ?, ...)`
    #[must_use]
    pub fn not_in_list<T: ToSqlValue>(self, values: Vec<T>) -> ExprBuilder {
        ExprBuilder::from(self).not_in_list(values)
    }

    /// `column IN UNNEST(?)`, binding the values as one array parameter.
    #[must_use]
    pub fn in_unnest<T: ToSqlValue>(self, values: Vec<T>) -> ExprBuilder {
        ExprBuilder::from(self).in_unnest(values)
    }
}

/// Binary operators between an expression and a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
}

impl Operator {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

/// A boolean or scalar SQL expression with its bound values.
#[derive(Debug, Clone)]
pub struct ExprBuilder {
    sql: String,
    params: Vec<SqlValue>,
}

impl ExprBuilder {
    /// Creates an expression from raw SQL without parameters.
    ///
    /// **Warning**: Only use this for SQL fragments that don't contain user input.
    #[must_use]
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::raw_with_params(sql, vec![])
    }

    /// Creates a raw expression whose `?` markers bind `params` in order.
    #[must_use]
    pub fn raw_with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Creates a quoted column reference expression.
    #[must_use]
    pub fn column(name: &str) -> Self {
        col(name).into()
    }

    /// Creates a bound value expression.
    #[must_use]
    pub fn value<T: ToSqlValue>(value: T) -> Self {
        value.to_sql_value().into()
    }

    fn join(self, separator: &str, other: Self) -> Self {
        let mut params = self.params;
        params.extend(other.params);
        Self {
            sql: format!("{}{separator}{}", self.sql, other.sql),
            params,
        }
    }

    fn compare<T: ToSqlValue>(self, op: Operator, value: T) -> Self {
        let separator = format!(" {} ", op.as_sql());
        self.join(&separator, Self::value(value))
    }

    fn call(function: &str, args: Vec<Self>) -> Self {
        let mut sql = Vec::with_capacity(args.len());
        let mut params = vec![];
        for arg in args {
            sql.push(arg.sql);
            params.extend(arg.params);
        }
        Self {
            sql: format!("{function}({})", sql.join(", ")),
            params,
        }
    }

    fn suffix(mut self, keyword: &str) -> Self {
        self.sql.push(' ');
        self.sql.push_str(keyword);
        self
    }

    fn range<T: ToSqlValue, U: ToSqlValue>(self, keyword: &str, low: T, high: U) -> Self {
        self.suffix(keyword)
            .join(" ", Self::value(low))
            .join(" AND ", Self::value(high))
    }

    fn list<T: ToSqlValue>(self, keyword: &str, values: Vec<T>, empty: &str) -> Self {
        // `x IN ()` is a syntax error in GoogleSQL.
        if values.is_empty() {
            return Self::raw(empty);
        }
        let mut params = self.params;
        let markers: Vec<&str> = values
            .into_iter()
            .map(|v| {
                params.push(v.to_sql_value());
                "?"
            })
            .collect();
        Self {
            sql: format!("{} {keyword} ({})", self.sql, markers.join(", ")),
            params,
        }
    }

    /// `self AND other`
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        self.join(" AND ", other)
    }

    /// `self OR other`
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        self.join(" OR ", other)
    }

    /// Wraps the expression in parentheses.
    #[must_use]
    pub fn paren(mut self) -> Self {
        self.sql = format!("({})", self.sql);
        self
    }

    /// `NOT (self)`
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(mut self) -> Self {
        self.sql = format!("NOT ({})", self.sql);
        self
    }

    /// `self = value`
    #[must_use]
    pub fn eq<T: ToSqlValue>(self, value: T) -> Self {
        self.compare(Operator::Eq, value)
    }

    /// `self != value`
    #[must_use]
    pub fn not_eq<T: ToSqlValue>(self, value: T) -> Self {
        self.compare(Operator::NotEq, value)
    }

    /// `self < value`
    #[must_use]
    pub fn lt<T: ToSqlValue>(self, value: T) -> Self {
        self.compare(Operator::Lt, value)
    }

    /// `self <= value`
    #[must_use]
    pub fn lt_eq<T: ToSqlValue>(self, value: T) -> Self {
        self.compare(Operator::LtEq, value)
    }

    /// `self > value`
    #[must_use]
    pub fn gt<T: ToSqlValue>(self, value: T) -> Self {
        self.compare(Operator::Gt, value)
    }

    /// `self >= value`
    #[must_use]
    pub fn gt_eq<T: ToSqlValue>(self, value: T) -> Self {
        self.compare(Operator::GtEq, value)
    }

    /// `self LIKE pattern`
    #[must_use]
    pub fn like<T: ToSqlValue>(self, pattern: T) -> Self {
        self.compare(Operator::Like, pattern)
    }

    /// `self NOT LIKE pattern`
    #[must_use]
    pub fn not_like<T: ToSqlValue>(self, pattern: T) -> Self {
        self.compare(Operator::NotLike, pattern)
    }

    /// `STARTS_WITH(self, prefix)`
    #[must_use]
    pub fn starts_with<T: ToSqlValue>(self, prefix: T) -> Self {
        Self::call("STARTS_WITH", vec![self, Self::value(prefix)])
    }

    /// `ENDS_WITH(self, suffix)`
    #[must_use]
    pub fn ends_with<T: ToSqlValue>(self, suffix: T) -> Self {
        Self::call("ENDS_WITH", vec![self, Self::value(suffix)])
    }

    /// `self IS NULL`
    #[must_use]
    pub fn is_null(self) -> Self {
        self.suffix("IS NULL")
    }

    /// `self IS NOT NULL`
    #[must_use]
    pub fn is_not_null(self) -> Self {
        self.suffix("IS NOT NULL")
    }

    /// `self BETWEEN low AND high`
    #[must_use]
    pub fn between<T: ToSqlValue, U: ToSqlValue>(self, low: T, high: U) -> Self {
        self.range("BETWEEN", low, high)
    }

    /// `self NOT BETWEEN low AND high`
    #[must_use]
    pub fn not_between<T: ToSqlValue, U: ToSqlValue>(self, low: T, high: U) -> Self {
        self.range("NOT BETWEEN", low, high)
    }

    /// `self IN (?, ?, ...)`; `FALSE` for an empty list.
    #[must_use]
    pub fn in_list<T: ToSqlValue>(self, values: Vec<T>) -> Self {
        self.list("IN", values, "FALSE")
    }

    /// `self NOT IN (?, ?, ...)`; `TRUE` for an empty list.
    #[must_use]
    pub fn not_in_list<T: ToSqlValue>(self, values: Vec<T>) -> Self {
        self.list("NOT IN", values, "TRUE")
    }

    /// `self IN UNNEST(?)` with the values bound as a single ARRAY.
    ///
    /// Keeps the statement text the same for any number of values, which
    /// lets Spanner reuse the query plan.
    #[must_use]
    pub fn in_unnest<T: ToSqlValue>(self, values: Vec<T>) -> Self {
        let array = SqlValue::Array(values.into_iter().map(ToSqlValue::to_sql_value).collect());
        self.join(" IN UNNEST(", Self::value(array)).suffix_raw(")")
    }

    fn suffix_raw(mut self, text: &str) -> Self {
        self.sql.push_str(text);
        self
    }

    /// Returns the SQL string with `?` markers.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the parameters.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Consumes the builder and returns the SQL and parameters.
    #[must_use]
    pub fn build(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

impl From<Column> for ExprBuilder {
    fn from(col: Column) -> Self {
        Self::raw(col.to_sql())
    }
}

impl From<SqlValue> for ExprBuilder {
    fn from(value: SqlValue) -> Self {
        Self::raw_with_params("?", vec![value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparisons_quote_columns() {
        assert_eq!(col("last_name").eq("Allison").sql(), "`last_name` = ?");
        assert_eq!(col("track_number").gt(3).sql(), "`track_number` > ?");
        assert_eq!(col("sample_rate").lt_eq(44.1).sql(), "`sample_rate` <= ?");
        assert_eq!(col("id").not_eq(3).sql(), "`id` != ?");
        assert_eq!(col("title").not_like("%live%").sql(), "`title` NOT LIKE ?");
    }

    #[test]
    fn test_null_checks_bind_nothing() {
        let expr = col("deleted_at").is_null();
        assert_eq!(expr.sql(), "`deleted_at` IS NULL");
        assert!(expr.params().is_empty());
        assert_eq!(col("deleted_at").is_not_null().sql(), "`deleted_at` IS NOT NULL");
    }

    #[test]
    fn test_between() {
        let expr = col("duration").between(60, 300);
        assert_eq!(expr.sql(), "`duration` BETWEEN ? AND ?");
        assert_eq!(expr.params(), &[SqlValue::Int64(60), SqlValue::Int64(300)]);
        assert_eq!(
            col("duration").not_between(60, 300).sql(),
            "`duration` NOT BETWEEN ? AND ?"
        );
    }

    #[test]
    fn test_in_list() {
        let expr = col("title").in_list(vec!["One", "Two"]);
        assert_eq!(expr.sql(), "`title` IN (?, ?)");
        assert_eq!(expr.params().len(), 2);
        assert_eq!(col("id").in_list(Vec::<i64>::new()).sql(), "FALSE");
        assert_eq!(col("id").not_in_list(Vec::<i64>::new()).sql(), "TRUE");
    }

    #[test]
    fn test_in_unnest_binds_one_array() {
        let expr = col("singer_id").in_unnest(vec![1_i64, 2, 3]);
        assert_eq!(expr.sql(), "`singer_id` IN UNNEST(?)");
        assert_eq!(
            expr.params(),
            &[SqlValue::Array(vec![
                SqlValue::Int64(1),
                SqlValue::Int64(2),
                SqlValue::Int64(3),
            ])]
        );
    }

    #[test]
    fn test_string_functions() {
        let expr = col("title").starts_with("E");
        assert_eq!(expr.sql(), "STARTS_WITH(`title`, ?)");
        assert_eq!(expr.params(), &[SqlValue::String(String::from("E"))]);
        assert_eq!(col("title").ends_with("s").sql(), "ENDS_WITH(`title`, ?)");
    }

    #[test]
    fn test_and_or_not() {
        let expr = col("active")
            .eq(true)
            .and(col("last_name").eq("Trentor").or(col("first_name").is_null()).paren());
        assert_eq!(
            expr.sql(),
            "`active` = ? AND (`last_name` = ? OR `first_name` IS NULL)"
        );
        assert_eq!(expr.params().len(), 2);
        assert_eq!(col("active").eq(true).not().sql(), "NOT (`active` = ?)");
    }

    #[test]
    fn test_qualified_column() {
        let expr = Column::qualified("singers", "last_name").eq("Bob");
        assert_eq!(expr.sql(), "`singers`.`last_name` = ?");
    }

    #[test]
    fn test_values_are_never_inlined() {
        let malicious = "'; DROP TABLE singers; --";
        let expr = col("last_name").eq(malicious);
        assert_eq!(expr.sql(), "`last_name` = ?");
        assert!(matches!(&expr.params()[0], SqlValue::String(s) if s == malicious));
    }
}
