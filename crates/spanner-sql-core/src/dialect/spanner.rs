//! Cloud Spanner (GoogleSQL) dialect.

use super::Dialect;
use crate::builder::value::SqlValue;
use crate::error::DialectError;

/// The Cloud Spanner GoogleSQL dialect.
///
/// - identifiers are quoted with backticks
/// - parameters are positional and named `@p1`, `@p2`, ...
/// - DML returns rows with `THEN RETURN`
/// - there is no `ON CONFLICT`, no savepoint and no `FOR UPDATE`
#[derive(Debug, Default, Clone, Copy)]
pub struct SpannerDialect;

impl SpannerDialect {
    /// Creates a new Spanner dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Dialect for SpannerDialect {
    fn name(&self) -> &'static str {
        "spanner"
    }

    fn identifier_quote(&self) -> char {
        '`'
    }

    fn parameter_placeholder(&self, index: usize) -> String {
        format!("@p{index}")
    }

    fn supports_returning(&self) -> bool {
        true
    }

    fn returning_keyword(&self) -> &'static str {
        "THEN RETURN"
    }

    fn supports_upsert(&self) -> bool {
        false
    }

    fn supports_savepoints(&self) -> bool {
        false
    }

    fn supports_locking_clause(&self) -> bool {
        false
    }

    fn quote_identifier(&self, name: &str) -> String {
        name.split('.')
            .map(|part| {
                if part == "*" {
                    String::from("*")
                } else {
                    format!("`{}`", part.replace('`', "\\`"))
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    fn explain(&self, sql: &str, params: &[SqlValue]) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut scanner = Scanner::new(sql);
        while let Some((c, quoted)) = scanner.next_char() {
            if quoted || c != '@' || !scanner.peek_is('p') {
                out.push(c);
                continue;
            }
            let digits = scanner.peek_digits_after_p();
            let longer_name = scanner.peek_at(1 + digits.len()).is_some_and(is_name_char);
            if digits.is_empty() || longer_name {
                out.push(c);
                continue;
            }
            let index: usize = digits.parse().unwrap_or(0);
            match index.checked_sub(1).and_then(|i| params.get(i)) {
                Some(value) => {
                    out.push_str(&value.to_sql_inline());
                    scanner.skip(1 + digits.len());
                }
                None => out.push(c),
            }
        }
        out
    }
}

/// Rewrites the `?` markers produced by the builders into `@p1`, `@p2`, ...
///
/// Markers inside string literals and quoted identifiers are left alone.
#[must_use]
pub fn bind_vars(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut next = 1;
    let mut scanner = Scanner::new(sql);
    while let Some((c, quoted)) = scanner.next_char() {
        if c == '?' && !quoted {
            out.push_str(&format!("@p{next}"));
            next += 1;
        } else {
            out.push(c);
        }
    }
    out
}

/// Rewrites `@name` arguments into `?` markers, in order of appearance,
/// and returns the matching positional parameters.
///
/// A name may be used more than once; each use binds its own parameter.
/// Names inside string literals and quoted identifiers are left alone.
///
/// # Errors
///
/// Returns `DialectError::InvalidStatement` for a name without a value.
pub fn bind_named(
    sql: &str,
    args: &[(&str, SqlValue)],
) -> Result<(String, Vec<SqlValue>), DialectError> {
    let mut out = String::with_capacity(sql.len());
    let mut params = Vec::new();
    let mut scanner = Scanner::new(sql);
    while let Some((c, quoted)) = scanner.next_char() {
        if !quoted && c == '@' && scanner.peek_at(0) == Some('@') {
            // `@@name` is a system variable, not an argument.
            scanner.skip(1);
            out.push_str("@@");
            out.push_str(&scanner.take_while(is_name_char));
            continue;
        }
        let starts_name = scanner
            .peek_at(0)
            .is_some_and(|n| n.is_alphabetic() || n == '_');
        if quoted || c != '@' || !starts_name {
            out.push(c);
            continue;
        }
        let name = scanner.take_while(is_name_char);
        let (_, value) = args
            .iter()
            .find(|(arg, _)| *arg == name)
            .ok_or_else(|| DialectError::InvalidStatement(format!("no value for argument @{name}")))?;
        out.push('?');
        params.push(value.clone());
    }
    Ok((out, params))
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Walks SQL text and tracks whether the current char is inside a quoted region.
struct Scanner {
    chars: Vec<char>,
    pos: usize,
    quote: Option<char>,
    escaped: bool,
}

impl Scanner {
    fn new(sql: &str) -> Self {
        Self {
            chars: sql.chars().collect(),
            pos: 0,
            quote: None,
            escaped: false,
        }
    }

    /// Returns the next char and whether it is part of a quoted region.
    fn next_char(&mut self) -> Option<(char, bool)> {
        let c = *self.chars.get(self.pos)?;
        self.pos += 1;

        if let Some(q) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == q {
                self.quote = None;
            }
            return Some((c, true));
        }

        if matches!(c, '\'' | '"' | '`') {
            self.quote = Some(c);
            return Some((c, true));
        }
        Some((c, false))
    }

    fn peek_is(&self, expected: char) -> bool {
        self.chars.get(self.pos) == Some(&expected)
    }

    fn peek_digits_after_p(&self) -> String {
        self.chars
            .iter()
            .skip(self.pos + 1)
            .take_while(|c| c.is_ascii_digit())
            .collect()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let taken: String = self.chars[self.pos..].iter().copied().take_while(|&c| pred(c)).collect();
        self.pos += taken.chars().count();
        taken
    }

    fn skip(&mut self, n: usize) {
        self.pos += n;
    }
}
