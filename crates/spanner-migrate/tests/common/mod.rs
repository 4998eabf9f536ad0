#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use spanner_sql_core::builder::SqlValue;
use spanner_sql_core::{Client, ClientError, ErrorCode, Row, Statement};
use spanner_sql_derive::Table;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct StandardModel {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[column(index)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct Singer {
    #[column(embed)]
    pub base: StandardModel,
    pub first_name: Option<String>,
    pub last_name: String,
    pub full_name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct Album {
    #[column(embed)]
    pub base: StandardModel,
    pub title: String,
    #[column(belongs_to = "Singer")]
    pub singer_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Table)]
#[table(interleave_in = "Album", on_delete = "cascade")]
pub struct Track {
    #[column(primary_key)]
    pub id: i64,
    #[column(primary_key, auto_increment = false)]
    pub track_number: i64,
    #[column(not_null)]
    pub title: String,
}

/// Database state as `INFORMATION_SCHEMA` reports it.
#[derive(Debug, Default)]
struct Catalog {
    columns: HashMap<String, Vec<String>>,
    indexes: HashSet<(String, String)>,
    constraints: HashSet<(String, String)>,
}

/// In-memory client answering introspection queries from a fixed catalog.
#[derive(Debug, Default)]
pub struct MockClient {
    catalog: Catalog,
    batches: Mutex<Vec<Vec<String>>>,
    queries: Mutex<Vec<Statement>>,
    fail_ddl: bool,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing table with `columns`.
    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        self.catalog.columns.insert(
            String::from(table),
            columns.iter().map(|c| String::from(*c)).collect(),
        );
        self
    }

    pub fn with_index(mut self, table: &str, index: &str) -> Self {
        self.catalog
            .indexes
            .insert((String::from(table), String::from(index)));
        self
    }

    pub fn with_constraint(mut self, table: &str, constraint: &str) -> Self {
        self.catalog
            .constraints
            .insert((String::from(table), String::from(constraint)));
        self
    }

    /// Makes every schema update fail with `FailedPrecondition`.
    pub fn failing_ddl(mut self) -> Self {
        self.fail_ddl = true;
        self
    }

    pub async fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().await.clone()
    }

    pub async fn queries(&self) -> Vec<Statement> {
        self.queries.lock().await.clone()
    }
}

fn param(statement: &Statement, index: usize) -> String {
    match statement.params.get(index) {
        Some(SqlValue::String(s)) => s.clone(),
        other => panic!("expected a string parameter, got {other:?}"),
    }
}

fn count_row(found: bool) -> Vec<Row> {
    vec![Row::new(
        vec![String::new()],
        vec![SqlValue::Int64(i64::from(found))],
    )]
}

impl Client for MockClient {
    async fn update_ddl(&self, statements: &[String]) -> Result<(), ClientError> {
        if self.fail_ddl {
            return Err(ClientError::new(
                ErrorCode::FailedPrecondition,
                "Duplicate name in schema: singers.",
            ));
        }
        self.batches.lock().await.push(statements.to_vec());
        Ok(())
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, ClientError> {
        self.queries.lock().await.push(statement.clone());
        let sql = statement.sql.as_str();
        let catalog = &self.catalog;
        let rows = if sql.contains("INFORMATION_SCHEMA.TABLES") && sql.contains("COUNT(*)") {
            count_row(catalog.columns.contains_key(&param(statement, 0)))
        } else if sql.contains("INFORMATION_SCHEMA.TABLES") {
            let mut tables: Vec<&String> = catalog.columns.keys().collect();
            tables.sort();
            tables
                .into_iter()
                .map(|t| Row::new(vec![String::from("table_name")], vec![SqlValue::String(t.clone())]))
                .collect()
        } else if sql.contains("INFORMATION_SCHEMA.COLUMNS") && sql.contains("COUNT(*)") {
            let found = catalog
                .columns
                .get(&param(statement, 0))
                .is_some_and(|cols| cols.contains(&param(statement, 1)));
            count_row(found)
        } else if sql.contains("INFORMATION_SCHEMA.COLUMNS") {
            catalog
                .columns
                .get(&param(statement, 0))
                .into_iter()
                .flatten()
                .map(|c| Row::new(vec![String::from("column_name")], vec![SqlValue::String(c.clone())]))
                .collect()
        } else if sql.contains("INFORMATION_SCHEMA.INDEXES") {
            count_row(
                catalog
                    .indexes
                    .contains(&(param(statement, 0), param(statement, 1))),
            )
        } else if sql.contains("INFORMATION_SCHEMA.TABLE_CONSTRAINTS") {
            count_row(
                catalog
                    .constraints
                    .contains(&(param(statement, 0), param(statement, 1))),
            )
        } else {
            vec![]
        };
        Ok(rows)
    }

    async fn execute(&self, _statement: &Statement) -> Result<u64, ClientError> {
        Ok(0)
    }

    async fn begin(&self) -> Result<(), ClientError> {
        Ok(())
    }

    async fn commit(&self) -> Result<(), ClientError> {
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ClientError> {
        Ok(())
    }
}
