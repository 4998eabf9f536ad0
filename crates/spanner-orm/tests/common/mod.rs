#![allow(dead_code)]

use std::collections::VecDeque;

use spanner_orm::{
    Client, ClientError, Config, Db, Row, SpannerDialector, SqlValue, StandardModel, Statement,
    Table,
};
use tokio::sync::Mutex;

pub const DSN: &str = "projects/my-project/instances/my-instance/databases/my-database";

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct Singer {
    #[column(embed)]
    pub base: StandardModel,
    pub first_name: Option<String>,
    pub last_name: String,
    #[column(type = "STRING(MAX) AS (ARRAY_TO_STRING([first_name, last_name], \" \")) STORED")]
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

#[derive(Debug, Clone, Default, PartialEq, Table)]
pub struct Venue {
    #[column(embed)]
    pub base: StandardModel,
    pub name: String,
    pub description: String,
}

/// What the client saw, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ddl(Vec<String>),
    Prepare(String),
    Query(String),
    Execute(String),
    Begin,
    Commit,
    Rollback,
}

/// Client answering queries from scripted results.
///
/// Queries without a scripted result return no rows; DML without a
/// scripted count affects one row.
#[derive(Debug, Default)]
pub struct MockClient {
    events: Mutex<Vec<Event>>,
    statements: Mutex<Vec<Statement>>,
    results: Mutex<VecDeque<Vec<Row>>>,
    affected: Mutex<VecDeque<u64>>,
    failure: Mutex<Option<ClientError>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the rows returned by the next query.
    pub async fn push_rows(&self, rows: Vec<Row>) {
        self.results.lock().await.push_back(rows);
    }

    /// Queues the affected count of the next DML statement.
    pub async fn push_affected(&self, count: u64) {
        self.affected.lock().await.push_back(count);
    }

    /// Fails the next query or DML statement with `error`.
    pub async fn fail_next(&self, error: ClientError) {
        *self.failure.lock().await = Some(error);
    }

    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    /// Returns every query and DML statement received.
    pub async fn statements(&self) -> Vec<Statement> {
        self.statements.lock().await.clone()
    }

    pub async fn sql(&self) -> Vec<String> {
        self.statements().await.into_iter().map(|s| s.sql).collect()
    }

    pub async fn ddl(&self) -> Vec<String> {
        self.events()
            .await
            .into_iter()
            .filter_map(|e| match e {
                Event::Ddl(statements) => Some(statements),
                _ => None,
            })
            .flatten()
            .collect()
    }

    async fn record(&self, statement: &Statement, event: Event) -> Result<(), ClientError> {
        if let Some(error) = self.failure.lock().await.take() {
            return Err(error);
        }
        self.events.lock().await.push(event);
        self.statements.lock().await.push(statement.clone());
        Ok(())
    }
}

impl Client for MockClient {
    async fn update_ddl(&self, statements: &[String]) -> Result<(), ClientError> {
        self.events.lock().await.push(Event::Ddl(statements.to_vec()));
        Ok(())
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, ClientError> {
        self.record(statement, Event::Query(statement.sql.clone()))
            .await?;
        Ok(self.results.lock().await.pop_front().unwrap_or_default())
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, ClientError> {
        self.record(statement, Event::Execute(statement.sql.clone()))
            .await?;
        Ok(self.affected.lock().await.pop_front().unwrap_or(1))
    }

    async fn prepare(&self, sql: &str) -> Result<(), ClientError> {
        self.events.lock().await.push(Event::Prepare(String::from(sql)));
        Ok(())
    }

    async fn begin(&self) -> Result<(), ClientError> {
        self.events.lock().await.push(Event::Begin);
        Ok(())
    }

    async fn commit(&self) -> Result<(), ClientError> {
        self.events.lock().await.push(Event::Commit);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), ClientError> {
        self.events.lock().await.push(Event::Rollback);
        Ok(())
    }
}

pub fn config() -> Config {
    Config::new(DSN)
}

pub fn open(config: Config) -> Db<MockClient> {
    Db::open(SpannerDialector::new(config).unwrap(), MockClient::new())
}

pub fn row(pairs: Vec<(&str, SqlValue)>) -> Row {
    Row::from_pairs(pairs)
}
