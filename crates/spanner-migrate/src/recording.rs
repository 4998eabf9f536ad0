//! A client that records DDL instead of sending it.

use spanner_sql_core::{Client, ClientError, Row, Statement};
use tokio::sync::Mutex;

/// In-memory client for dry runs.
///
/// Reports an empty database: every query returns no rows and every DML
/// statement affects nothing. DDL batches are kept in the order received.
#[derive(Debug, Default)]
pub struct RecordingClient {
    batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingClient {
    /// Creates an empty recording client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the DDL batches received so far.
    pub async fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().await.clone()
    }

    /// Returns every recorded statement, flattened.
    pub async fn statements(&self) -> Vec<String> {
        self.batches.lock().await.concat()
    }
}

impl Client for RecordingClient {
    async fn update_ddl(&self, statements: &[String]) -> Result<(), ClientError> {
        self.batches.lock().await.push(statements.to_vec());
        Ok(())
    }

    async fn query(&self, _statement: &Statement) -> Result<Vec<Row>, ClientError> {
        Ok(vec![])
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
