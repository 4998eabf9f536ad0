//! The seam between the dialect and the Spanner client library.
//!
//! The adapter decides which SQL to send and in which order; a [`Client`]
//! sends it. Pooling, sessions, retries and the wire protocol all live on
//! the other side of this trait.

use std::fmt;

use thiserror::Error;

use crate::builder::Statement;
use crate::schema::Row;

/// Status codes returned by Cloud Spanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The table, row or database does not exist.
    NotFound,
    /// A row or schema object with the same key already exists.
    AlreadyExists,
    /// The operation was rejected because the system is not in the right state.
    FailedPrecondition,
    /// The deadline expired before the operation completed.
    DeadlineExceeded,
    /// The transaction was aborted and may be retried.
    Aborted,
    /// The service is unavailable.
    Unavailable,
    /// The statement or its arguments are invalid.
    InvalidArgument,
    /// The caller lacks permission.
    PermissionDenied,
    /// Internal server error.
    Internal,
    /// Any other status.
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "NotFound",
            Self::AlreadyExists => "AlreadyExists",
            Self::FailedPrecondition => "FailedPrecondition",
            Self::DeadlineExceeded => "DeadlineExceeded",
            Self::Aborted => "Aborted",
            Self::Unavailable => "Unavailable",
            Self::InvalidArgument => "InvalidArgument",
            Self::PermissionDenied => "PermissionDenied",
            Self::Internal => "Internal",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// An error reported by the client library, passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("spanner: code = {code}, desc = {message}")]
pub struct ClientError {
    /// Status code.
    pub code: ErrorCode,
    /// Server message.
    pub message: String,
}

impl ClientError {
    /// Creates a new client error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A Cloud Spanner client as seen by the ORM.
///
/// Implementations are expected to be cheap to share (`&self` everywhere)
/// and to track their own transaction state.
#[allow(async_fn_in_trait)]
pub trait Client {
    /// Applies DDL statements as one schema update request.
    async fn update_ddl(&self, statements: &[String]) -> Result<(), ClientError>;

    /// Runs a query, or a DML statement with `THEN RETURN`, and returns its rows.
    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, ClientError>;

    /// Runs a DML statement and returns the number of affected rows.
    async fn execute(&self, statement: &Statement) -> Result<u64, ClientError>;

    /// Prepares a statement for repeated execution.
    async fn prepare(&self, sql: &str) -> Result<(), ClientError> {
        let _ = sql;
        Ok(())
    }

    /// Starts a read/write transaction.
    async fn begin(&self) -> Result<(), ClientError>;

    /// Commits the current transaction.
    async fn commit(&self) -> Result<(), ClientError>;

    /// Rolls back the current transaction.
    async fn rollback(&self) -> Result<(), ClientError>;
}

impl<C: Client + ?Sized> Client for &C {
    async fn update_ddl(&self, statements: &[String]) -> Result<(), ClientError> {
        (**self).update_ddl(statements).await
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, ClientError> {
        (**self).query(statement).await
    }

    async fn execute(&self, statement: &Statement) -> Result<u64, ClientError> {
        (**self).execute(statement).await
    }

    async fn prepare(&self, sql: &str) -> Result<(), ClientError> {
        (**self).prepare(sql).await
    }

    async fn begin(&self) -> Result<(), ClientError> {
        (**self).begin().await
    }

    async fn commit(&self) -> Result<(), ClientError> {
        (**self).commit().await
    }

    async fn rollback(&self) -> Result<(), ClientError> {
        (**self).rollback().await
    }
}
