//! Database handle and transactions.

use std::collections::HashSet;
use std::ops::Deref;

use spanner_migrate::migrator::{Migrator, MigratorOptions};
use spanner_sql_core::schema::{ModelSchema, Row};
use spanner_sql_core::{Client, Statement};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::dialector::SpannerDialector;
use crate::error::Result;

/// A database opened through the Spanner dialector.
///
/// All ORM statements go through [`query`](Self::query) and
/// [`execute`](Self::execute), which log the explained SQL and prepare
/// statements when `prepare_stmt` is set. Transaction state lives in the
/// client; this handle only decides when to begin, commit and roll back.
#[derive(Debug)]
pub struct Db<C: Client> {
    client: C,
    dialector: SpannerDialector,
    prepared: Mutex<HashSet<String>>,
}

impl<C: Client> Db<C> {
    /// Opens a database on `client`.
    pub fn open(dialector: SpannerDialector, client: C) -> Self {
        debug!(
            dialect = dialector.name(),
            database = %dialector.data_source().database_name(),
            "Opened database"
        );
        Self {
            client,
            dialector,
            prepared: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Returns the dialector.
    #[must_use]
    pub const fn dialector(&self) -> &SpannerDialector {
        &self.dialector
    }

    /// Returns a migrator sending DDL through this database's client.
    #[must_use]
    pub fn migrator(&self) -> Migrator<&C> {
        Migrator::new(&self.client)
    }

    /// Returns a migrator with explicit options.
    #[must_use]
    pub const fn migrator_with(&self, options: MigratorOptions) -> Migrator<&C> {
        Migrator::with_options(&self.client, options)
    }

    /// Creates or extends the tables of `models`, applying the configured
    /// default string size first.
    ///
    /// # Errors
    ///
    /// Returns an error if a model cannot be expressed in Spanner DDL or the
    /// schema update fails.
    pub async fn auto_migrate(&self, models: &[ModelSchema]) -> Result<Vec<String>> {
        let models: Vec<ModelSchema> = models
            .iter()
            .map(|m| self.dialector.apply_defaults(m))
            .collect();
        Ok(self.migrator().auto_migrate(&models).await?)
    }

    async fn prepare(&self, sql: &str) -> Result<()> {
        if !self.dialector.config().prepare_stmt {
            return Ok(());
        }
        let mut prepared = self.prepared.lock().await;
        if !prepared.contains(sql) {
            debug!(sql, "Preparing statement");
            self.client.prepare(sql).await?;
            prepared.insert(String::from(sql));
        }
        Ok(())
    }

    /// Runs a query and returns its rows.
    ///
    /// # Errors
    ///
    /// Client errors are returned unchanged.
    pub async fn query(&self, statement: &Statement) -> Result<Vec<Row>> {
        self.prepare(&statement.sql).await?;
        let rows = self.client.query(statement).await?;
        debug!(
            sql = %self.dialector.explain(&statement.sql, &statement.params),
            rows = rows.len(),
            "Query"
        );
        Ok(rows)
    }

    /// Runs a DML statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Client errors are returned unchanged.
    pub async fn execute(&self, statement: &Statement) -> Result<u64> {
        self.prepare(&statement.sql).await?;
        let affected = self.client.execute(statement).await?;
        debug!(
            sql = %self.dialector.explain(&statement.sql, &statement.params),
            rows = affected,
            "Execute"
        );
        Ok(affected)
    }

    /// Runs a raw SQL statement without parameters.
    ///
    /// # Errors
    ///
    /// Client errors are returned unchanged.
    pub async fn exec(&self, sql: &str) -> Result<u64> {
        self.execute(&Statement::raw(sql)).await
    }

    /// Starts a read/write transaction.
    ///
    /// # Errors
    ///
    /// Client errors are returned unchanged.
    pub async fn begin(&self) -> Result<Transaction<'_, C>> {
        self.client.begin().await?;
        debug!("Transaction started");
        Ok(Transaction {
            db: self,
            joined: false,
            finished: false,
        })
    }
}

/// A read/write transaction.
///
/// Dereferences to the [`Db`] it runs on, so managers and query sets take
/// `&tx` wherever they take `&db`. A transaction dropped without
/// [`commit`](Self::commit) or [`rollback`](Self::rollback) is left to the
/// client, which rolls it back when its session is reused.
#[derive(Debug)]
pub struct Transaction<'a, C: Client> {
    db: &'a Db<C>,
    joined: bool,
    finished: bool,
}

impl<'a, C: Client> Transaction<'a, C> {
    /// Returns whether this transaction joined an outer one.
    #[must_use]
    pub const fn is_joined(&self) -> bool {
        self.joined
    }

    /// Opens a nested transaction.
    ///
    /// With `disable_nested_transaction` (the default) the nested
    /// transaction joins this one: its statements run in the outer
    /// transaction and its commit and rollback do nothing.
    ///
    /// # Errors
    ///
    /// Returns `OrmError::SavepointNotSupported` when nested transactions
    /// are enabled, since they would need a savepoint.
    pub fn nested(&self) -> Result<Self> {
        if !self.db.dialector.config().disable_nested_transaction {
            self.db.dialector.savepoint("nested")?;
        }
        debug!("Nested transaction joins the outer transaction");
        Ok(Self {
            db: self.db,
            joined: true,
            finished: false,
        })
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Client errors are returned unchanged.
    pub async fn commit(mut self) -> Result<()> {
        self.finished = true;
        if self.joined {
            return Ok(());
        }
        self.db.client.commit().await?;
        debug!("Transaction committed");
        Ok(())
    }

    /// Rolls the transaction back.
    ///
    /// # Errors
    ///
    /// Client errors are returned unchanged.
    pub async fn rollback(mut self) -> Result<()> {
        self.finished = true;
        if self.joined {
            return Ok(());
        }
        self.db.client.rollback().await?;
        debug!("Transaction rolled back");
        Ok(())
    }
}

impl<C: Client> Deref for Transaction<'_, C> {
    type Target = Db<C>;

    fn deref(&self) -> &Db<C> {
        self.db
    }
}

impl<C: Client> Drop for Transaction<'_, C> {
    fn drop(&mut self) {
        if !self.finished && !self.joined {
            warn!("Transaction dropped without commit or rollback");
        }
    }
}
