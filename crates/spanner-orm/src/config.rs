//! Dialector configuration and data source names.
//!
//! A data source name points at one database:
//!
//! ```text
//! [host:port/]projects/PROJECT/instances/INSTANCE/databases/DATABASE[?key=value;key=value]
//! ```
//!
//! The host part is used for emulators and custom endpoints; without it the
//! client library connects to the public Spanner endpoint.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The only driver name the dialector accepts.
pub const DRIVER_NAME: &str = "spanner";

/// Errors raised while validating a [`Config`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The driver is not the Spanner driver.
    #[error("unsupported driver '{0}', expected '{DRIVER_NAME}'")]
    UnsupportedDriver(String),

    /// The data source name does not name a database.
    #[error("invalid data source name '{dsn}': {reason}")]
    InvalidDsn {
        /// The data source name as given.
        dsn: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The endpoint port is not a number.
    #[error("invalid port '{0}' in data source name")]
    InvalidPort(String),
}

fn invalid(dsn: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidDsn {
        dsn: String::from(dsn),
        reason: String::from(reason),
    }
}

/// Configuration of a [`SpannerDialector`](crate::SpannerDialector).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Driver name; must be `spanner`.
    pub driver_name: String,
    /// Data source name.
    pub dsn: String,
    /// Prepare each distinct statement once before running it.
    pub prepare_stmt: bool,
    /// Join the outer transaction instead of opening a nested one.
    ///
    /// Spanner has no savepoints, so nested transactions can only be joined.
    pub disable_nested_transaction: bool,
    /// Drop `FOR UPDATE`/`FOR SHARE` clauses instead of failing.
    pub disable_locking_clause: bool,
    /// Length of string columns that declare no size; `None` is `STRING(MAX)`.
    pub default_string_size: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            driver_name: String::from(DRIVER_NAME),
            dsn: String::new(),
            prepare_stmt: false,
            disable_nested_transaction: true,
            disable_locking_clause: true,
            default_string_size: None,
        }
    }
}

impl Config {
    /// Creates a configuration for `dsn` with the default settings.
    #[must_use]
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            ..Self::default()
        }
    }

    /// Enables or disables statement preparation.
    #[must_use]
    pub const fn prepare_stmt(mut self, enabled: bool) -> Self {
        self.prepare_stmt = enabled;
        self
    }

    /// Sets the default length of unsized string columns.
    #[must_use]
    pub const fn default_string_size(mut self, size: u32) -> Self {
        self.default_string_size = Some(size);
        self
    }

    /// Validates the driver name and parses the data source name.
    ///
    /// # Errors
    ///
    /// Returns an error for any driver other than `spanner` and for data
    /// source names that do not name a database.
    pub fn validate(&self) -> Result<DataSource, ConfigError> {
        if self.driver_name != DRIVER_NAME {
            return Err(ConfigError::UnsupportedDriver(self.driver_name.clone()));
        }
        self.dsn.parse()
    }
}

/// A parsed data source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    /// Endpoint host, when not the public endpoint.
    pub host: Option<String>,
    /// Endpoint port.
    pub port: Option<u16>,
    /// Project ID.
    pub project: String,
    /// Instance ID.
    pub instance: String,
    /// Database ID.
    pub database: String,
    /// Connection parameters in the order given.
    pub params: Vec<(String, String)>,
}

impl DataSource {
    /// Returns the fully qualified database name.
    #[must_use]
    pub fn database_name(&self) -> String {
        format!(
            "projects/{}/instances/{}/databases/{}",
            self.project, self.instance, self.database
        )
    }

    /// Returns the value of the connection parameter `key`, ignoring case.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Returns whether the data source points at the emulator or a custom endpoint.
    #[must_use]
    pub const fn has_endpoint(&self) -> bool {
        self.host.is_some()
    }
}

impl FromStr for DataSource {
    type Err = ConfigError;

    fn from_str(dsn: &str) -> Result<Self, Self::Err> {
        let trimmed = dsn.trim();
        if trimmed.is_empty() {
            return Err(invalid(dsn, "empty"));
        }

        let (path, query) = match trimmed.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (trimmed, None),
        };

        let (endpoint, path) = match path.find("projects/") {
            Some(0) => (None, path),
            Some(pos) => (Some(path[..pos].trim_end_matches('/')), &path[pos..]),
            None => return Err(invalid(dsn, "missing 'projects/'")),
        };

        let (host, port) = match endpoint {
            Some(endpoint) if !endpoint.is_empty() => {
                let (host, port) = match endpoint.rsplit_once(':') {
                    Some((host, port)) => {
                        let port: u16 = port
                            .parse()
                            .map_err(|_| ConfigError::InvalidPort(String::from(port)))?;
                        (host, Some(port))
                    }
                    None => (endpoint, None),
                };
                (Some(String::from(host)), port)
            }
            _ => (None, None),
        };

        let parts: Vec<&str> = path.split('/').collect();
        let [projects, project, instances, instance, databases, database] = parts.as_slice() else {
            return Err(invalid(
                dsn,
                "expected projects/PROJECT/instances/INSTANCE/databases/DATABASE",
            ));
        };
        if *projects != "projects" || *instances != "instances" || *databases != "databases" {
            return Err(invalid(
                dsn,
                "expected projects/PROJECT/instances/INSTANCE/databases/DATABASE",
            ));
        }
        if project.is_empty() || instance.is_empty() || database.is_empty() {
            return Err(invalid(dsn, "project, instance and database must not be empty"));
        }

        let mut params = vec![];
        for pair in query.into_iter().flat_map(|q| q.split(';')) {
            if pair.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = pair.split_once('=') else {
                return Err(invalid(dsn, &format!("parameter '{pair}' has no value")));
            };
            params.push((String::from(key.trim()), String::from(value.trim())));
        }

        Ok(Self {
            host,
            port,
            project: String::from(*project),
            instance: String::from(*instance),
            database: String::from(*database),
            params,
        })
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(host) = &self.host {
            match self.port {
                Some(port) => write!(f, "{host}:{port}/")?,
                None => write!(f, "{host}/")?,
            }
        }
        f.write_str(&self.database_name())?;
        if !self.params.is_empty() {
            let params: Vec<String> = self.params.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, "?{}", params.join(";"))?;
        }
        Ok(())
    }
}
