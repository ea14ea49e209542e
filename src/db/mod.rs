//! Database abstraction layer for run-sql.
//!
//! Provides a trait-based interface for database sessions, allowing the
//! runner to drive SQL Server, PostgreSQL or a scripted mock interchangeably.

mod mock;
mod mssql;
mod postgres;
mod types;

pub use mock::{MockConnector, MockDatabaseClient};
pub use mssql::MssqlClient;
pub use postgres::PostgresClient;
pub use types::{ResultSet, Row, StatementOutcome, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseBackend {
    #[default]
    Mssql,
    Postgres,
}

impl DatabaseBackend {
    /// Returns the backend as a string for display and parsing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mssql => "mssql",
            Self::Postgres => "postgres",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql-server" => Some(Self::Mssql),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }

    /// Returns the default port for this backend.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Mssql => 1433,
            Self::Postgres => 5432,
        }
    }

    /// Product name used in user-facing connection errors.
    pub fn product_name(&self) -> &'static str {
        match self {
            Self::Mssql => "SQL Server",
            Self::Postgres => "PostgreSQL",
        }
    }
}

impl std::str::FromStr for DatabaseBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid backend: {s}. Expected: mssql or postgres"))
    }
}

/// Opens database sessions.
///
/// The runner only ever talks to a `Connector`, so tests can observe whether
/// a connection was attempted at all.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establishes a session described by `config`.
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>>;
}

/// Connects with the real driver for the configured backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverConnector;

#[async_trait]
impl Connector for DriverConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        match config.backend {
            DatabaseBackend::Mssql => {
                let client = MssqlClient::connect(config).await?;
                Ok(Box::new(client))
            }
            DatabaseBackend::Postgres => {
                let client = PostgresClient::connect(config).await?;
                Ok(Box::new(client))
            }
        }
    }
}

/// An open database session.
#[async_trait]
pub trait DatabaseClient: Send {
    /// Submits `sql` as one batch and returns a cursor over its boundaries.
    async fn execute<'a>(&'a mut self, sql: &'a str) -> Result<Box<dyn Cursor + 'a>>;

    /// Closes the session. Calling it more than once is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Lazy, forward-only sequence of the boundaries of one executed batch.
#[async_trait]
pub trait Cursor: Send {
    /// Advances to the next boundary, or returns `None` once the batch is exhausted.
    async fn next_outcome(&mut self) -> Result<Option<StatementOutcome>>;
}
