//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using tokio-postgres and the simple-query protocol.

use crate::config::ConnectionConfig;
use crate::db::{Cursor, DatabaseClient, ResultSet, Row, StatementOutcome};
use crate::error::{Result, RunSqlError};
use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage, SimpleQueryRow};
use tracing::debug;

const PRODUCT: &str = "PostgreSQL";

/// PostgreSQL database client.
pub struct PostgresClient {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
}

impl PostgresClient {
    /// Opens a single connection described by `config`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.server)
            .port(config.port)
            .dbname(&config.database)
            .user(&config.user)
            .password(&config.password);

        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| map_connection_error(&e, config))?;

        // The connection object drives the socket; it finishes once the
        // client is dropped.
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!("PostgreSQL connection ended with error: {}", e);
            }
        });

        debug!("Successfully connected to {}", config.display_string());
        Ok(Self {
            client: Some(client),
            connection: Some(connection),
        })
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn execute<'a>(&'a mut self, sql: &'a str) -> Result<Box<dyn Cursor + 'a>> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| RunSqlError::execution("session is closed"))?;

        // A multi-statement simple query runs as one implicit transaction, so
        // a failing statement leaves nothing from the batch worth showing.
        let messages = client
            .simple_query(sql)
            .await
            .map_err(|e| RunSqlError::execution(format_query_error(&e)))?;

        Ok(Box::new(PostgresCursor {
            messages: messages.into_iter(),
            current: None,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            drop(client);
            if let Some(connection) = self.connection.take() {
                connection
                    .await
                    .map_err(|e| RunSqlError::connection(PRODUCT, e.to_string()))?;
            }
            debug!("Closed PostgreSQL session");
        }
        Ok(())
    }
}

/// Walks the messages of a simple-query batch.
///
/// A row description opens a result set, even one that ends up with no rows.
/// A command completion closes the result set if one is open; otherwise the
/// statement had no columns and its affected-row count is reported.
struct PostgresCursor {
    messages: std::vec::IntoIter<SimpleQueryMessage>,
    current: Option<ResultSet>,
}

#[async_trait]
impl Cursor for PostgresCursor {
    async fn next_outcome(&mut self) -> Result<Option<StatementOutcome>> {
        Ok(self.advance())
    }
}

impl PostgresCursor {
    fn advance(&mut self) -> Option<StatementOutcome> {
        for message in self.messages.by_ref() {
            match message {
                SimpleQueryMessage::RowDescription(columns) => {
                    let names = columns.iter().map(|c| c.name().to_string()).collect();
                    self.current = Some(ResultSet::new(names));
                }
                SimpleQueryMessage::Row(row) => {
                    let set = self.current.get_or_insert_with(|| {
                        ResultSet::new(row.columns().iter().map(|c| c.name().to_string()).collect())
                    });
                    set.rows.push(convert_row(&row));
                }
                SimpleQueryMessage::CommandComplete(count) => {
                    return Some(match self.current.take() {
                        Some(set) => StatementOutcome::Rows(set),
                        None => StatementOutcome::Affected(Some(count)),
                    });
                }
                _ => {}
            }
        }

        self.current.take().map(StatementOutcome::Rows)
    }
}

/// Converts a text-encoded row to our Row type.
///
/// The simple-query protocol sends every value in its server-side text form
/// (numeric, timestamps, uuid, json, bytea as `\x...`); NULL stays NULL.
fn convert_row(row: &SimpleQueryRow) -> Row {
    (0..row.len())
        .map(|i| row.get(i).map(str::to_string).into())
        .collect()
}

/// Maps tokio-postgres connection errors to user-facing messages.
fn map_connection_error(error: &tokio_postgres::Error, config: &ConnectionConfig) -> RunSqlError {
    let error_str = match error.as_db_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    };
    let lower = error_str.to_lowercase();

    let message = if lower.contains("connection refused") {
        format!(
            "Cannot connect to {}:{}. Check that the server is running.",
            config.server, config.port
        )
    } else if lower.contains("password authentication failed") {
        format!(
            "Authentication failed for user '{}'. Check your credentials.",
            config.user
        )
    } else if lower.contains("does not exist") && lower.contains("database") {
        format!("Database '{}' does not exist.", config.database)
    } else {
        error_str
    };

    RunSqlError::connection(PRODUCT, message)
}

/// Formats a query error with detail and hint if available.
fn format_query_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(detail) = db_error.detail() {
        result.push_str("\n  DETAIL: ");
        result.push_str(detail);
    }
    if let Some(hint) = db_error.hint() {
        result.push_str("\n  HINT: ");
        result.push_str(hint);
    }

    result
}
