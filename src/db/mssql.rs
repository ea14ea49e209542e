//! SQL Server database client implementation.
//!
//! Provides the `MssqlClient` struct that implements the `DatabaseClient` trait
//! for SQL Server through the system ODBC driver manager using odbc-api.
//!
//! ODBC reports every statement of a batch as its own result, including the
//! affected-row count of statements that return no columns. ODBC calls block
//! and the connection borrows its environment, so each session lives on a
//! dedicated worker thread and the async side talks to it over channels.

use crate::config::{ConnectionConfig, ENV_ODBC_DRIVER};
use crate::db::{Cursor, DatabaseClient, ResultSet, Row, StatementOutcome, Value};
use crate::error::{Result, RunSqlError};
use async_trait::async_trait;
use odbc_api::handles::{AsStatementRef, SqlResult, Statement};
use odbc_api::{
    Connection, ConnectionOptions, Cursor as OdbcCursor, CursorImpl, CursorRow, DataType,
    Environment, ResultSetMetadata,
};
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

const PRODUCT: &str = "SQL Server";

/// SQL Server database client.
pub struct MssqlClient {
    requests: Option<mpsc::Sender<BatchRequest>>,
    worker: Option<JoinHandle<()>>,
}

/// One batch handed to the session worker.
struct BatchRequest {
    sql: String,
    outcomes: mpsc::Sender<Result<StatementOutcome>>,
}

impl MssqlClient {
    /// Opens an ODBC session described by `config` on a new worker thread.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let connection_string = connection_string(config);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (requests_tx, requests_rx) = mpsc::channel(1);

        let worker = std::thread::Builder::new()
            .name("run-sql-mssql".to_string())
            .spawn(move || session_worker(&connection_string, ready_tx, requests_rx))
            .map_err(|e| RunSqlError::connection(PRODUCT, e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(diagnostic)) => return Err(map_connection_error(&diagnostic, config)),
            Err(_) => {
                return Err(RunSqlError::connection(
                    PRODUCT,
                    "session worker stopped before connecting",
                ))
            }
        }

        debug!("Successfully connected to {}", config.display_string());
        Ok(Self {
            requests: Some(requests_tx),
            worker: Some(worker),
        })
    }
}

#[async_trait]
impl DatabaseClient for MssqlClient {
    async fn execute<'a>(&'a mut self, sql: &'a str) -> Result<Box<dyn Cursor + 'a>> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| RunSqlError::execution("session is closed"))?;

        // Capacity 1 keeps the worker at most one statement ahead of rendering.
        let (outcomes_tx, outcomes_rx) = mpsc::channel(1);
        requests
            .send(BatchRequest {
                sql: sql.to_string(),
                outcomes: outcomes_tx,
            })
            .await
            .map_err(|_| RunSqlError::execution("SQL Server session is no longer open"))?;

        Ok(Box::new(MssqlCursor {
            outcomes: outcomes_rx,
        }))
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the request sender ends the worker loop, which drops the
        // connection and disconnects.
        self.requests.take();

        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| RunSqlError::connection(PRODUCT, e.to_string()))?
                .map_err(|_| RunSqlError::connection(PRODUCT, "session worker panicked"))?;
            debug!("Closed SQL Server session");
        }
        Ok(())
    }
}

/// Receives the outcomes the worker produces for one batch.
///
/// A closed channel means the worker has walked every statement.
struct MssqlCursor {
    outcomes: mpsc::Receiver<Result<StatementOutcome>>,
}

#[async_trait]
impl Cursor for MssqlCursor {
    async fn next_outcome(&mut self) -> Result<Option<StatementOutcome>> {
        self.outcomes.recv().await.transpose()
    }
}

/// Owns the ODBC environment and connection for the lifetime of a session.
fn session_worker(
    connection_string: &str,
    ready: oneshot::Sender<std::result::Result<(), String>>,
    mut requests: mpsc::Receiver<BatchRequest>,
) {
    let environment = match Environment::new() {
        Ok(environment) => environment,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    let connection = match environment
        .connect_with_connection_string(connection_string, ConnectionOptions::default())
    {
        Ok(connection) => connection,
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Some(request) = requests.blocking_recv() {
        if let Err(e) = run_batch(&connection, &request.sql, &request.outcomes) {
            let message = server_message(&e.to_string()).to_string();
            // Nobody is listening any more if the cursor was dropped.
            let _ = request
                .outcomes
                .blocking_send(Err(RunSqlError::execution(message)));
        }
    }
}

/// Executes `sql` and sends one outcome per statement of the batch.
///
/// Stops early once the receiving cursor has been dropped.
fn run_batch(
    connection: &Connection<'_>,
    sql: &str,
    outcomes: &mpsc::Sender<Result<StatementOutcome>>,
) -> std::result::Result<(), odbc_api::Error> {
    let mut statement = connection.preallocate()?;

    // A batch whose first statement has no columns comes back without a
    // cursor. Release the returned cursor without closing it so every
    // statement is walked through the same handle below.
    if let Some(first) = statement.execute(sql, ())? {
        first.into_stmt();
    }

    // SAFETY: the statement was just executed and nothing else holds a
    // cursor on it, so this cursor is the only owner of its pending results.
    let mut cursor = unsafe { CursorImpl::new(statement.as_stmt_ref()) };

    loop {
        let outcome = if cursor.num_result_cols()? > 0 {
            StatementOutcome::Rows(fetch_result_set(&mut cursor)?)
        } else {
            rows_affected(&mut cursor)
        };

        if outcomes.blocking_send(Ok(outcome)).is_err() {
            debug!("Cursor dropped, abandoning the rest of the batch");
            return Ok(());
        }

        match cursor.more_results()? {
            Some(next) => cursor = next,
            None => return Ok(()),
        }
    }
}

/// Reads the column names and every row of the current result set.
fn fetch_result_set<C>(cursor: &mut C) -> std::result::Result<ResultSet, odbc_api::Error>
where
    C: OdbcCursor + ResultSetMetadata,
{
    let count = u16::try_from(cursor.num_result_cols()?).unwrap_or(0);

    let mut columns = Vec::with_capacity(usize::from(count));
    let mut kinds = Vec::with_capacity(usize::from(count));
    for number in 1..=count {
        columns.push(cursor.col_name(number)?);
        kinds.push(CellKind::from(cursor.col_data_type(number)?));
    }

    let mut set = ResultSet::new(columns);
    let mut buffer = Vec::new();
    while let Some(mut row) = cursor.next_row()? {
        let mut values = Row::with_capacity(kinds.len());
        for (number, kind) in (1..=count).zip(&kinds) {
            values.push(read_cell(&mut row, number, *kind, &mut buffer)?);
        }
        set.rows.push(values);
    }
    Ok(set)
}

/// Affected-row count of a statement without columns.
fn rows_affected(cursor: &mut impl AsStatementRef) -> StatementOutcome {
    let statement = cursor.as_stmt_ref();
    match statement.row_count() {
        SqlResult::Success(count) | SqlResult::SuccessWithInfo(count) => {
            StatementOutcome::from_rowcount(count)
        }
        _ => StatementOutcome::Affected(None),
    }
}

/// How a column's cells are fetched and decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Integer,
    Float,
    Bit,
    Binary,
    Text,
}

impl From<DataType> for CellKind {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::TinyInt | DataType::SmallInt | DataType::Integer | DataType::BigInt => {
                Self::Integer
            }
            DataType::Real | DataType::Double | DataType::Float { .. } => Self::Float,
            DataType::Bit => Self::Bit,
            DataType::Binary { .. } | DataType::Varbinary { .. } | DataType::LongVarbinary { .. } => {
                Self::Binary
            }
            // Decimals, dates, times, GUIDs and XML keep the driver's text form.
            _ => Self::Text,
        }
    }
}

fn read_cell(
    row: &mut CursorRow<'_>,
    number: u16,
    kind: CellKind,
    buffer: &mut Vec<u8>,
) -> std::result::Result<Value, odbc_api::Error> {
    let present = match kind {
        CellKind::Binary => row.get_binary(number, buffer)?,
        _ => row.get_text(number, buffer)?,
    };
    Ok(if present {
        convert_cell(kind, buffer)
    } else {
        Value::Null
    })
}

/// Converts the raw bytes of a non-NULL cell to our Value type.
fn convert_cell(kind: CellKind, bytes: &[u8]) -> Value {
    if kind == CellKind::Binary {
        return Value::Bytes(bytes.to_vec());
    }

    let text = String::from_utf8_lossy(bytes).into_owned();
    match kind {
        CellKind::Integer => text
            .trim()
            .parse()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::String(text)),
        CellKind::Float => text
            .trim()
            .parse()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::String(text)),
        CellKind::Bit => match text.trim() {
            "1" => Value::Bool(true),
            "0" => Value::Bool(false),
            _ => Value::String(text),
        },
        CellKind::Binary | CellKind::Text => Value::String(text),
    }
}

/// Builds the ODBC connection string for `config`.
///
/// The server certificate is trusted because local containers ship a
/// self-signed one.
fn connection_string(config: &ConnectionConfig) -> String {
    format!(
        "Driver={};Server=tcp:{},{};Database={};UID={};PWD={};TrustServerCertificate=yes;",
        quote(&config.odbc_driver),
        config.server,
        config.port,
        quote(&config.database),
        quote(&config.user),
        quote(&config.password),
    )
}

/// Braces a connection-string value so `;` and `=` lose their meaning.
fn quote(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

/// Maps ODBC connection diagnostics to user-facing messages.
fn map_connection_error(diagnostic: &str, config: &ConnectionConfig) -> RunSqlError {
    let lower = diagnostic.to_lowercase();

    let message = if lower.contains("data source name not found") || lower.contains("can't open lib")
    {
        format!(
            "ODBC driver '{}' is not installed. Install it or name an installed driver in {}.",
            config.odbc_driver, ENV_ODBC_DRIVER
        )
    } else if lower.contains("login timeout expired") || lower.contains("tcp provider") {
        format!(
            "Cannot reach {}:{}. Check that the server is running.",
            config.server, config.port
        )
    } else {
        server_message(diagnostic).to_string()
    };

    RunSqlError::connection(PRODUCT, message)
}

/// Extracts the server's own text from an ODBC diagnostic, dropping the
/// `[vendor][driver][source]` prefix the driver manager adds.
fn server_message(diagnostic: &str) -> &str {
    let mut message = diagnostic
        .rsplit_once("Message: ")
        .map_or(diagnostic, |(_, message)| message)
        .trim();

    while let Some(rest) = message.strip_prefix('[') {
        match rest.split_once(']') {
            Some((_, tail)) => message = tail,
            None => break,
        }
    }
    message.trim()
}
