//! Mock database backend for testing.
//!
//! Replays scripted batch outcomes and records every call made against it,
//! so tests can assert on connects, executed SQL and session release.

use super::{Connector, Cursor, DatabaseClient, StatementOutcome};
use crate::config::ConnectionConfig;
use crate::error::{Result, RunSqlError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Calls observed by a mock connector and the clients it handed out.
#[derive(Debug, Default)]
pub struct MockState {
    /// Number of `connect` calls.
    pub connect_calls: usize,

    /// Configuration passed to the most recent `connect`.
    pub last_config: Option<ConnectionConfig>,

    /// SQL text of every `execute` call, in order.
    pub executed: Vec<String>,

    /// Number of sessions that were closed.
    pub close_calls: usize,
}

#[derive(Debug, Clone)]
enum Script {
    Outcomes(Vec<StatementOutcome>),
    FailExecute(String),
    FailAfter(Vec<StatementOutcome>, String),
}

type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A connector that hands out [`MockDatabaseClient`]s.
#[derive(Debug, Clone)]
pub struct MockConnector {
    state: SharedState,
    connect_error: Option<String>,
    script: Script,
}

impl MockConnector {
    /// Creates a connector whose sessions yield `outcomes` for any batch.
    pub fn new(outcomes: Vec<StatementOutcome>) -> Self {
        Self {
            state: SharedState::default(),
            connect_error: None,
            script: Script::Outcomes(outcomes),
        }
    }

    /// Creates a connector whose `connect` always fails with `message`.
    pub fn failing_connect(message: impl Into<String>) -> Self {
        Self {
            connect_error: Some(message.into()),
            ..Self::new(Vec::new())
        }
    }

    /// Creates a connector whose sessions reject every batch with `message`.
    pub fn failing_execute(message: impl Into<String>) -> Self {
        Self {
            script: Script::FailExecute(message.into()),
            ..Self::new(Vec::new())
        }
    }

    /// Creates a connector whose cursors yield `outcomes` and then fail with `message`.
    pub fn failing_mid_batch(outcomes: Vec<StatementOutcome>, message: impl Into<String>) -> Self {
        Self {
            script: Script::FailAfter(outcomes, message.into()),
            ..Self::new(Vec::new())
        }
    }

    /// Number of `connect` calls so far.
    pub fn connect_calls(&self) -> usize {
        lock(&self.state).connect_calls
    }

    /// Number of sessions closed so far.
    pub fn close_calls(&self) -> usize {
        lock(&self.state).close_calls
    }

    /// SQL submitted so far.
    pub fn executed(&self) -> Vec<String> {
        lock(&self.state).executed.clone()
    }

    /// Configuration of the most recent `connect` call.
    pub fn last_config(&self) -> Option<ConnectionConfig> {
        lock(&self.state).last_config.clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn DatabaseClient>> {
        {
            let mut state = lock(&self.state);
            state.connect_calls += 1;
            state.last_config = Some(config.clone());
        }

        if let Some(message) = &self.connect_error {
            return Err(RunSqlError::connection(
                config.backend.product_name(),
                message.clone(),
            ));
        }

        Ok(Box::new(MockDatabaseClient {
            state: Arc::clone(&self.state),
            script: self.script.clone(),
            closed: false,
        }))
    }
}

/// A mock session that replays a scripted batch.
#[derive(Debug)]
pub struct MockDatabaseClient {
    state: SharedState,
    script: Script,
    closed: bool,
}

impl MockDatabaseClient {
    /// Creates a standalone mock session yielding `outcomes`.
    pub fn new(outcomes: Vec<StatementOutcome>) -> Self {
        Self {
            state: SharedState::default(),
            script: Script::Outcomes(outcomes),
            closed: false,
        }
    }
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn execute<'a>(&'a mut self, sql: &'a str) -> Result<Box<dyn Cursor + 'a>> {
        if self.closed {
            return Err(RunSqlError::execution("session is closed"));
        }
        lock(&self.state).executed.push(sql.to_string());

        let cursor = match &self.script {
            Script::Outcomes(outcomes) => MockCursor::new(outcomes.clone(), None),
            Script::FailExecute(message) => return Err(RunSqlError::execution(message.clone())),
            Script::FailAfter(outcomes, message) => {
                MockCursor::new(outcomes.clone(), Some(message.clone()))
            }
        };
        Ok(Box::new(cursor))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            lock(&self.state).close_calls += 1;
        }
        Ok(())
    }
}

struct MockCursor {
    pending: VecDeque<StatementOutcome>,
    error: Option<String>,
}

impl MockCursor {
    fn new(outcomes: Vec<StatementOutcome>, error: Option<String>) -> Self {
        Self {
            pending: outcomes.into(),
            error,
        }
    }
}

#[async_trait]
impl Cursor for MockCursor {
    async fn next_outcome(&mut self) -> Result<Option<StatementOutcome>> {
        if let Some(outcome) = self.pending.pop_front() {
            return Ok(Some(outcome));
        }
        match self.error.take() {
            Some(message) => Err(RunSqlError::execution(message)),
            None => Ok(None),
        }
    }
}
