//! Batch execution and rendering.
//!
//! Drives a cursor through every boundary of one executed batch and writes
//! each outcome as text: a numbered table for result sets, a one-line report
//! for statements with a known affected-row count.

use crate::cli::Cli;
use crate::config::ConnectionConfig;
use crate::db::{Connector, DatabaseClient, StatementOutcome};
use crate::error::{Result, RunSqlError};
use crate::signal;
use crate::table::{format_table, row_count_label};
use std::io::{Read, Write};
use tracing::{debug, info, warn};

/// Printed when no boundary of the batch produced any output.
pub const NO_RESULTS_MESSAGE: &str = "SQL executed successfully with no results to display.";

/// Totals over one rendered batch, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Boundaries reported by the driver.
    pub boundaries: usize,

    /// Boundaries rendered as tables.
    pub result_sets: usize,

    /// Rows fetched across all result sets.
    pub rows: usize,

    /// Sum of the known affected-row counts.
    pub affected: u64,
}

/// Writes batch outcomes to `out`, numbering boundaries from 1.
pub struct BatchRenderer<W: Write> {
    out: W,
    index: usize,
    has_output: bool,
    summary: BatchSummary,
}

impl<W: Write> BatchRenderer<W> {
    /// Creates a renderer positioned before the first boundary.
    pub fn new(out: W) -> Self {
        Self {
            out,
            index: 1,
            has_output: false,
            summary: BatchSummary::default(),
        }
    }

    /// Renders the next boundary.
    pub fn render(&mut self, outcome: &StatementOutcome) -> Result<()> {
        let index = self.index;
        self.index += 1;
        self.summary.boundaries += 1;

        match outcome {
            StatementOutcome::Rows(set) if set.has_columns() => {
                self.separate(index)?;
                writeln!(self.out, "Result set {index}:")?;
                for line in format_table(set.columns.as_slice(), &set.rows) {
                    writeln!(self.out, "{line}")?;
                }
                writeln!(self.out, "{}", row_count_label(set.row_count()))?;

                self.has_output = true;
                self.summary.result_sets += 1;
                self.summary.rows += set.row_count();
            }
            StatementOutcome::Affected(Some(count)) => {
                self.separate(index)?;
                writeln!(self.out, "Statement {index} affected {count} row(s).")?;

                self.has_output = true;
                self.summary.affected += count;
            }
            StatementOutcome::Rows(_) | StatementOutcome::Affected(None) => {
                debug!("Boundary {} has no columns and no row count", index);
            }
        }
        Ok(())
    }

    /// Finishes the batch, printing the fallback line if nothing was shown.
    pub fn finish(mut self) -> Result<BatchSummary> {
        if !self.has_output {
            writeln!(self.out, "{NO_RESULTS_MESSAGE}")?;
        }
        self.out.flush()?;
        Ok(self.summary)
    }

    fn separate(&mut self, index: usize) -> Result<()> {
        if index > 1 {
            writeln!(self.out)?;
        }
        Ok(())
    }
}

/// Executes `sql` on an open session and renders every boundary to `out`.
///
/// Output rendered before an iteration error stays written.
pub async fn execute_batch<W: Write>(
    client: &mut dyn DatabaseClient,
    sql: &str,
    out: W,
) -> Result<BatchSummary> {
    let mut cursor = client.execute(sql).await?;
    let mut renderer = BatchRenderer::new(out);

    while let Some(outcome) = cursor.next_outcome().await? {
        renderer.render(&outcome)?;
    }

    renderer.finish()
}

/// Rejects SQL text that is empty once whitespace is trimmed.
pub fn require_sql(sql: &str) -> Result<()> {
    if sql.trim().is_empty() {
        return Err(RunSqlError::Usage);
    }
    Ok(())
}

/// Runs one batch end to end: connect, execute, render, close.
///
/// Blank SQL is rejected before any connection is attempted. The session is
/// closed whether execution succeeds or fails.
pub async fn run_sql<W: Write>(
    sql: &str,
    config: &ConnectionConfig,
    connector: &dyn Connector,
    out: W,
) -> Result<BatchSummary> {
    require_sql(sql)?;

    info!("Connecting to {}", config.display_string());
    let mut client = connector.connect(config).await?;

    let outcome = execute_batch(client.as_mut(), sql, out).await;

    if let Err(e) = client.close().await {
        warn!("Failed to close session cleanly: {}", e);
    }

    match &outcome {
        Ok(summary) => info!(
            "Batch finished: {} boundaries, {} result sets, {} rows, {} affected",
            summary.boundaries, summary.result_sets, summary.rows, summary.affected
        ),
        Err(e) => debug!("Batch failed: {}", e),
    }
    outcome
}

/// Runs the whole command described by `cli`.
///
/// The SQL is resolved and checked before the connection settings, so a
/// missing query is reported as such even when the environment is also
/// broken. Ctrl-C while connecting or executing aborts with
/// [`RunSqlError::Interrupted`].
pub async fn run<R, E, W>(
    cli: &Cli,
    stdin: R,
    env: E,
    connector: &dyn Connector,
    out: W,
) -> Result<BatchSummary>
where
    R: Read + Send + 'static,
    E: Fn(&str) -> Option<String>,
    W: Write,
{
    let sql = cli.sql_source().read_until(stdin, signal::ctrl_c()).await?;
    require_sql(&sql)?;

    let config = ConnectionConfig::resolve_with(&cli.connection_overrides(), env)?;

    signal::until_cancelled(
        run_sql(&sql, &config, connector, out),
        signal::ctrl_c(),
        RunSqlError::Interrupted,
    )
    .await
}
