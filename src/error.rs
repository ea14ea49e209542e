//! Error types for run-sql.
//!
//! Every fatal condition of a run maps onto one variant of [`RunSqlError`].
//! The `Display` text is the single line printed on stderr before exiting.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for run-sql operations.
#[derive(Error, Debug)]
pub enum RunSqlError {
    /// No SQL text could be resolved from the argument, file, or stdin.
    #[error("No SQL provided. Supply it as an argument, file, or via stdin.")]
    Usage,

    /// The SQL file could not be read.
    #[error("Unable to read SQL from {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stdin read was interrupted by the user.
    #[error("SQL input cancelled.")]
    Cancelled,

    /// Ctrl-C arrived while connecting or running the batch.
    #[error("Interrupted.")]
    Interrupted,

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Failed to connect to {product}: {message}")]
    Connection {
        product: &'static str,
        message: String,
    },

    /// Execution errors (syntax errors, constraint violations, broken result streams).
    #[error("Failed to execute SQL: {0}")]
    Execution(String),

    /// Invalid configuration values (bad port, unknown backend, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Writing the rendered output failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl RunSqlError {
    /// Creates an I/O error for the given SQL file.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a connection error for the named database product.
    pub fn connection(product: &'static str, msg: impl Into<String>) -> Self {
        Self::Connection {
            product,
            message: msg.into(),
        }
    }

    /// Creates an execution error with the given driver diagnostic.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for log output.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Usage => "Usage Error",
            Self::Io { .. } => "I/O Error",
            Self::Cancelled => "Cancelled",
            Self::Interrupted => "Interrupted",
            Self::Connection { .. } => "Connection Error",
            Self::Execution(_) => "Execution Error",
            Self::Config(_) => "Configuration Error",
            Self::Output(_) => "Output Error",
        }
    }

    /// Process exit status for this error.
    ///
    /// Usage problems follow the clap convention of `2`, an interrupt exits
    /// like SIGINT with `130`, and everything else is `1`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage | Self::Config(_) => 2,
            Self::Interrupted => 130,
            _ => 1,
        }
    }
}

/// Result type alias using RunSqlError.
pub type Result<T> = std::result::Result<T, RunSqlError>;
