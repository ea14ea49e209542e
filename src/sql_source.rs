//! Resolution of the SQL text to run.
//!
//! SQL comes from a file (`--file`), the positional argument, or stdin, in
//! that order of precedence.

use crate::error::{Result, RunSqlError};
use crate::signal;
use std::future::Future;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the SQL text of a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlSource {
    /// Read the whole file and trim it.
    File(PathBuf),

    /// Use the argument verbatim.
    Inline(String),

    /// Read stdin to end-of-stream and trim it.
    Stdin,
}

impl SqlSource {
    /// Picks the source from the positional SQL argument and the `--file` flag.
    ///
    /// A file always wins; a missing argument or `-` means stdin.
    pub fn from_args(sql: Option<&str>, file: Option<&Path>) -> Self {
        match (file, sql) {
            (Some(path), _) => Self::File(path.to_path_buf()),
            (None, Some(sql)) if sql != "-" => Self::Inline(sql.to_string()),
            (None, _) => Self::Stdin,
        }
    }

    /// Reads the SQL text, taking stdin from `stdin` when needed.
    ///
    /// Empty results are returned as-is; rejecting them is up to the caller.
    pub fn read_from<R: Read>(&self, mut stdin: R) -> Result<String> {
        match self {
            Self::File(path) => {
                debug!("Reading SQL from {}", path.display());
                std::fs::read_to_string(path)
                    .map(|text| text.trim().to_string())
                    .map_err(|e| RunSqlError::io(path, e))
            }
            Self::Inline(sql) => Ok(sql.clone()),
            Self::Stdin => {
                debug!("Reading SQL from stdin");
                let mut buffer = String::new();
                stdin
                    .read_to_string(&mut buffer)
                    .map(|_| buffer.trim().to_string())
                    .map_err(|e| RunSqlError::io("<stdin>", e))
            }
        }
    }

    /// Reads the SQL text from the process stdin.
    ///
    /// Ctrl-C while waiting for stdin turns into [`RunSqlError::Cancelled`].
    pub async fn read(&self) -> Result<String> {
        self.read_until(std::io::stdin(), signal::ctrl_c()).await
    }

    /// Reads the SQL text, abandoning a pending stdin read once `cancel`
    /// resolves.
    ///
    /// The blocking read runs off the runtime thread so the runtime stays free
    /// to notice `cancel`.
    pub async fn read_until<R, C>(&self, stdin: R, cancel: C) -> Result<String>
    where
        R: Read + Send + 'static,
        C: Future<Output = ()>,
    {
        if *self != Self::Stdin {
            return self.read_from(std::io::empty());
        }

        let source = self.clone();
        let reader = async move {
            tokio::task::spawn_blocking(move || source.read_from(stdin))
                .await
                .map_err(|e| RunSqlError::io("<stdin>", std::io::Error::new(ErrorKind::Other, e)))?
        };

        signal::until_cancelled(reader, cancel, RunSqlError::Cancelled).await
    }
}
