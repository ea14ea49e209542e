//! Ctrl-C handling.
//!
//! Once the process listens for SIGINT the default "terminate" action is gone
//! for good, so every phase that can block (reading stdin, connecting,
//! running the batch) has to be raced against the signal explicitly.

use crate::error::{Result, RunSqlError};
use std::future::Future;
use tracing::debug;

/// Resolves when the user presses Ctrl-C.
///
/// Never resolves if the handler could not be installed.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        debug!("Unable to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Runs `work` unless `cancel` resolves first, in which case `on_cancel` is
/// returned and `work` is dropped.
pub async fn until_cancelled<T, W, C>(work: W, cancel: C, on_cancel: RunSqlError) -> Result<T>
where
    W: Future<Output = Result<T>>,
    C: Future<Output = ()>,
{
    tokio::select! {
        biased;
        () = cancel => Err(on_cancel),
        result = work => result,
    }
}
