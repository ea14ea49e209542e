//! run-sql - run ad-hoc SQL and print the results as text tables.

use run_sql::cli::Cli;
use run_sql::db::DriverConnector;
use run_sql::{logging, runner};
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Load .env before anything reads the environment (RUST_LOG included)
    let dotenv = dotenvy::dotenv();

    logging::init_stderr_logging(cli.log_level());

    match dotenv {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => debug!("Ignoring .env file: {}", e),
    }

    let stdout = std::io::stdout();
    let result = runner::run(
        &cli,
        std::io::stdin(),
        |key| std::env::var(key).ok(),
        &DriverConnector,
        stdout.lock(),
    )
    .await;

    if let Err(e) = result {
        debug!("{}: {:?}", e.category(), e);
        eprintln!("{e}");
        // Exit here so the runtime does not wait on an abandoned stdin read
        // or a driver call still blocked in a worker thread.
        std::process::exit(e.exit_code());
    }
}
