//! Command-line argument parsing for run-sql.

use crate::config::ConnectionOverrides;
use crate::db::DatabaseBackend;
use crate::sql_source::SqlSource;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

const ENV_HELP: &str = "\
Environment variables (used when the matching flag is absent):
  SQLSERVER_HOST, SQLSERVER_PORT, SQLSERVER_DATABASE,
  SQLSERVER_USER, SQLSERVER_PASSWORD, SQLSERVER_ODBC_DRIVER,
  RUN_SQL_BACKEND
A .env file in the working directory is loaded first, if present.";

/// Run a SQL query against the local SQL Server instance.
/// Provide the SQL inline, via a file, or from stdin.
#[derive(Parser, Debug)]
#[command(name = "run-sql")]
#[command(version, about, long_about = None, after_help = ENV_HELP)]
pub struct Cli {
    /// SQL to execute. Use '-' to read from stdin if no --file is provided.
    #[arg(value_name = "SQL")]
    pub sql: Option<String>,

    /// Path to a file containing the SQL to execute.
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Database host name or IP address [default: 127.0.0.1]
    #[arg(long, value_name = "HOST")]
    pub server: Option<String>,

    /// Database port [default: 1433 for mssql, 5432 for postgres]
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Database name to connect to [default: collection]
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Username for authentication [default: sa]
    #[arg(long, value_name = "NAME")]
    pub user: Option<String>,

    /// Password for authentication
    #[arg(long, value_name = "SECRET")]
    pub password: Option<String>,

    /// Database backend: mssql or postgres [default: mssql]
    #[arg(long, value_name = "BACKEND")]
    pub backend: Option<DatabaseBackend>,

    /// ODBC driver used for SQL Server [default: ODBC Driver 18 for SQL Server]
    #[arg(long, value_name = "DRIVER")]
    pub odbc_driver: Option<String>,

    /// Increase log verbosity on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Where the SQL text comes from.
    pub fn sql_source(&self) -> SqlSource {
        SqlSource::from_args(self.sql.as_deref(), self.file.as_deref())
    }

    /// Connection settings given explicitly as flags.
    pub fn connection_overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            backend: self.backend,
            server: self.server.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            odbc_driver: self.odbc_driver.clone(),
        }
    }

    /// Default log filter directive for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
