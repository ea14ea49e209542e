//! Connection configuration for run-sql.
//!
//! Every connection setting is resolved once at startup with the precedence
//! command-line flag > environment variable > built-in default.

use crate::db::DatabaseBackend;
use crate::error::{Result, RunSqlError};

/// Environment variable naming the database host.
pub const ENV_HOST: &str = "SQLSERVER_HOST";
/// Environment variable naming the database port.
pub const ENV_PORT: &str = "SQLSERVER_PORT";
/// Environment variable naming the database.
pub const ENV_DATABASE: &str = "SQLSERVER_DATABASE";
/// Environment variable naming the login user.
pub const ENV_USER: &str = "SQLSERVER_USER";
/// Environment variable holding the login password.
pub const ENV_PASSWORD: &str = "SQLSERVER_PASSWORD";
/// Environment variable selecting the backend.
pub const ENV_BACKEND: &str = "RUN_SQL_BACKEND";
/// Environment variable naming the ODBC driver used for SQL Server.
pub const ENV_ODBC_DRIVER: &str = "SQLSERVER_ODBC_DRIVER";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_DATABASE: &str = "collection";
const DEFAULT_USER: &str = "sa";
const DEFAULT_PASSWORD: &str = "YourNewStrong!Passw0rd";
const DEFAULT_ODBC_DRIVER: &str = "ODBC Driver 18 for SQL Server";

/// Connection settings given explicitly on the command line.
///
/// `None` means the flag was not passed and the environment or built-in
/// default applies.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOverrides {
    pub backend: Option<DatabaseBackend>,
    pub server: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub odbc_driver: Option<String>,
}

/// Fully resolved database connection configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Which driver to connect with.
    pub backend: DatabaseBackend,

    /// Database host name or IP address.
    pub server: String,

    /// Database port.
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Login user.
    pub user: String,

    /// Login password.
    pub password: String,

    /// Registered ODBC driver name, used by the SQL Server backend.
    pub odbc_driver: String,
}

impl ConnectionConfig {
    /// Resolves the configuration against the process environment.
    pub fn resolve(flags: &ConnectionOverrides) -> Result<Self> {
        Self::resolve_with(flags, |key| std::env::var(key).ok())
    }

    /// Resolves the configuration using `env` to look up environment variables.
    ///
    /// Variables that are set but empty are treated as unset.
    pub fn resolve_with<F>(flags: &ConnectionOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let backend = match flags.backend {
            Some(backend) => backend,
            None => match env(ENV_BACKEND) {
                Some(name) => DatabaseBackend::parse(&name).ok_or_else(|| {
                    RunSqlError::config(format!(
                        "Unknown backend '{name}' in {ENV_BACKEND}. Expected: mssql or postgres"
                    ))
                })?,
                None => DatabaseBackend::default(),
            },
        };

        let port = match flags.port {
            Some(port) => port,
            None => match env(ENV_PORT) {
                Some(raw) => raw.trim().parse::<u16>().map_err(|_| {
                    RunSqlError::config(format!("Invalid port '{raw}' in {ENV_PORT}"))
                })?,
                None => backend.default_port(),
            },
        };

        let pick = |flag: &Option<String>, key: &str, default: &str| {
            flag.clone()
                .or_else(|| env(key))
                .unwrap_or_else(|| default.to_string())
        };

        Ok(Self {
            backend,
            server: pick(&flags.server, ENV_HOST, DEFAULT_HOST),
            port,
            database: pick(&flags.database, ENV_DATABASE, DEFAULT_DATABASE),
            user: pick(&flags.user, ENV_USER, DEFAULT_USER),
            password: pick(&flags.password, ENV_PASSWORD, DEFAULT_PASSWORD),
            odbc_driver: pick(&flags.odbc_driver, ENV_ODBC_DRIVER, DEFAULT_ODBC_DRIVER),
        })
    }

    /// Returns a display-safe string (no password) for log output.
    pub fn display_string(&self) -> String {
        format!(
            "{}@{}:{}/{} ({})",
            self.user,
            self.server,
            self.port,
            self.database,
            self.backend.as_str()
        )
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("backend", &self.backend)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .field("odbc_driver", &self.odbc_driver)
            .finish()
    }
}
