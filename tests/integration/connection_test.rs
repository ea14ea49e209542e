//! Connection integration tests.
//!
//! Exercise the real drivers. SQL Server tests need RUN_SQL_TEST_MSSQL set
//! (connection settings come from the usual SQLSERVER_* variables);
//! PostgreSQL tests need DATABASE_URL.

use run_sql::config::{ConnectionConfig, ConnectionOverrides};
use run_sql::db::{DatabaseBackend, DriverConnector};
use run_sql::error::RunSqlError;
use run_sql::runner::run_sql;

fn mssql_config() -> Option<ConnectionConfig> {
    std::env::var("RUN_SQL_TEST_MSSQL").ok()?;
    ConnectionConfig::resolve(&ConnectionOverrides::default()).ok()
}

#[tokio::test]
async fn test_mssql_multiple_result_sets() {
    let Some(config) = mssql_config() else {
        eprintln!("Skipping test: RUN_SQL_TEST_MSSQL not set");
        return;
    };

    let mut out = Vec::new();
    let summary = run_sql(
        "SELECT 1 AS a; SELECT 'x' AS b, NULL AS c",
        &config,
        &DriverConnector,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(summary.result_sets, 2);
    let output = String::from_utf8(out).unwrap();
    assert!(output.starts_with("Result set 1:\n"));
    assert!(output.contains("\n\nResult set 2:\nb | c\n--+--\nx |  \n(1 row)\n"));
}

#[tokio::test]
async fn test_mssql_statement_then_query() {
    let Some(config) = mssql_config() else {
        eprintln!("Skipping test: RUN_SQL_TEST_MSSQL not set");
        return;
    };

    let mut out = Vec::new();
    run_sql(
        "SELECT v INTO #run_sql_nums FROM (VALUES (1), (2), (3)) AS x(v); \
         SELECT COUNT(*) AS n FROM #run_sql_nums",
        &config,
        &DriverConnector,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Statement 1 affected 3 row(s).\n\nResult set 2:\nn\n-\n3\n(1 row)\n"
    );
}

#[tokio::test]
async fn test_mssql_execution_error() {
    let Some(config) = mssql_config() else {
        eprintln!("Skipping test: RUN_SQL_TEST_MSSQL not set");
        return;
    };

    let err = run_sql(
        "SELECT * FROM run_sql_missing_table",
        &config,
        &DriverConnector,
        Vec::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunSqlError::Execution(_)));
    assert!(err.to_string().contains("run_sql_missing_table"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_connect_with_invalid_host() {
    let flags = ConnectionOverrides {
        server: Some("invalid.host.that.does.not.exist.local".to_string()),
        ..Default::default()
    };
    let config = ConnectionConfig::resolve_with(&flags, |_| None).unwrap();

    let err = run_sql("SELECT 1", &config, &DriverConnector, Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunSqlError::Connection { .. }));
    assert!(err.to_string().starts_with("Failed to connect to SQL Server"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_postgres_connect_with_invalid_port() {
    let flags = ConnectionOverrides {
        backend: Some(DatabaseBackend::Postgres),
        server: Some("127.0.0.1".to_string()),
        port: Some(1),
        ..Default::default()
    };
    let config = ConnectionConfig::resolve_with(&flags, |_| None).unwrap();

    let err = run_sql("SELECT 1", &config, &DriverConnector, Vec::new())
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("Failed to connect to PostgreSQL"));
}
