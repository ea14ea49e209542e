//! End-to-end batch tests over the mock backend.
//!
//! Covers rendering, session release and the usage/execution error paths.

use clap::Parser;
use pretty_assertions::assert_eq;
use run_sql::cli::Cli;
use run_sql::config::{ConnectionConfig, ConnectionOverrides, ENV_PORT};
use run_sql::db::{MockConnector, ResultSet, StatementOutcome, Value};
use run_sql::error::RunSqlError;
use run_sql::runner::{run, run_sql, NO_RESULTS_MESSAGE};
use run_sql::sql_source::SqlSource;
use std::io::{Cursor, Write};

fn config() -> ConnectionConfig {
    ConnectionConfig::resolve_with(&ConnectionOverrides::default(), |_| None).unwrap()
}

fn broken_port_env(key: &str) -> Option<String> {
    (key == ENV_PORT).then(|| "not-a-port".to_string())
}

fn databases() -> StatementOutcome {
    StatementOutcome::Rows(ResultSet::with_rows(
        vec!["name".to_string(), "database_id".to_string()],
        vec![
            vec![Value::from("master"), Value::Int(1)],
            vec![Value::from("collection"), Value::Int(5)],
        ],
    ))
}

#[tokio::test]
async fn test_mixed_batch_output() {
    let connector = MockConnector::new(vec![databases(), StatementOutcome::Affected(Some(3))]);
    let mut out = Vec::new();

    let summary = run_sql(
        "SELECT name, database_id FROM sys.databases; UPDATE t SET x = 1",
        &config(),
        &connector,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Result set 1:\n\
         name       | database_id\n\
         -----------+------------\n\
         master     | 1          \n\
         collection | 5          \n\
         (2 rows)\n\
         \n\
         Statement 2 affected 3 row(s).\n"
    );
    assert_eq!(summary.result_sets, 1);
    assert_eq!(summary.affected, 3);
    assert_eq!(connector.close_calls(), 1);
}

#[tokio::test]
async fn test_schema_only_batch() {
    let connector = MockConnector::new(vec![StatementOutcome::Affected(None)]);
    let mut out = Vec::new();

    run_sql("CREATE TABLE t (id int)", &config(), &connector, &mut out)
        .await
        .unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        format!("{NO_RESULTS_MESSAGE}\n")
    );
}

#[tokio::test]
async fn test_blank_sql_never_connects() {
    let connector = MockConnector::new(vec![databases()]);
    let mut out = Vec::new();

    let err = run_sql("  \n\t ", &config(), &connector, &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, RunSqlError::Usage));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(connector.connect_calls(), 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_empty_sql_file_never_connects() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "   ").unwrap();
    let sql = SqlSource::File(file.path().to_path_buf())
        .read()
        .await
        .unwrap();

    let connector = MockConnector::new(vec![]);
    let err = run_sql(&sql, &config(), &connector, Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RunSqlError::Usage));
    assert_eq!(connector.connect_calls(), 0);
}

#[tokio::test]
async fn test_sql_is_passed_through() {
    let connector = MockConnector::new(vec![]);
    let sql = "SELECT 1;\nSELECT 2;";

    run_sql(sql, &config(), &connector, Vec::new()).await.unwrap();

    assert_eq!(connector.executed(), vec![sql.to_string()]);
    assert_eq!(connector.last_config().unwrap(), config());
}

#[tokio::test]
async fn test_connection_failure() {
    let connector = MockConnector::failing_connect("Login failed for user 'sa'.");

    let err = run_sql("SELECT 1", &config(), &connector, Vec::new())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to connect to SQL Server: Login failed for user 'sa'."
    );
    assert_eq!(err.exit_code(), 1);
    assert_eq!(connector.close_calls(), 0);
}

#[tokio::test]
async fn test_execution_failure_still_closes() {
    let connector = MockConnector::failing_execute("Incorrect syntax near 'SELEC'.");
    let mut out = Vec::new();

    let err = run_sql("SELEC 1", &config(), &connector, &mut out)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Failed to execute SQL: Incorrect syntax near 'SELEC'."
    );
    assert_eq!(connector.close_calls(), 1);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_iteration_failure_keeps_earlier_output() {
    let connector = MockConnector::failing_mid_batch(
        vec![StatementOutcome::Affected(Some(1))],
        "Transaction was deadlocked",
    );
    let mut out = Vec::new();

    let err = run_sql("UPDATE a; UPDATE b", &config(), &connector, &mut out)
        .await
        .unwrap_err();

    assert!(matches!(err, RunSqlError::Execution(_)));
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Statement 1 affected 1 row(s).\n"
    );
    assert_eq!(connector.close_calls(), 1);
}

#[tokio::test]
async fn test_run_reads_stdin_and_renders() {
    let cli = Cli::parse_from(["run-sql", "-"]);
    let connector = MockConnector::new(vec![databases()]);
    let mut out = Vec::new();

    let summary = run(
        &cli,
        Cursor::new("\n  SELECT name, database_id FROM sys.databases\n"),
        |_| None,
        &connector,
        &mut out,
    )
    .await
    .unwrap();

    assert_eq!(
        connector.executed(),
        vec!["SELECT name, database_id FROM sys.databases".to_string()]
    );
    assert_eq!(summary.result_sets, 1);
    assert!(String::from_utf8(out).unwrap().starts_with("Result set 1:\n"));
    assert_eq!(connector.close_calls(), 1);
}

#[tokio::test]
async fn test_missing_sql_is_reported_before_bad_config() {
    let cli = Cli::parse_from(["run-sql"]);
    let connector = MockConnector::new(vec![]);

    let err = run(
        &cli,
        Cursor::new("   \n"),
        broken_port_env,
        &connector,
        Vec::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunSqlError::Usage));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(connector.connect_calls(), 0);
}

#[tokio::test]
async fn test_bad_config_is_reported_once_sql_is_present() {
    let cli = Cli::parse_from(["run-sql", "SELECT 1"]);
    let connector = MockConnector::new(vec![]);

    let err = run(
        &cli,
        std::io::empty(),
        broken_port_env,
        &connector,
        Vec::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, RunSqlError::Config(_)));
    assert!(err.to_string().contains("not-a-port"));
    assert_eq!(connector.connect_calls(), 0);
}
