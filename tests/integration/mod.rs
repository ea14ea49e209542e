//! Integration tests for run-sql.

pub mod batch_test;
pub mod connection_test;
