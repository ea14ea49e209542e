//! run-sql - run ad-hoc SQL against SQL Server or PostgreSQL.
//!
//! This library exposes the core modules for use by the binary and the
//! integration tests.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod runner;
pub mod signal;
pub mod sql_source;
pub mod table;
