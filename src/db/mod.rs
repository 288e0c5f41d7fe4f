//! Database module for the PostgreSQL analytics connection
//!
//! This module provides the connection pool and the raw-SQL client the query
//! executor runs validated statements through.

pub mod connection;
pub mod sql_client;

pub use connection::init_pool;
pub use sql_client::{PgSqlClient, SqlClient};
