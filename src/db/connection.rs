//! Database connection management using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

/// Initialize the analytics connection pool and probe it once.
///
/// The pool is owned by the caller and injected into the SQL client; there
/// is no process-wide pool.
pub async fn init_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").execute(&pool).await?;
    info!(max_connections, "Analytics database pool ready");

    Ok(pool)
}
