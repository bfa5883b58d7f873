//! Database connection pool management
//!
//! Uses a lazily connecting sqlx PgPool so the gateway can build its state
//! before the database answers.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;

/// Create a PostgreSQL connection pool.
///
/// No connection is opened here; the first query (normally the boot-time
/// [`synchronize`](super::synchronize)) does that.
///
/// # Errors
///
/// Returns an error if the connection URL cannot be parsed.
pub fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_lazy(&config.url)
}
