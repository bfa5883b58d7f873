//! Boot-time schema synchronization
//!
//! Checks connectivity, then applies pending migrations from an optional
//! directory of `<version>_<description>.sql` files.

use std::path::Path;

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("schema migration failed: {0}")]
    Migrate(#[from] MigrateError),
}

/// Outcome of a successful sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Migrations known to the migrator (applied now or earlier)
    pub migrations: usize,
}

/// Resolve a migration directory without touching the database.
pub async fn load_migrator(dir: &Path) -> Result<Migrator, MigrateError> {
    Migrator::new(dir).await
}

/// Verify the connection and bring the schema up to date.
///
/// The directory is resolved first, so a bad path fails before any
/// connection attempt.
pub async fn synchronize(pool: &PgPool, migrations_dir: Option<&Path>) -> Result<SyncReport, DbError> {
    let migrator = match migrations_dir {
        Some(dir) => Some(load_migrator(dir).await?),
        None => None,
    };

    sqlx::query("SELECT 1").execute(pool).await?;

    let Some(migrator) = migrator else {
        tracing::debug!("no migrations directory configured");
        return Ok(SyncReport { migrations: 0 });
    };

    migrator.run(pool).await?;
    Ok(SyncReport {
        migrations: migrator.iter().count(),
    })
}
