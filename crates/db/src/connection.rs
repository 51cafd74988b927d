use std::time::Duration;

use recall_core::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Opens the request store's pool from the validated database section
/// of the app config. Every connection comes up with foreign keys on,
/// WAL journaling, and a busy timeout so concurrent deciders queue on
/// the write lock instead of failing fast.
pub async fn connect(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(database.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(database.timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&database.url)
        .await
}

#[cfg(test)]
pub(crate) mod test_support {
    use recall_core::config::DatabaseConfig;

    /// Single-connection in-memory database; a `sqlite::memory:` pool
    /// gives every connection its own database, so tests must not
    /// exceed one.
    pub fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            timeout_secs: 30,
        }
    }
}
