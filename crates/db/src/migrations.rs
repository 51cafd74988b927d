use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies pending migrations and reports how many migrations the
/// schema ledger records afterwards.
pub async fn run_pending(pool: &DbPool) -> Result<u64, MigrateError> {
    MIGRATOR.run(pool).await?;
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations").fetch_one(pool).await?;
    Ok(applied as u64)
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::run_pending;
    use crate::connect;
    use crate::connection::test_support::memory_config;

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "unarchive_request",
        "request_approver",
        "idx_unarchive_request_status",
        "idx_unarchive_request_initiated_at",
        "idx_request_approver_request_id",
    ];

    #[tokio::test]
    async fn migrations_create_the_request_schema() {
        let pool = connect(&memory_config()).await.expect("connect");
        let applied = run_pending(&pool).await.expect("run migrations");
        assert!(applied >= 1, "at least the baseline migration should be recorded");

        for object in MANAGED_SCHEMA_OBJECTS {
            let count = sqlx::query("SELECT COUNT(*) AS count FROM sqlite_master WHERE name = ?")
                .bind(object)
                .fetch_one(&pool)
                .await
                .expect("query sqlite_master")
                .get::<i64, _>("count");
            assert_eq!(count, 1, "schema object `{object}` should exist");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect(&memory_config()).await.expect("connect");

        let first = run_pending(&pool).await.expect("first run");
        let second = run_pending(&pool).await.expect("second run");
        assert_eq!(first, second);
    }
}
