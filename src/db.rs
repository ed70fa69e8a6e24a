// src/db.rs - Database migrations and setup

use sqlx::SqlitePool;
use anyhow::Result;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(pool)
        .await?;

    // Credentials are read-only for the dashboard; rows come from the tracker itself
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            user_id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE CHECK(length(username) >= 1 AND length(username) <= 50),
            password TEXT NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS asset_summary (
            np_number TEXT PRIMARY KEY CHECK(length(np_number) > 0 AND length(np_number) <= 64),
            biopsy_type TEXT NOT NULL,
            start_time DATETIME NOT NULL,
            end_time DATETIME CHECK(end_time IS NULL OR end_time >= start_time),
            special_stain INTEGER NOT NULL DEFAULT 0 CHECK(special_stain IN (0, 1)),
            ihc INTEGER NOT NULL DEFAULT 0 CHECK(ihc IN (0, 1)),
            process_all INTEGER NOT NULL DEFAULT 0 CHECK(process_all IN (0, 1)),
            deeper INTEGER NOT NULL DEFAULT 0 CHECK(deeper IN (0, 1)),
            decal INTEGER NOT NULL DEFAULT 0 CHECK(decal IN (0, 1)),
            kept_for_fixation INTEGER NOT NULL DEFAULT 0 CHECK(kept_for_fixation IN (0, 1)),
            em INTEGER NOT NULL DEFAULT 0 CHECK(em IN (0, 1)),
            semithin INTEGER NOT NULL DEFAULT 0 CHECK(semithin IN (0, 1)),
            ehc INTEGER NOT NULL DEFAULT 0 CHECK(ehc IN (0, 1)),
            tat INTEGER CHECK(tat IS NULL OR tat >= 0),
            request_code TEXT NOT NULL DEFAULT '000000000'
        )
        "#,
    )
        .execute(pool)
        .await?;

    // Logged-out tokens, kept until they would have expired anyway
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS revoked_tokens (
            jti TEXT PRIMARY KEY,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
        .execute(pool)
        .await?;

    // ==================== CREATE INDEXES ====================

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_asset_start_time ON asset_summary(start_time)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_asset_end_time ON asset_summary(end_time)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_asset_tat ON asset_summary(tat)")
        .execute(pool).await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_revoked_tokens_expires ON revoked_tokens(expires_at)")
        .execute(pool).await?;

    log::info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
pub mod test_support {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Single-connection in-memory pool; every connection would otherwise get its own database.
    pub async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        super::run_migrations(&pool).await.unwrap();
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::memory_pool;

    #[actix_rt::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await;
        super::run_migrations(&pool).await.unwrap();

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(tables, vec!["asset_summary", "revoked_tokens", "users"]);
    }

    #[actix_rt::test]
    async fn test_end_before_start_is_rejected_by_schema() {
        let pool = memory_pool().await;
        let result = sqlx::query(
            "INSERT INTO asset_summary (np_number, biopsy_type, start_time, end_time) VALUES ('NP1/22', 'Tumor', '2022-01-02 00:00:00', '2022-01-01 00:00:00')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
