// src/token_revocation.rs - Logged-out token tracking

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::time;

use crate::error::ApiResult;

const PURGE_INTERVAL_SECS: u64 = 3600;

/// Marks a token id as revoked until its own expiry (unix seconds).
pub async fn revoke(pool: &SqlitePool, jti: &str, expires_at: i64) -> ApiResult<()> {
    sqlx::query("INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?, ?)")
        .bind(jti)
        .bind(expires_at)
        .execute(pool)
        .await?;

    log::debug!("Revoked token {}", jti);
    Ok(())
}

pub async fn is_revoked(pool: &SqlitePool, jti: &str) -> ApiResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM revoked_tokens WHERE jti = ?")
        .bind(jti)
        .fetch_optional(pool)
        .await?;
    Ok(found.is_some())
}

/// Drops entries whose token would be rejected as expired anyway.
pub async fn purge_expired(pool: &SqlitePool, now: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to purge revoked tokens")?;
    Ok(result.rows_affected())
}

/// Runs `purge_expired` once an hour for the lifetime of the process.
pub async fn start_purge_task(pool: SqlitePool) {
    log::info!("Revoked token purge task started (interval: {}s)", PURGE_INTERVAL_SECS);

    let mut interval = time::interval(Duration::from_secs(PURGE_INTERVAL_SECS));

    loop {
        interval.tick().await;

        match purge_expired(&pool, Utc::now().timestamp()).await {
            Ok(0) => {}
            Ok(n) => log::info!("Purged {} expired revocation entries", n),
            Err(e) => log::error!("{:#}", e),
        }
    }
}
