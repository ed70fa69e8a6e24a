// src/repositories/mod.rs
//! Storage access for asset records

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;

use crate::error::{ApiError, ApiResult};
use crate::models::{AssetRecord, PendingAssetRow, PendingAssetView};
use crate::query_builders::filters::ASSET_TABLE;
use crate::query_builders::{Aggregate, AggregateQueryBuilder, AssetField, FilterGroup};

/// Aggregation functions over the asset table.
///
/// Every method takes a predicate; an empty `FilterGroup` matches all rows.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Number of matching records, 0 when nothing matches.
    async fn count(&self, filter: &FilterGroup) -> ApiResult<i64>;

    /// Mean of a numeric column, exactly `0.0` when nothing matches.
    async fn mean(&self, field: AssetField, filter: &FilterGroup) -> ApiResult<f64>;

    /// Maximum of a numeric column, exactly `0` when nothing matches.
    async fn max(&self, field: AssetField, filter: &FilterGroup) -> ApiResult<i64>;

    /// One `(request_code, count)` pair per distinct code.
    async fn count_by_request_code(&self, filter: &FilterGroup) -> ApiResult<Vec<(String, i64)>>;

    /// Pending rows under `filter`, oldest first, with starts formatted relative to `now`.
    async fn find_pending(
        &self,
        filter: &FilterGroup,
        now: NaiveDateTime,
    ) -> ApiResult<Vec<PendingAssetView>>;

    async fn insert(&self, record: &AssetRecord) -> ApiResult<()>;
}

fn compile_error(e: String) -> ApiError {
    ApiError::InternalServerError(format!("Query construction failed: {}", e))
}

// ==================== SQLITE ====================

#[derive(Clone)]
pub struct SqliteAssetStore {
    pool: SqlitePool,
}

impl SqliteAssetStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AssetStore for SqliteAssetStore {
    async fn count(&self, filter: &FilterGroup) -> ApiResult<i64> {
        let mut qb = AggregateQueryBuilder::new(filter)
            .scalar(Aggregate::Count)
            .map_err(compile_error)?;
        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn mean(&self, field: AssetField, filter: &FilterGroup) -> ApiResult<f64> {
        let mut qb = AggregateQueryBuilder::new(filter)
            .scalar(Aggregate::Avg(field))
            .map_err(compile_error)?;
        let mean = qb.build_query_scalar::<Option<f64>>().fetch_one(&self.pool).await?;
        Ok(mean.unwrap_or(0.0))
    }

    async fn max(&self, field: AssetField, filter: &FilterGroup) -> ApiResult<i64> {
        let mut qb = AggregateQueryBuilder::new(filter)
            .scalar(Aggregate::Max(field))
            .map_err(compile_error)?;
        let max = qb.build_query_scalar::<Option<i64>>().fetch_one(&self.pool).await?;
        Ok(max.unwrap_or(0))
    }

    async fn count_by_request_code(&self, filter: &FilterGroup) -> ApiResult<Vec<(String, i64)>> {
        let mut qb = AggregateQueryBuilder::new(filter)
            .count_by(AssetField::RequestCode)
            .map_err(compile_error)?;
        let rows = qb.build_query_as::<(String, i64)>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn find_pending(
        &self,
        filter: &FilterGroup,
        now: NaiveDateTime,
    ) -> ApiResult<Vec<PendingAssetView>> {
        let mut qb = AggregateQueryBuilder::new(filter)
            .pending_rows()
            .map_err(compile_error)?;
        let rows = qb.build_query_as::<PendingAssetRow>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| PendingAssetView::from_row(row, now))
            .collect())
    }

    async fn insert(&self, record: &AssetRecord) -> ApiResult<()> {
        sqlx::query(&format!(
            r#"INSERT INTO {} (
                np_number, biopsy_type, start_time, end_time,
                special_stain, ihc, process_all, deeper, decal,
                kept_for_fixation, em, semithin, ehc, tat, request_code
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            ASSET_TABLE
        ))
        .bind(&record.np_number)
        .bind(&record.biopsy_type)
        .bind(record.start_time)
        .bind(record.end_time)
        .bind(record.special_stain)
        .bind(record.ihc)
        .bind(record.process_all)
        .bind(record.deeper)
        .bind(record.decal)
        .bind(record.kept_for_fixation)
        .bind(record.em)
        .bind(record.semithin)
        .bind(record.ehc)
        .bind(record.tat)
        .bind(&record.request_code)
        .execute(&self.pool)
        .await?;

        log::debug!("Stored asset {}", record.np_number);
        Ok(())
    }
}
