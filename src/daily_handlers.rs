// src/daily_handlers.rs
use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::query_builders::CountPeriod;
use crate::stats::{self, local_now};
use crate::AppState;

/// GET /count/daily/{days}
pub async fn get_daily_counts(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let days = path.into_inner();
    let series = stats::daily_counts(
        app_state.assets.as_ref(),
        local_now(),
        days,
        app_state.config.reporting.max_daily_days,
    )
    .await?;

    Ok(HttpResponse::Ok().json(series))
}

/// GET /count/{time}
pub async fn get_period_count(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let period = CountPeriod::parse(&path.into_inner())?;
    let count = stats::period_count(
        app_state.assets.as_ref(),
        local_now(),
        period,
        app_state.config.reporting.year_to_date_anchor,
    )
    .await?;

    Ok(HttpResponse::Ok().json(count))
}
