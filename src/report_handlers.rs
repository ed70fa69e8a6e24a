// src/report_handlers.rs
//! Summary, sample-type, TAT and request breakdowns

use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::params::{parse_csv_list, parse_date, DateRangeQuery};
use crate::query_builders::{BiopsyType, SummaryStat};
use crate::stats::{self, local_now, DateWindow};
use crate::AppState;

/// GET /summary/{stat}
pub async fn get_summary(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let stat = SummaryStat::parse(&path.into_inner())?;
    let summary = stats::summarize(
        app_state.assets.as_ref(),
        local_now(),
        stat,
        app_state.config.reporting.summary_window_days,
    )
    .await?;

    Ok(HttpResponse::Ok().json(summary))
}

/// GET /cases/{startTime}/{endTime}
pub async fn get_cases_by_sample_type(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (start, end) = path.into_inner();
    let window = DateWindow::new(parse_date("startTime", &start)?, parse_date("endTime", &end)?)?;

    let counts = stats::sample_type_breakout(app_state.assets.as_ref(), window).await?;
    Ok(HttpResponse::Ok().json(counts))
}

/// GET /tat/{sampleType}/{startValues}/{endValues}
pub async fn get_tat_breakout(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String, String)>,
    query: web::Query<DateRangeQuery>,
) -> ApiResult<HttpResponse> {
    let (sample_type, starts, ends) = path.into_inner();
    let biopsy = BiopsyType::parse(&sample_type)?;
    let lows = parse_csv_list("startValues", &starts)?;
    let highs = parse_csv_list("endValues", &ends)?;

    let counts = stats::tat_breakout(
        app_state.assets.as_ref(),
        biopsy,
        &lows,
        &highs,
        query.window()?,
    )
    .await?;

    Ok(HttpResponse::Ok().json(counts))
}

/// GET /requests/{sampleType}/{tatStart}/{tatEnd}
pub async fn get_request_breakout(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, i64, i64)>,
    query: web::Query<DateRangeQuery>,
) -> ApiResult<HttpResponse> {
    let (sample_type, tat_start, tat_end) = path.into_inner();
    let biopsy = BiopsyType::parse(&sample_type)?;

    let counts = stats::request_breakout(
        app_state.assets.as_ref(),
        biopsy,
        tat_start,
        tat_end,
        query.window()?,
    )
    .await?;

    Ok(HttpResponse::Ok().json(counts))
}
