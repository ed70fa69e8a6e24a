// src/pending_handlers.rs
use actix_web::{web, HttpResponse};
use std::sync::Arc;

use crate::error::ApiResult;
use crate::params::parse_csv_list;
use crate::query_builders::{Origin, Parity};
use crate::stats::{self, local_now};
use crate::AppState;

// ==================== LISTS ====================

async fn list(
    app_state: &AppState,
    origin: Option<Origin>,
    parity: Option<Parity>,
) -> ApiResult<HttpResponse> {
    let views = stats::pending_list(
        app_state.assets.as_ref(),
        local_now(),
        origin,
        parity,
        app_state.config.reporting.pending_window_days,
    )
    .await?;

    Ok(HttpResponse::Ok().json(views))
}

pub async fn get_pending(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    list(&app_state, None, None).await
}

pub async fn get_pending_by_origin(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let origin = Origin::parse(&path.into_inner())?;
    list(&app_state, Some(origin), None).await
}

pub async fn get_pending_by_origin_parity(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (origin, parity) = path.into_inner();
    let origin = Origin::parse(&origin)?;
    let parity = Parity::parse(&parity)?;
    list(&app_state, Some(origin), Some(parity)).await
}

/// GET /pending/count: every pending asset, no age window.
pub async fn get_pending_count(app_state: web::Data<Arc<AppState>>) -> ApiResult<HttpResponse> {
    let count = stats::pending_total(app_state.assets.as_ref()).await?;
    Ok(HttpResponse::Ok().json(count))
}

// ==================== CHARTS ====================

async fn chart(
    app_state: &AppState,
    start_days: &str,
    end_days: &str,
    origin: Option<(Origin, Option<Parity>)>,
) -> ApiResult<HttpResponse> {
    let starts = parse_csv_list("startDays", start_days)?;
    let ends = parse_csv_list("endDays", end_days)?;

    let counts = stats::pending_breakout(
        app_state.assets.as_ref(),
        local_now(),
        &starts,
        &ends,
        origin,
    )
    .await?;

    Ok(HttpResponse::Ok().json(counts))
}

/// GET /pending/chart/{startDays}/{endDays}, both comma-separated lists
pub async fn get_pending_chart(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let (start_days, end_days) = path.into_inner();
    chart(&app_state, &start_days, &end_days, None).await
}

pub async fn get_pending_chart_by_origin(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String, String)>,
) -> ApiResult<HttpResponse> {
    let (origin, start_days, end_days) = path.into_inner();
    let origin = Origin::parse(&origin)?;
    chart(&app_state, &start_days, &end_days, Some((origin, None))).await
}

pub async fn get_pending_chart_by_origin_parity(
    app_state: web::Data<Arc<AppState>>,
    path: web::Path<(String, String, String, String)>,
) -> ApiResult<HttpResponse> {
    let (origin, parity, start_days, end_days) = path.into_inner();
    let origin = Origin::parse(&origin)?;
    let parity = Parity::parse(&parity)?;
    chart(&app_state, &start_days, &end_days, Some((origin, Some(parity)))).await
}
