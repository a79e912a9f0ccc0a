use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use dus360::error::AppError;
use dus360::placement::{placement_router, PeriodId, ProgramCatalogImporter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogImportRequest {
    pub(crate) csv: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CatalogImportResponse {
    pub(crate) period_id: PeriodId,
    pub(crate) imported: usize,
}

pub(crate) fn with_placement_routes(state: &AppState) -> axum::Router {
    placement_router(state.placement.clone())
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/periods/:period_id/catalog",
            axum::routing::post(catalog_import_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Upserts catalog rows for a period from CSV text posted by an administrator. Rows not in the
/// upload stay as they are; an id already registered under another period is rejected with 409.
pub(crate) async fn catalog_import_endpoint(
    Extension(state): Extension<AppState>,
    Path(period_id): Path<String>,
    Json(payload): Json<CatalogImportRequest>,
) -> Result<(StatusCode, Json<CatalogImportResponse>), AppError> {
    let period_id = PeriodId(period_id);
    let reader = Cursor::new(payload.csv.into_bytes());
    let programs = ProgramCatalogImporter::from_reader(reader, &period_id)?;
    let imported = state.placement.refresh_catalog(programs)?;
    info!(period = %period_id.0, imported, "catalog refreshed over http");

    Ok((
        StatusCode::OK,
        Json(CatalogImportResponse {
            period_id,
            imported,
        }),
    ))
}
