//! Compare flag endpoints for archived events

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use lprs_common::db::CompareResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::parse_id;
use crate::compare::{self, FieldAccuracy};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub event_id: i64,
    pub field: String,
    pub incorrect: bool,
}

#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub archive_id: i64,
    pub results: Vec<CompareResult>,
    pub statistics: Vec<FieldAccuracy>,
}

/// POST /archive/:id/compare/toggle
pub async fn toggle_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let archive_id = parse_id(&id)?;
    let Json(toggle) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    compare::set_result(
        &state.db,
        archive_id,
        toggle.event_id,
        &toggle.field,
        toggle.incorrect,
    )
    .await?;

    Ok(Json(json!({ "ok": true })))
}

/// GET /api/archives/:id/compare
///
/// All flags of the archive plus per-field accuracy. Unflagged values
/// count as correct.
pub async fn compare_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CompareReport>> {
    let archive_id = parse_id(&id)?;
    if db::archives::get_archive(&state.db, archive_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("archive {} not found", archive_id)));
    }

    let events = db::events::archived_events(&state.db, archive_id).await?;
    let results = db::compare::compare_results(&state.db, archive_id).await?;
    let lookup = compare::to_lookup(&results);
    let statistics = compare::accuracy_summary(&events, &lookup);

    Ok(Json(CompareReport {
        archive_id,
        results,
        statistics,
    }))
}

pub fn compare_routes() -> Router<AppState> {
    Router::new()
        .route("/archive/:id/compare/toggle", post(toggle_result))
        .route("/api/archives/:id/compare", get(compare_report))
}
