//! Archive endpoints: snapshot, listing, rename, delete

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::header,
    routing::{get, post},
    Form, Json, Router,
};
use lprs_common::db::{Archive, EventSummary};
use serde::{Deserialize, Serialize};

use super::parse_id;
use crate::archive::{self, DeleteReport};
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::roles::attach_display_images;
use crate::AppState;

/// Response of `POST /clean`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum CleanResponse {
    Created(Archive),
    /// Nothing to archive
    Empty { archived: i64 },
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// POST /clean
pub async fn clean(State(state): State<AppState>) -> ApiResult<Json<CleanResponse>> {
    let response = match archive::snapshot(&state.db).await? {
        Some(archive) => CleanResponse::Created(archive),
        None => CleanResponse::Empty { archived: 0 },
    };
    Ok(Json(response))
}

/// GET /api/archives
pub async fn list_archives(State(state): State<AppState>) -> ApiResult<Json<Vec<Archive>>> {
    Ok(Json(db::archives::list_archives(&state.db).await?))
}

/// GET /api/archives/:id
pub async fn get_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Archive>> {
    let id = parse_id(&id)?;
    Ok(Json(load_archive(&state, id).await?))
}

/// GET /api/archives/:id/events
///
/// Same shape as the current event listing, in ingestion order.
pub async fn list_archive_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<EventSummary>>> {
    let id = parse_id(&id)?;
    load_archive(&state, id).await?;

    let mut events = db::events::archived_events(&state.db, id).await?;
    attach_display_images(&state.db, &mut events).await?;
    Ok(Json(events))
}

/// POST /archive/:id/rename
///
/// Takes `name` from a JSON body or a urlencoded form.
pub async fn rename_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
    request: Request,
) -> ApiResult<Json<Archive>> {
    let id = parse_id(&id)?;
    let name = read_name(request).await?;

    archive::rename_archive(&state.db, id, &name).await?;
    Ok(Json(load_archive(&state, id).await?))
}

/// POST /archive/:id/delete
pub async fn delete_archive(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteReport>> {
    let id = parse_id(&id)?;
    let report = archive::delete_archive(&state.db, &state.store, id).await?;
    Ok(Json(report))
}

async fn load_archive(state: &AppState, id: i64) -> ApiResult<Archive> {
    db::archives::get_archive(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("archive {} not found", id)))
}

async fn read_name(request: Request) -> ApiResult<String> {
    let is_json = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().starts_with("application/json"))
        .unwrap_or(false);

    let body = if is_json {
        Json::<RenameRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
            .0
    } else {
        Form::<RenameRequest>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
            .0
    };

    Ok(body.name)
}

pub fn archive_routes() -> Router<AppState> {
    Router::new()
        .route("/clean", post(clean))
        .route("/api/archives", get(list_archives))
        .route("/api/archives/:id", get(get_archive))
        .route("/api/archives/:id/events", get(list_archive_events))
        .route("/archive/:id/rename", post(rename_archive))
        .route("/archive/:id/delete", post(delete_archive))
}
