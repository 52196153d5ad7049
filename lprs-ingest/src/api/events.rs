//! Event, image and payload reads

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use lprs_common::db::{Event, EventSummary, ImageInfo};
use serde_json::Value;
use tracing::debug;

use super::parse_id;
use crate::db;
use crate::error::{ApiError, ApiResult};
use crate::roles::attach_display_images;
use crate::sanitize::sanitize_filename;
use crate::store::FileKind;
use crate::AppState;

/// Stand-in for embedded image data in the payload view
pub const OMITTED_IMAGE_DATA: &str = "[base64 data omitted]";

const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";
const OCTET_STREAM: &str = "application/octet-stream";

/// GET /api/events
///
/// Current events, newest first, with their display image ids.
pub async fn list_current_events(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EventSummary>>> {
    let mut events = db::events::recent_events(&state.db, state.recent_limit).await?;
    attach_display_images(&state.db, &mut events).await?;
    Ok(Json(events))
}

/// GET /api/events/:id
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Event>> {
    let id = parse_id(&id)?;
    Ok(Json(load_event(&state, id).await?))
}

/// GET /api/events/:id/images
///
/// Metadata only; bytes come from `/image/:id`.
pub async fn list_event_images(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ImageInfo>>> {
    let id = parse_id(&id)?;
    load_event(&state, id).await?;
    let images = db::images::images_for_event(&state.db, id).await?;
    Ok(Json(images))
}

/// GET /image/:id
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let data = db::images::get_image_data(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("image {} not found", id)))?;

    let content_type = sniff_content_type(&data);
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL),
        ],
        data,
    )
        .into_response())
}

/// GET /image/:id/download
pub async fn download_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let info = db::images::get_image_info(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("image {} not found", id)))?;
    let data = db::images::get_image_data(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("image {} not found", id)))?;

    let file_name = download_name(info.filename.as_deref())
        .unwrap_or_else(|| format!("image_{}.jpg", id));

    Ok((
        [
            (header::CONTENT_TYPE, sniff_content_type(&data).to_string()),
            (header::CONTENT_DISPOSITION, attachment(&file_name)),
        ],
        data,
    )
        .into_response())
}

/// GET /json/:id
///
/// Pretty-printed payload with embedded image data elided.
pub async fn view_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let event = load_event(&state, id).await?;
    let raw = event.raw_json.unwrap_or_default();

    let body = match serde_json::from_str::<Value>(&raw) {
        Ok(mut value) => {
            elide_image_data(&mut value);
            serde_json::to_string_pretty(&value)
                .map_err(|e| ApiError::Internal(format!("failed to format JSON: {}", e)))?
        }
        Err(e) => {
            debug!(event_id = id, error = %e, "stored payload is not valid JSON, returning as is");
            raw
        }
    };

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// GET /json/:id/download
///
/// The on-disk payload file, or the stored payload text when the file is
/// missing or unreadable.
pub async fn download_json(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let id = parse_id(&id)?;
    let event = load_event(&state, id).await?;

    let from_disk = match event.json_filename.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => match state.store.read(FileKind::Json, name).await {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(event_id = id, file = name, error = %e, "JSON file unreadable, using stored payload");
                None
            }
        },
        None => None,
    };
    let data = from_disk.unwrap_or_else(|| event.raw_json.unwrap_or_default().into_bytes());

    let file_name = event
        .json_filename
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("event_{}.json", id));

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&file_name)),
        ],
        data,
    )
        .into_response())
}

async fn load_event(state: &AppState, id: i64) -> ApiResult<Event> {
    db::events::get_event(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("event {} not found", id)))
}

/// MIME type from magic bytes
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    infer::get(data)
        .map(|kind| kind.mime_type())
        .unwrap_or(OCTET_STREAM)
}

/// Base name of a client-supplied file name, safe for a header
fn download_name(original: Option<&str>) -> Option<String> {
    let base = std::path::Path::new(original?).file_name()?.to_str()?;
    let name = sanitize_filename(base);
    (!name.is_empty()).then_some(name)
}

fn attachment(file_name: &str) -> String {
    format!("attachment; filename=\"{}\"", file_name)
}

/// Replace every `ImageArray[].BinaryImage` with a placeholder
pub fn elide_image_data(payload: &mut Value) {
    let Some(entries) = payload.get_mut("ImageArray").and_then(Value::as_array_mut) else {
        return;
    };

    for entry in entries.iter_mut().filter_map(Value::as_object_mut) {
        if let Some(data) = entry.get_mut("BinaryImage") {
            *data = Value::String(OMITTED_IMAGE_DATA.to_string());
        }
    }
}

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/api/events", get(list_current_events))
        .route("/api/events/:id", get(get_event))
        .route("/api/events/:id/images", get(list_event_images))
        .route("/image/:id", get(get_image))
        .route("/image/:id/download", get(download_image))
        .route("/json/:id", get(view_json))
        .route("/json/:id/download", get(download_json))
}
