//! Sensor ingestion endpoint

use axum::{
    extract::{Request, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::error::ApiResult;
use crate::AppState;

/// Success body returned to the sensor
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub plate: Option<String>,
    /// Images with a stored database row
    pub images: usize,
}

/// POST /api
///
/// Accepts a JSON body or a multipart upload (JSON part or `json`/`data`
/// field plus image files). Embedded `ImageArray` images are stored too.
pub async fn ingest_event(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<Json<IngestResponse>> {
    let outcome = state.ingestor.ingest_request(request).await?;

    Ok(Json(IngestResponse {
        success: true,
        message: "event recorded".to_string(),
        id: outcome.event_id,
        plate: outcome.plate,
        images: outcome.images_stored,
    }))
}

pub fn ingest_routes() -> Router<AppState> {
    Router::new().route("/api", post(ingest_event))
}
