//! Database row models

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Full event row, including the verbatim payload
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Event {
    pub id: i64,
    pub car_id: String,
    pub plate_utf8: Option<String>,
    pub car_state: Option<String>,
    pub sensor_provider_id: Option<String>,
    pub event_datetime: Option<String>,
    pub capture_timestamp: Option<String>,
    pub plate_country: Option<String>,
    pub plate_region: Option<String>,
    pub plate_region_code: Option<String>,
    pub plate_confidence: Option<f64>,
    pub geotag_lat: Option<f64>,
    pub geotag_lon: Option<f64>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_color: Option<String>,
    pub vehicle_type: Option<String>,
    pub confidence_mmr: Option<f64>,
    pub confidence_color: Option<f64>,
    pub camera_serial: Option<String>,
    pub camera_ip: Option<String>,
    pub raw_json: Option<String>,
    pub json_filename: Option<String>,
    pub archive_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Event row as shown in listings: no payload, plus the two display images
///
/// `plate_image_id` / `vehicle_image_id` are filled in after the query by
/// the image role selection policy.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EventSummary {
    pub id: i64,
    pub car_id: String,
    pub plate_utf8: Option<String>,
    pub car_state: Option<String>,
    pub event_datetime: Option<String>,
    pub plate_country: Option<String>,
    pub plate_region: Option<String>,
    pub plate_confidence: Option<f64>,
    pub geotag_lat: Option<f64>,
    pub geotag_lon: Option<f64>,
    pub vehicle_make: Option<String>,
    pub vehicle_model: Option<String>,
    pub vehicle_color: Option<String>,
    pub vehicle_type: Option<String>,
    pub camera_serial: Option<String>,
    pub json_filename: Option<String>,
    pub archive_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub plate_image_id: Option<i64>,
    #[sqlx(skip)]
    pub vehicle_image_id: Option<i64>,
}

/// Image metadata (the binary payload is read separately)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ImageInfo {
    pub id: i64,
    pub event_id: i64,
    pub image_type: Option<String>,
    pub filename: Option<String>,
    pub disk_filename: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Archive {
    pub id: i64,
    pub name: Option<String>,
    pub event_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CompareResult {
    pub id: i64,
    pub archive_id: i64,
    pub event_id: i64,
    pub field: String,
    pub is_incorrect: bool,
    pub updated_at: DateTime<Utc>,
}
