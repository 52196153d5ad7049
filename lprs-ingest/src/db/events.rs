//! Event row persistence and read queries

use chrono::{DateTime, Utc};
use lprs_common::db::{Event, EventSummary};
use lprs_common::Result;
use sqlx::SqlitePool;

use crate::ingest::normalize::NormalizedEvent;

/// Columns shared by every listing query (no raw payload)
const SUMMARY_COLUMNS: &str = r#"
    id, car_id, plate_utf8, car_state, event_datetime, plate_country, plate_region,
    plate_confidence, geotag_lat, geotag_lon, vehicle_make, vehicle_model,
    vehicle_color, vehicle_type, camera_serial, json_filename, archive_id, created_at
"#;

/// Insert a normalized event and return its assigned id
pub async fn insert_event(
    pool: &SqlitePool,
    event: &NormalizedEvent,
    raw_json: &str,
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let vehicle = event.vehicle.clone().unwrap_or_default();
    let camera = event.camera.clone().unwrap_or_default();

    let result = sqlx::query(
        r#"
        INSERT INTO events (
            car_id, plate_utf8, car_state, sensor_provider_id, event_datetime,
            capture_timestamp, plate_country, plate_region, plate_region_code,
            plate_confidence, geotag_lat, geotag_lon, vehicle_make, vehicle_model,
            vehicle_color, vehicle_type, confidence_mmr, confidence_color,
            camera_serial, camera_ip, raw_json, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.car_id)
    .bind(&event.plate)
    .bind(&event.car_state)
    .bind(&event.sensor_provider_id)
    .bind(&event.event_datetime)
    .bind(&event.capture_timestamp)
    .bind(&event.plate_country)
    .bind(&event.plate_region)
    .bind(&event.plate_region_code)
    .bind(event.plate_confidence)
    .bind(event.geotag.map(|g| g.lat))
    .bind(event.geotag.map(|g| g.lon))
    .bind(vehicle.make)
    .bind(vehicle.model)
    .bind(vehicle.color)
    .bind(vehicle.vehicle_type)
    .bind(vehicle.confidence_mmr)
    .bind(vehicle.confidence_color)
    .bind(camera.serial_number)
    .bind(camera.ip_address)
    .bind(raw_json)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Record the on-disk payload name; safe to repeat
pub async fn set_json_filename(pool: &SqlitePool, event_id: i64, file_name: &str) -> Result<()> {
    sqlx::query("UPDATE events SET json_filename = ? WHERE id = ?")
        .bind(file_name)
        .bind(event_id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn get_event(pool: &SqlitePool, event_id: i64) -> Result<Option<Event>> {
    let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;

    Ok(event)
}

/// Number of events not yet assigned to an archive
pub async fn count_current_events(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE archive_id IS NULL")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Most recent current events, newest first
pub async fn recent_events(pool: &SqlitePool, limit: i64) -> Result<Vec<EventSummary>> {
    let sql = format!(
        "SELECT {} FROM events WHERE archive_id IS NULL ORDER BY id DESC LIMIT ?",
        SUMMARY_COLUMNS
    );
    let events = sqlx::query_as::<_, EventSummary>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(events)
}

/// Events of one archive in ingestion order
pub async fn archived_events(pool: &SqlitePool, archive_id: i64) -> Result<Vec<EventSummary>> {
    let sql = format!(
        "SELECT {} FROM events WHERE archive_id = ? ORDER BY id ASC",
        SUMMARY_COLUMNS
    );
    let events = sqlx::query_as::<_, EventSummary>(&sql)
        .bind(archive_id)
        .fetch_all(pool)
        .await?;

    Ok(events)
}

pub async fn event_in_archive(pool: &SqlitePool, event_id: i64, archive_id: i64) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM events WHERE id = ? AND archive_id = ?)",
    )
    .bind(event_id)
    .bind(archive_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
