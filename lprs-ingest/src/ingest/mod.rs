//! Ingestion coordinator
//!
//! One incoming report is one unit of work, applied in this order:
//! 1. parse + normalize the payload, collect uploaded and embedded images
//! 2. insert the event row (its id names every file that follows)
//! 3. write the payload to `json/`, then backfill `json_filename`
//! 4. per image, in order: insert the row, write `images/{id}_...`,
//!    then backfill `disk_filename`
//!
//! Only step 1 and the event insert can fail the request. Disk writes,
//! backfills and single image inserts are best-effort: they are logged and
//! reduce the reported counts. The database row is the copy of record;
//! an interrupted request leaves valid rows with NULL disk names.
//!
//! Retrying a payload creates a new event; sensors send no idempotency key.

pub mod extract;
pub mod normalize;

use axum::body::Bytes;
use axum::extract::Request;
use chrono::{DateTime, Utc};
use lprs_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::db;
use crate::sanitize::{plate_stem, sanitize_filename};
use crate::store::{DataStore, FileKind};
use extract::{ExtractedImage, ImageOrigin, RequestParts};
use normalize::NormalizedEvent;

/// Request-scoped result of one ingestion
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub event_id: i64,
    pub plate: Option<String>,
    pub car_id: String,
    /// Images found in the request
    pub images_extracted: usize,
    /// Images with a database row (the count reported to the sensor)
    pub images_stored: usize,
    /// Stored images that also reached the disk
    pub images_on_disk: usize,
    pub json_on_disk: bool,
}

#[derive(Debug, Clone)]
pub struct Ingestor {
    pool: SqlitePool,
    store: DataStore,
}

impl Ingestor {
    pub fn new(pool: SqlitePool, store: DataStore) -> Self {
        Self { pool, store }
    }

    /// Ingest a buffered body with its declared content type
    pub async fn ingest(&self, body: Bytes, content_type: Option<&str>) -> Result<IngestOutcome> {
        let parts = extract::read_body(body, content_type).await?;
        self.ingest_parts(parts).await
    }

    /// Ingest straight from an HTTP request (router body limits apply)
    pub async fn ingest_request(&self, request: Request) -> Result<IngestOutcome> {
        let parts = extract::read_request(request).await?;
        self.ingest_parts(parts).await
    }

    pub async fn ingest_parts(&self, parts: RequestParts) -> Result<IngestOutcome> {
        let payload = normalize::parse_payload(&parts.payload)?;
        let event = normalize::normalize(&payload);

        let mut images = parts.uploads;
        images.extend(extract::decode_embedded(&payload));

        let raw_json = String::from_utf8_lossy(&parts.payload);
        let now = Utc::now();

        let event_id = db::events::insert_event(&self.pool, &event, &raw_json, now)
            .await
            .map_err(|e| {
                error!(car_id = %event.car_id, error = %e, "failed to insert event");
                e
            })?;

        let json_on_disk = self
            .persist_payload(event_id, &event, parts.json_filename.as_deref(), &parts.payload)
            .await;

        let mut outcome = IngestOutcome {
            event_id,
            plate: event.plate.clone(),
            car_id: event.car_id.clone(),
            images_extracted: images.len(),
            images_stored: 0,
            images_on_disk: 0,
            json_on_disk,
        };

        for (index, image) in images.iter().enumerate() {
            if let Some(on_disk) = self
                .persist_image(event_id, index, image, event.plate.as_deref(), now)
                .await
            {
                outcome.images_stored += 1;
                if on_disk {
                    outcome.images_on_disk += 1;
                }
            }
        }

        info!(
            id = event_id,
            car_id = %outcome.car_id,
            plate = event.plate.as_deref().unwrap_or(""),
            images = outcome.images_stored,
            extracted = outcome.images_extracted,
            on_disk = outcome.images_on_disk,
            json_on_disk = outcome.json_on_disk,
            "event recorded"
        );

        Ok(outcome)
    }

    /// Write the payload file and backfill its name. Returns true on success.
    async fn persist_payload(
        &self,
        event_id: i64,
        event: &NormalizedEvent,
        original_name: Option<&str>,
        payload: &[u8],
    ) -> bool {
        let file_name = json_disk_name(event_id, original_name, event.plate.as_deref());

        if let Err(e) = self.store.write(FileKind::Json, &file_name, payload).await {
            warn!(event_id, file = %file_name, error = %e, "failed to save JSON to disk");
            return false;
        }

        if let Err(e) = db::events::set_json_filename(&self.pool, event_id, &file_name).await {
            warn!(event_id, file = %file_name, error = %e, "failed to record JSON filename");
            return false;
        }
        true
    }

    /// Insert one image row, then its file.
    ///
    /// `None` when the row could not be inserted; otherwise whether the
    /// file reached the disk and its name was recorded.
    async fn persist_image(
        &self,
        event_id: i64,
        index: usize,
        image: &ExtractedImage,
        plate: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Option<bool> {
        let image_id = match db::images::insert_image(
            &self.pool,
            event_id,
            &image.image_type,
            &image.filename,
            &image.data,
            created_at,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(event_id, file = %image.filename, error = %e, "failed to save image");
                return None;
            }
        };

        let file_name = image_disk_name(image_id, index, image, plate);
        if let Err(e) = self.store.write(FileKind::Image, &file_name, &image.data).await {
            warn!(image_id, file = %file_name, error = %e, "failed to save image to disk");
            return Some(false);
        }

        match db::images::set_disk_filename(&self.pool, image_id, &file_name).await {
            Ok(()) => Some(true),
            Err(e) => {
                warn!(image_id, file = %file_name, error = %e, "failed to record image filename");
                Some(false)
            }
        }
    }
}

/// `{event_id}_{original}` for uploaded JSON files, else `{event_id}_{plate}.json`
pub fn json_disk_name(event_id: i64, original_name: Option<&str>, plate: Option<&str>) -> String {
    match original_name.map(sanitize_filename).filter(|n| !n.is_empty()) {
        Some(name) => format!("{}_{}", event_id, name),
        None => format!("{}_{}.json", event_id, plate_stem(plate)),
    }
}

/// Disk name for a stored image; always starts with `{image_id}_`
///
/// Uploads keep their sanitized name, falling back to
/// `{image_id}_{plate}_{index}.jpg`. Embedded images use
/// `{image_id}_{plate}_{type}.{format}`.
pub fn image_disk_name(
    image_id: i64,
    index: usize,
    image: &ExtractedImage,
    plate: Option<&str>,
) -> String {
    match &image.origin {
        ImageOrigin::Uploaded => {
            let name = sanitize_filename(&image.filename);
            if name.is_empty() {
                format!("{}_{}_{}.jpg", image_id, plate_stem(plate), index)
            } else {
                format!("{}_{}", image_id, name)
            }
        }
        ImageOrigin::Embedded { format } => format!(
            "{}_{}_{}.{}",
            image_id,
            plate_stem(plate),
            sanitize_filename(&image.image_type),
            sanitize_filename(format)
        ),
    }
}
