//! Display image selection for event listings
//!
//! Each listed event shows one plate image and one vehicle image:
//! - plate: the first image typed `plate`, else the first image
//! - vehicle: the first image typed `vehicle`, else the second image
//!
//! "First"/"second" follow insertion order (ascending image id). Listing
//! queries must go through [`attach_display_images`] so the policy lives
//! only here.

use lprs_common::db::EventSummary;
use lprs_common::Result;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::db;
use crate::ingest::extract::{IMAGE_TYPE_PLATE, IMAGE_TYPE_VEHICLE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayImages {
    pub plate: Option<i64>,
    pub vehicle: Option<i64>,
}

/// Apply the selection policy to `(image_id, image_type)` pairs in insertion order
pub fn select_display_images(images: &[(i64, Option<String>)]) -> DisplayImages {
    let typed = |wanted: &str| {
        images
            .iter()
            .find(|(_, image_type)| image_type.as_deref() == Some(wanted))
            .map(|(id, _)| *id)
    };

    DisplayImages {
        plate: typed(IMAGE_TYPE_PLATE).or_else(|| images.first().map(|(id, _)| *id)),
        vehicle: typed(IMAGE_TYPE_VEHICLE).or_else(|| images.get(1).map(|(id, _)| *id)),
    }
}

/// Fill `plate_image_id` / `vehicle_image_id` on a page of listed events
pub async fn attach_display_images(pool: &SqlitePool, events: &mut [EventSummary]) -> Result<()> {
    let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
    let rows = db::images::image_types_for_events(pool, &ids).await?;

    let mut by_event: HashMap<i64, Vec<(i64, Option<String>)>> = HashMap::new();
    for (event_id, image_id, image_type) in rows {
        by_event.entry(event_id).or_default().push((image_id, image_type));
    }

    for event in events.iter_mut() {
        let selected = by_event
            .get(&event.id)
            .map(|images| select_display_images(images))
            .unwrap_or_default();
        event.plate_image_id = selected.plate;
        event.vehicle_image_id = selected.vehicle;
    }

    Ok(())
}
