//! Per-field correctness flags on archived events
//!
//! A flag marks one recognized value (plate, maker, model, color) of one
//! archived event as wrong. Flags never touch event or image data.

use chrono::Utc;
use lprs_common::db::{CompareResult, EventSummary};
use lprs_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::db;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareField {
    Plate,
    Maker,
    Model,
    Color,
}

impl CompareField {
    pub const ALL: [CompareField; 4] = [
        CompareField::Plate,
        CompareField::Maker,
        CompareField::Model,
        CompareField::Color,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompareField::Plate => "plate",
            CompareField::Maker => "maker",
            CompareField::Model => "model",
            CompareField::Color => "color",
        }
    }
}

impl fmt::Display for CompareField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plate" => Ok(CompareField::Plate),
            "maker" => Ok(CompareField::Maker),
            "model" => Ok(CompareField::Model),
            "color" => Ok(CompareField::Color),
            other => Err(Error::InvalidInput(format!(
                "invalid compare field: {:?} (expected plate, maker, model or color)",
                other
            ))),
        }
    }
}

/// Flags of one archive keyed by `(event_id, field)`
pub type CompareLookup = HashMap<(i64, CompareField), bool>;

/// Correct/incorrect totals for one field over an archive
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAccuracy {
    pub field: CompareField,
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Percentage of correct values, 0 for an empty archive
    pub accuracy: f64,
}

/// Set or overwrite one flag
///
/// The field name is validated before storage is touched, then the event
/// must belong to the archive.
pub async fn set_result(
    pool: &SqlitePool,
    archive_id: i64,
    event_id: i64,
    field: &str,
    is_incorrect: bool,
) -> Result<()> {
    let field: CompareField = field.parse()?;

    if !db::events::event_in_archive(pool, event_id, archive_id).await? {
        return Err(Error::NotFound(format!(
            "event {} in archive {}",
            event_id, archive_id
        )));
    }

    db::compare::upsert_compare_result(
        pool,
        archive_id,
        event_id,
        field.as_str(),
        is_incorrect,
        Utc::now(),
    )
    .await?;

    debug!(archive_id, event_id, %field, is_incorrect, "compare result stored");
    Ok(())
}

/// All flags of an archive as a lookup table
pub async fn get_results(pool: &SqlitePool, archive_id: i64) -> Result<CompareLookup> {
    let rows = db::compare::compare_results(pool, archive_id).await?;
    Ok(to_lookup(&rows))
}

pub fn to_lookup(rows: &[CompareResult]) -> CompareLookup {
    let mut lookup = CompareLookup::new();
    for row in rows {
        match row.field.parse::<CompareField>() {
            Ok(field) => {
                lookup.insert((row.event_id, field), row.is_incorrect);
            }
            Err(_) => warn!(id = row.id, field = %row.field, "skipping unknown compare field"),
        }
    }
    lookup
}

/// Per-field statistics; an event without a flag counts as correct
pub fn accuracy_summary(events: &[EventSummary], lookup: &CompareLookup) -> Vec<FieldAccuracy> {
    let total = events.len();

    CompareField::ALL
        .iter()
        .map(|&field| {
            let incorrect = events
                .iter()
                .filter(|e| lookup.get(&(e.id, field)).copied().unwrap_or(false))
                .count();
            let correct = total - incorrect;
            let accuracy = if total > 0 {
                correct as f64 / total as f64 * 100.0
            } else {
                0.0
            };

            FieldAccuracy {
                field,
                total,
                correct,
                incorrect,
                accuracy,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(id: i64) -> EventSummary {
        EventSummary {
            id,
            car_id: format!("car-{}", id),
            plate_utf8: None,
            car_state: None,
            event_datetime: None,
            plate_country: None,
            plate_region: None,
            plate_confidence: None,
            geotag_lat: None,
            geotag_lon: None,
            vehicle_make: None,
            vehicle_model: None,
            vehicle_color: None,
            vehicle_type: None,
            camera_serial: None,
            json_filename: None,
            archive_id: Some(1),
            created_at: Utc::now(),
            plate_image_id: None,
            vehicle_image_id: None,
        }
    }

    #[test]
    fn test_field_parsing() {
        for field in CompareField::ALL {
            assert_eq!(field.as_str().parse::<CompareField>().unwrap(), field);
        }
        assert!(matches!("Plate".parse::<CompareField>(), Err(Error::InvalidInput(_))));
        assert!("bogus".parse::<CompareField>().is_err());
    }

    #[test]
    fn test_lookup_skips_unknown_fields() {
        let row = |id, field: &str, is_incorrect| CompareResult {
            id,
            archive_id: 1,
            event_id: 10,
            field: field.to_string(),
            is_incorrect,
            updated_at: Utc::now(),
        };
        let lookup = to_lookup(&[row(1, "plate", true), row(2, "legacy", true)]);

        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get(&(10, CompareField::Plate)), Some(&true));
    }

    #[test]
    fn test_accuracy_summary() {
        let events = vec![summary(1), summary(2), summary(3), summary(4)];
        let mut lookup = CompareLookup::new();
        lookup.insert((1, CompareField::Plate), true);
        lookup.insert((2, CompareField::Plate), false);
        lookup.insert((3, CompareField::Color), true);

        let stats = accuracy_summary(&events, &lookup);
        let plate = &stats[0];
        assert_eq!(plate.field, CompareField::Plate);
        assert_eq!((plate.total, plate.correct, plate.incorrect), (4, 3, 1));
        assert_eq!(plate.accuracy, 75.0);

        let maker = &stats[1];
        assert_eq!(maker.incorrect, 0);
        assert_eq!(maker.accuracy, 100.0);
    }

    #[test]
    fn test_accuracy_of_empty_archive_is_zero() {
        let stats = accuracy_summary(&[], &CompareLookup::new());
        assert!(stats.iter().all(|s| s.total == 0 && s.accuracy == 0.0));
    }
}
