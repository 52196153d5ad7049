//! HTTP API handlers for lprs-ingest
//!
//! Sensors post to `/api`; everything else is the JSON read side plus the
//! archive and compare operations.

pub mod archives;
pub mod compare;
pub mod events;
pub mod health;
pub mod ingest;

pub use archives::archive_routes;
pub use compare::compare_routes;
pub use events::event_routes;
pub use health::health_routes;
pub use ingest::ingest_routes;

use crate::error::{ApiError, ApiResult};

/// Parse a numeric path id, answering 400 in the API error shape
pub(crate) fn parse_id(raw: &str) -> ApiResult<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid id: {:?}", raw)))
}
