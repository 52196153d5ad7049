//! lprs-ingest library interface
//!
//! Exposes the router and the ingestion pipeline for the binary and for
//! integration tests.

pub mod api;
pub mod archive;
pub mod compare;
pub mod db;
pub mod error;
pub mod ingest;
pub mod roles;
pub mod sanitize;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use lprs_common::config::ServiceConfig;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ingest::Ingestor;
use crate::store::DataStore;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// On-disk copies under `<root>/data`
    pub store: DataStore,
    pub ingestor: Ingestor,
    /// Row cap of the current event listing
    pub recent_limit: i64,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, store: DataStore, recent_limit: i64) -> Self {
        Self {
            ingestor: Ingestor::new(db.clone(), store.clone()),
            db,
            store,
            recent_limit,
            startup_time: Utc::now(),
        }
    }

    /// Create the root folder layout, open the database and build the state
    pub async fn open(config: &ServiceConfig) -> lprs_common::Result<Self> {
        let layout = config.layout();
        layout.ensure_directories()?;

        let db_path = layout.database_path();
        info!("Database: {}", db_path.display());
        let db = lprs_common::db::init_database(&db_path).await?;

        let store = DataStore::new(layout.data_dir());
        store.ensure_dirs().await?;

        Ok(Self::new(db, store, config.recent_limit))
    }
}

/// Build application router
///
/// `max_body_bytes` caps every request body, multipart uploads included.
pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(api::ingest_routes())
        .merge(api::event_routes())
        .merge(api::archive_routes())
        .merge(api::compare_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}
