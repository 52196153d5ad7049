//! Archive lifecycle: snapshot current events, rename, delete with files
//!
//! Every event is either current (`archive_id` NULL) or archived. The only
//! transition is current -> archived, made by [`snapshot`]; archived
//! events leave the system only through [`delete_archive`].

use chrono::{Local, Utc};
use lprs_common::db::Archive;
use lprs_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db;
use crate::store::{DataStore, FileKind};

/// Archive names are the local wall-clock time of the snapshot
const ARCHIVE_NAME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Summary of a completed archive deletion
#[derive(Debug, Clone, Serialize)]
pub struct DeleteReport {
    pub archive_id: i64,
    pub events: u64,
    pub images: u64,
    pub compare_results: u64,
    /// Files that existed and could not be removed
    pub files_failed: usize,
}

/// Move every current event into a new archive
///
/// Returns `None` without creating anything when there are no current
/// events. Events ingested while the snapshot runs land either in this
/// archive or in the next one; `event_count` always matches membership.
pub async fn snapshot(pool: &SqlitePool) -> Result<Option<Archive>> {
    let current = db::events::count_current_events(pool).await?;
    if current == 0 {
        info!("No current events, snapshot skipped");
        return Ok(None);
    }

    let name = Local::now().format(ARCHIVE_NAME_FORMAT).to_string();
    let archive = db::archives::create_snapshot(pool, &name, Utc::now()).await?;

    match &archive {
        Some(archive) => info!(
            archive_id = archive.id,
            events = archive.event_count,
            "archive created"
        ),
        None => info!("Current events were archived concurrently, snapshot skipped"),
    }

    Ok(archive)
}

/// Trim and store a new display name
pub async fn rename_archive(pool: &SqlitePool, archive_id: i64, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("archive name must not be empty".to_string()));
    }

    if !db::archives::rename_archive(pool, archive_id, name).await? {
        return Err(Error::NotFound(format!("archive {}", archive_id)));
    }

    info!(archive_id, name, "archive renamed");
    Ok(())
}

/// Delete an archive, its events, images, compare results and disk files
///
/// File removal is best-effort and happens first; missing files are fine.
/// The rows then go in one transaction.
pub async fn delete_archive(
    pool: &SqlitePool,
    store: &DataStore,
    archive_id: i64,
) -> Result<DeleteReport> {
    if db::archives::get_archive(pool, archive_id).await?.is_none() {
        return Err(Error::NotFound(format!("archive {}", archive_id)));
    }

    let files = db::archives::archive_files(pool, archive_id).await?;

    let mut files_failed = 0;
    for name in &files.json {
        if !store.remove(FileKind::Json, name).await {
            files_failed += 1;
        }
    }
    for name in &files.images {
        if !store.remove(FileKind::Image, name).await {
            files_failed += 1;
        }
    }
    if files_failed > 0 {
        warn!(archive_id, files_failed, "some archive files could not be removed");
    }

    let deleted = db::archives::delete_archive_rows(pool, archive_id).await?;
    if deleted.archives == 0 {
        // Deleted by a concurrent request after the existence check
        return Err(Error::NotFound(format!("archive {}", archive_id)));
    }

    info!(
        archive_id,
        events = deleted.events,
        images = deleted.images,
        compare_results = deleted.compare_results,
        "archive deleted"
    );

    Ok(DeleteReport {
        archive_id,
        events: deleted.events,
        images: deleted.images,
        compare_results: deleted.compare_results,
        files_failed,
    })
}
