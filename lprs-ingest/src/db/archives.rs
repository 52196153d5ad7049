//! Archive row persistence: snapshot, rename, cascade delete

use chrono::{DateTime, Utc};
use lprs_common::db::Archive;
use lprs_common::Result;
use sqlx::SqlitePool;

/// Disk names referenced by the rows of one archive
#[derive(Debug, Default, Clone)]
pub struct ArchiveFiles {
    pub json: Vec<String>,
    pub images: Vec<String>,
}

/// Row counts removed by [`delete_archive_rows`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeletedRows {
    pub compare_results: u64,
    pub images: u64,
    pub events: u64,
    pub archives: u64,
}

/// Archives, newest first
pub async fn list_archives(pool: &SqlitePool) -> Result<Vec<Archive>> {
    let archives = sqlx::query_as::<_, Archive>(
        "SELECT id, name, event_count, created_at FROM archives ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(archives)
}

pub async fn get_archive(pool: &SqlitePool, archive_id: i64) -> Result<Option<Archive>> {
    let archive = sqlx::query_as::<_, Archive>(
        "SELECT id, name, event_count, created_at FROM archives WHERE id = ?",
    )
    .bind(archive_id)
    .fetch_optional(pool)
    .await?;

    Ok(archive)
}

/// Create an archive and move every current event into it
///
/// Runs as one write transaction. The transaction starts with the insert,
/// so SQLite takes the write lock before any event is moved; `event_count`
/// is the exact number of rows moved. Returns `None` (and leaves no
/// archive behind) when there was nothing to move.
pub async fn create_snapshot(
    pool: &SqlitePool,
    name: &str,
    created_at: DateTime<Utc>,
) -> Result<Option<Archive>> {
    let mut tx = pool.begin().await?;

    let archive_id = sqlx::query(
        "INSERT INTO archives (name, event_count, created_at) VALUES (?, 0, ?)",
    )
    .bind(name)
    .bind(created_at)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    let moved = sqlx::query("UPDATE events SET archive_id = ? WHERE archive_id IS NULL")
        .bind(archive_id)
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;

    if moved == 0 {
        tx.rollback().await?;
        return Ok(None);
    }

    sqlx::query("UPDATE archives SET event_count = ? WHERE id = ?")
        .bind(moved)
        .bind(archive_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some(Archive {
        id: archive_id,
        name: Some(name.to_string()),
        event_count: moved,
        created_at,
    }))
}

/// Returns false when no archive has this id
pub async fn rename_archive(pool: &SqlitePool, archive_id: i64, name: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE archives SET name = ? WHERE id = ?")
        .bind(name)
        .bind(archive_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn archive_files(pool: &SqlitePool, archive_id: i64) -> Result<ArchiveFiles> {
    let json: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT json_filename FROM events
        WHERE archive_id = ? AND json_filename IS NOT NULL AND json_filename != ''
        "#,
    )
    .bind(archive_id)
    .fetch_all(pool)
    .await?;

    let images: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT i.disk_filename
        FROM images i
        JOIN events e ON e.id = i.event_id
        WHERE e.archive_id = ? AND i.disk_filename IS NOT NULL AND i.disk_filename != ''
        "#,
    )
    .bind(archive_id)
    .fetch_all(pool)
    .await?;

    Ok(ArchiveFiles { json, images })
}

/// Delete an archive with its compare results, images and events
///
/// Children go first so the delete also holds on a database where the
/// cascade clauses are missing.
pub async fn delete_archive_rows(pool: &SqlitePool, archive_id: i64) -> Result<DeletedRows> {
    let mut tx = pool.begin().await?;

    let compare_results = sqlx::query("DELETE FROM compare_results WHERE archive_id = ?")
        .bind(archive_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let images = sqlx::query(
        "DELETE FROM images WHERE event_id IN (SELECT id FROM events WHERE archive_id = ?)",
    )
    .bind(archive_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let events = sqlx::query("DELETE FROM events WHERE archive_id = ?")
        .bind(archive_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let archives = sqlx::query("DELETE FROM archives WHERE id = ?")
        .bind(archive_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    Ok(DeletedRows {
        compare_results,
        images,
        events,
        archives,
    })
}
