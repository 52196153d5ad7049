//! Image row persistence and read queries

use chrono::{DateTime, Utc};
use lprs_common::db::ImageInfo;
use lprs_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Insert an image owned by `event_id` and return its assigned id
pub async fn insert_image(
    pool: &SqlitePool,
    event_id: i64,
    image_type: &str,
    filename: &str,
    data: &[u8],
    created_at: DateTime<Utc>,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO images (event_id, image_type, filename, image_data, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(event_id)
    .bind(image_type)
    .bind(filename)
    .bind(data)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Record the on-disk image name; safe to repeat
pub async fn set_disk_filename(pool: &SqlitePool, image_id: i64, file_name: &str) -> Result<()> {
    sqlx::query("UPDATE images SET disk_filename = ? WHERE id = ?")
        .bind(file_name)
        .bind(image_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Metadata of an event's images in insertion order
pub async fn images_for_event(pool: &SqlitePool, event_id: i64) -> Result<Vec<ImageInfo>> {
    let images = sqlx::query_as::<_, ImageInfo>(
        r#"
        SELECT id, event_id, image_type, filename, disk_filename, created_at
        FROM images
        WHERE event_id = ?
        ORDER BY id ASC
        "#,
    )
    .bind(event_id)
    .fetch_all(pool)
    .await?;

    Ok(images)
}

pub async fn get_image_info(pool: &SqlitePool, image_id: i64) -> Result<Option<ImageInfo>> {
    let image = sqlx::query_as::<_, ImageInfo>(
        "SELECT id, event_id, image_type, filename, disk_filename, created_at FROM images WHERE id = ?",
    )
    .bind(image_id)
    .fetch_optional(pool)
    .await?;

    Ok(image)
}

pub async fn get_image_data(pool: &SqlitePool, image_id: i64) -> Result<Option<Vec<u8>>> {
    let data: Option<Vec<u8>> = sqlx::query_scalar("SELECT image_data FROM images WHERE id = ?")
        .bind(image_id)
        .fetch_optional(pool)
        .await?;

    Ok(data)
}

/// `(event_id, image_id, image_type)` for the given events, ordered by image id
pub async fn image_types_for_events(
    pool: &SqlitePool,
    event_ids: &[i64],
) -> Result<Vec<(i64, i64, Option<String>)>> {
    if event_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT event_id, id, image_type FROM images WHERE event_id IN (");
    let mut separated = builder.separated(", ");
    for id in event_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY id ASC");

    let rows = builder
        .build_query_as::<(i64, i64, Option<String>)>()
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
