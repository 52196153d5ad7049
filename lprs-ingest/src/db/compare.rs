//! Compare result persistence

use chrono::{DateTime, Utc};
use lprs_common::db::CompareResult;
use lprs_common::Result;
use sqlx::SqlitePool;

/// Insert or overwrite the flag for `(archive_id, event_id, field)`
pub async fn upsert_compare_result(
    pool: &SqlitePool,
    archive_id: i64,
    event_id: i64,
    field: &str,
    is_incorrect: bool,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO compare_results (archive_id, event_id, field, is_incorrect, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(archive_id, event_id, field) DO UPDATE SET
            is_incorrect = excluded.is_incorrect,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(archive_id)
    .bind(event_id)
    .bind(field)
    .bind(is_incorrect)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn compare_results(pool: &SqlitePool, archive_id: i64) -> Result<Vec<CompareResult>> {
    let results = sqlx::query_as::<_, CompareResult>(
        r#"
        SELECT id, archive_id, event_id, field, is_incorrect, updated_at
        FROM compare_results
        WHERE archive_id = ?
        ORDER BY event_id, field
        "#,
    )
    .bind(archive_id)
    .fetch_all(pool)
    .await?;

    Ok(results)
}
