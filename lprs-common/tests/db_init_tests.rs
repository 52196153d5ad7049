//! Tests for database initialization and schema migrations

use lprs_common::db::init::init_database;
use lprs_common::db::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("nested").join("lprs.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("lprs.db");

    let pool1 = init_database(&db_path).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());

    let version = get_schema_version(&pool2.unwrap()).await.unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
}

#[tokio::test]
async fn test_all_tables_created() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("lprs.db")).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in ["archives", "compare_results", "events", "images", "schema_version"] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_archive_id_is_write_once() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("lprs.db")).await.unwrap();

    for id in [1, 2] {
        sqlx::query("INSERT INTO archives (id, name, event_count, created_at) VALUES (?, 'a', 1, CURRENT_TIMESTAMP)")
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
    }
    sqlx::query("INSERT INTO events (id, car_id, created_at) VALUES (1, 'car', CURRENT_TIMESTAMP)")
        .execute(&pool)
        .await
        .unwrap();

    // NULL -> 1 is allowed
    sqlx::query("UPDATE events SET archive_id = 1 WHERE id = 1")
        .execute(&pool)
        .await
        .unwrap();

    // 1 -> 2 and 1 -> NULL are rejected
    let moved = sqlx::query("UPDATE events SET archive_id = 2 WHERE id = 1")
        .execute(&pool)
        .await;
    assert!(moved.is_err());
    let cleared = sqlx::query("UPDATE events SET archive_id = NULL WHERE id = 1")
        .execute(&pool)
        .await;
    assert!(cleared.is_err());
}

#[tokio::test]
async fn test_geotag_requires_both_coordinates() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("lprs.db")).await.unwrap();

    let half = sqlx::query(
        "INSERT INTO events (car_id, geotag_lat, created_at) VALUES ('car', 1.5, CURRENT_TIMESTAMP)",
    )
    .execute(&pool)
    .await;
    assert!(half.is_err(), "latitude without longitude must be rejected");
}

#[tokio::test]
async fn test_deleting_event_cascades_to_images() {
    let temp_dir = TempDir::new().unwrap();
    let pool = init_database(&temp_dir.path().join("lprs.db")).await.unwrap();

    sqlx::query("INSERT INTO events (id, car_id, created_at) VALUES (7, 'car', CURRENT_TIMESTAMP)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO images (event_id, image_data, created_at) VALUES (7, x'FFD8', CURRENT_TIMESTAMP)")
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query("DELETE FROM events WHERE id = 7")
        .execute(&pool)
        .await
        .unwrap();

    let images: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM images")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(images, 0);
}
