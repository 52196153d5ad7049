//! Database schema migrations
//!
//! Versioned, idempotent migrations tracked in the `schema_version` table.
//! Never modify an existing migration; add a new one and bump
//! [`CURRENT_SCHEMA_VERSION`].

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    Ok(())
}

/// v1: archives, events, images, compare_results
///
/// AUTOINCREMENT keeps ids from being reused after an archive is deleted,
/// so disk names derived from ids stay unique for the life of the database.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS archives (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT,
            event_count INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            car_id TEXT NOT NULL,
            plate_utf8 TEXT,
            car_state TEXT,
            sensor_provider_id TEXT,
            event_datetime TEXT,
            capture_timestamp TEXT,
            plate_country TEXT,
            plate_region TEXT,
            plate_region_code TEXT,
            plate_confidence REAL,
            geotag_lat REAL,
            geotag_lon REAL,
            vehicle_make TEXT,
            vehicle_model TEXT,
            vehicle_color TEXT,
            vehicle_type TEXT,
            confidence_mmr REAL,
            confidence_color REAL,
            camera_serial TEXT,
            camera_ip TEXT,
            raw_json TEXT,
            json_filename TEXT,
            archive_id INTEGER REFERENCES archives(id),
            created_at TIMESTAMP NOT NULL,
            CHECK ((geotag_lat IS NULL) = (geotag_lon IS NULL))
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_archive_id ON events(archive_id)")
        .execute(&mut *tx)
        .await?;

    // archive_id moves NULL -> archive exactly once
    sqlx::query(
        r#"
        CREATE TRIGGER IF NOT EXISTS events_archive_id_write_once
        BEFORE UPDATE OF archive_id ON events
        WHEN OLD.archive_id IS NOT NULL
            AND (NEW.archive_id IS NULL OR NEW.archive_id != OLD.archive_id)
        BEGIN
            SELECT RAISE(ABORT, 'archive_id is immutable once set');
        END
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            image_type TEXT,
            filename TEXT,
            image_data BLOB NOT NULL,
            disk_filename TEXT,
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_images_event_id ON images(event_id)")
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS compare_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            archive_id INTEGER NOT NULL REFERENCES archives(id) ON DELETE CASCADE,
            event_id INTEGER NOT NULL REFERENCES events(id) ON DELETE CASCADE,
            field TEXT NOT NULL CHECK (field IN ('plate', 'maker', 'model', 'color')),
            is_incorrect INTEGER NOT NULL DEFAULT 0,
            updated_at TIMESTAMP NOT NULL,
            UNIQUE (archive_id, event_id, field)
        )
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!("Migration v1: created archives, events, images, compare_results");
    Ok(())
}
