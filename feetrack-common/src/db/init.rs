//! Store initialization
//!
//! Creates the SQLite schema on first run and lazily seeds the settings
//! singleton. Idempotent; safe to call on every startup.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Default SMS template. `{name}`, `{month}`, and `{coachingName}` are
/// substituted at render time.
pub const DEFAULT_SMS_TEMPLATE: &str =
    "Hi {name}, your coaching fee for {month} has been received. Thank you. - {coachingName}";

/// Default coaching name until the administrator sets one.
pub const DEFAULT_COACHING_NAME: &str = "Coaching Center";

/// Initialize the store connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL mode allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Set busy timeout
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Schema creation is idempotent - safe to call multiple times
    create_students_table(&pool).await?;
    create_payments_table(&pool).await?;
    create_settings_table(&pool).await?;
    create_sms_logs_table(&pool).await?;

    // Lazily seed the settings singleton
    init_default_settings(&pool).await?;

    Ok(pool)
}

async fn create_students_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            student_phone TEXT,
            guardian_phone TEXT,
            teacher_phone TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_students_name ON students(name)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the payments table
///
/// Each row is an opaque JSON document, preserved exactly as written by
/// whichever form generation produced it. No uniqueness constraint exists
/// on the logical (student, month) key; duplicate suppression is the
/// reconciler's read-time concern.
async fn create_payments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            doc TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            CHECK (json_valid(doc))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_payments_updated ON payments(updated_at)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores application configuration key-value pairs.
async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the sms_logs table
///
/// Append-only delivery audit; rows are never updated or deleted.
async fn create_sms_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sms_logs (
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            month TEXT NOT NULL,
            recipient_role TEXT NOT NULL CHECK (recipient_role IN ('student', 'guardian', 'teacher')),
            to_phone TEXT,
            message TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('sent', 'failed')),
            provider_response TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sms_logs_month ON sms_logs(month)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sms_logs_status ON sms_logs(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Initialize or repair default settings
///
/// Ensures the notification settings singleton exists with defaults, and
/// resets NULL values back to their defaults.
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "coaching_name", DEFAULT_COACHING_NAME).await?;
    ensure_setting(pool, "sms_template", DEFAULT_SMS_TEMPLATE).await?;
    ensure_setting(pool, "send_to_student", "true").await?;
    ensure_setting(pool, "send_to_guardian", "true").await?;
    ensure_setting(pool, "send_to_teacher", "false").await?;

    info!("Default settings initialized");
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// If the setting doesn't exist, it will be created with the default.
/// If the setting exists but has a NULL value, it will be reset to the default.
async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE handles concurrent initialization races
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}
