//! Store queries
//!
//! Everything that touches the payments collection takes the resolved
//! [`StudentField`] so one session always talks to the same spelling of the
//! student reference key.

use crate::db::init::{DEFAULT_COACHING_NAME, DEFAULT_SMS_TEMPLATE};
use crate::db::models::{
    parse_store_timestamp, NotifySettings, RawPayment, SmsLog, Student, StudentField,
};
use crate::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::warn;

/// Whole-collection page limit; batch reconciliation assumes the payments
/// collection fits in one page.
pub const PAGE_LIMIT: i64 = 5000;

// ========================================
// Students
// ========================================

pub async fn list_students(pool: &SqlitePool) -> Result<Vec<Student>> {
    let rows: Vec<(
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        i64,
    )> = sqlx::query_as(
        "SELECT id, name, student_phone, guardian_phone, teacher_phone, active
         FROM students ORDER BY name COLLATE NOCASE",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(student_from_row).collect())
}

pub async fn get_student(pool: &SqlitePool, id: &str) -> Result<Option<Student>> {
    let row: Option<(
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        i64,
    )> = sqlx::query_as(
        "SELECT id, name, student_phone, guardian_phone, teacher_phone, active
         FROM students WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(student_from_row))
}

pub async fn insert_student(pool: &SqlitePool, student: &Student) -> Result<()> {
    sqlx::query(
        "INSERT INTO students (id, name, student_phone, guardian_phone, teacher_phone, active)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&student.id)
    .bind(&student.name)
    .bind(&student.student_phone)
    .bind(&student.guardian_phone)
    .bind(&student.teacher_phone)
    .bind(student.active as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns false when no row matched the id.
pub async fn delete_student(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM students WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn student_from_row(
    row: (
        String,
        String,
        Option<String>,
        Option<String>,
        Option<String>,
        i64,
    ),
) -> Student {
    Student {
        id: row.0,
        name: row.1,
        student_phone: row.2,
        guardian_phone: row.3,
        teacher_phone: row.4,
        active: row.5 != 0,
    }
}

// ========================================
// Payments
// ========================================

/// Fetch raw payment rows, most recently updated first. Rows whose document
/// is not valid JSON are excluded (unparseable history is not an error).
pub async fn fetch_payments_desc(pool: &SqlitePool, limit: i64) -> Result<Vec<RawPayment>> {
    let rows: Vec<(String, String, Option<String>, Option<String>)> = sqlx::query_as(
        "SELECT id, doc, created_at, updated_at FROM payments ORDER BY updated_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut payments = Vec::with_capacity(rows.len());
    for row in rows {
        match payment_from_row(row) {
            Some(p) => payments.push(p),
            None => warn!("Skipping payment row with corrupt document"),
        }
    }

    Ok(payments)
}

/// Equality lookup on (detected student key, month). Exact month match
/// only: a drifted-month duplicate stays behind for the reconciler.
pub async fn find_payment_by_key(
    pool: &SqlitePool,
    field: StudentField,
    student_id: &str,
    month: &str,
) -> Result<Option<RawPayment>> {
    let row: Option<(String, String, Option<String>, Option<String>)> = sqlx::query_as(
        "SELECT id, doc, created_at, updated_at FROM payments
         WHERE json_extract(doc, ?) = ? AND json_extract(doc, '$.month') = ?
         LIMIT 1",
    )
    .bind(field.json_path())
    .bind(student_id)
    .bind(month)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(payment_from_row))
}

pub async fn insert_payment(pool: &SqlitePool, id: &str, doc: &Value) -> Result<()> {
    sqlx::query("INSERT INTO payments (id, doc) VALUES (?, ?)")
        .bind(id)
        .bind(doc.to_string())
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn update_payment_doc(pool: &SqlitePool, id: &str, doc: &Value) -> Result<()> {
    sqlx::query("UPDATE payments SET doc = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
        .bind(doc.to_string())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

fn payment_from_row(row: (String, String, Option<String>, Option<String>)) -> Option<RawPayment> {
    let (id, doc, created_at, updated_at) = row;
    let doc = serde_json::from_str(&doc).ok()?;
    Some(RawPayment {
        id,
        doc,
        created_at: created_at.as_deref().and_then(parse_store_timestamp),
        updated_at: updated_at.as_deref().and_then(parse_store_timestamp),
    })
}

// ========================================
// SMS logs
// ========================================

pub async fn insert_sms_log(pool: &SqlitePool, log: &SmsLog) -> Result<()> {
    sqlx::query(
        "INSERT INTO sms_logs (id, student_id, month, recipient_role, to_phone, message, status, provider_response)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&log.id)
    .bind(&log.student_id)
    .bind(&log.month)
    .bind(&log.recipient_role)
    .bind(&log.to_phone)
    .bind(&log.message)
    .bind(&log.status)
    .bind(&log.provider_response)
    .execute(pool)
    .await?;

    Ok(())
}

/// Browse the audit log, newest first, optionally filtered by month and
/// delivery status.
pub async fn list_sms_logs(
    pool: &SqlitePool,
    month: Option<&str>,
    status: Option<&str>,
) -> Result<Vec<SmsLog>> {
    let mut sql = String::from(
        "SELECT id, student_id, month, recipient_role, to_phone, message, status, provider_response, created_at
         FROM sms_logs",
    );
    let mut conditions = Vec::new();
    if month.is_some() {
        conditions.push("month = ?");
    }
    if status.is_some() {
        conditions.push("status = ?");
    }
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC LIMIT 500");

    let mut query = sqlx::query_as::<
        _,
        (
            String,
            String,
            String,
            String,
            Option<String>,
            String,
            String,
            String,
            Option<String>,
        ),
    >(&sql);
    if let Some(m) = month {
        query = query.bind(m);
    }
    if let Some(s) = status {
        query = query.bind(s);
    }

    let rows = query.fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|row| SmsLog {
            id: row.0,
            student_id: row.1,
            month: row.2,
            recipient_role: row.3,
            to_phone: row.4,
            message: row.5,
            status: row.6,
            provider_response: row.7,
            created_at: row.8.as_deref().and_then(parse_store_timestamp),
        })
        .collect())
}

// ========================================
// Settings
// ========================================

pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row: Option<(Option<String>,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|r| r.0))
}

/// Load the notification settings singleton; blank or missing values fall
/// back to defaults.
pub async fn load_notify_settings(pool: &SqlitePool) -> Result<NotifySettings> {
    Ok(NotifySettings {
        coaching_name: get_setting(pool, "coaching_name")
            .await?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_COACHING_NAME.to_string()),
        sms_template: get_setting(pool, "sms_template")
            .await?
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SMS_TEMPLATE.to_string()),
        send_to_student: setting_flag(pool, "send_to_student", true).await?,
        send_to_guardian: setting_flag(pool, "send_to_guardian", true).await?,
        send_to_teacher: setting_flag(pool, "send_to_teacher", false).await?,
    })
}

async fn setting_flag(pool: &SqlitePool, key: &str, default: bool) -> Result<bool> {
    Ok(get_setting(pool, key)
        .await?
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default))
}
