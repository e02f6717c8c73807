//! Mark-paid orchestration
//!
//! Preconditions fail atomically with no side effects. Past that point the
//! operation is deliberately non-atomic: notification is attempted first,
//! bounded and best-effort; the payment-state commit is unconditional and
//! remains the source of truth. Payment correctness is never blocked by the
//! third-party gateway.

use feetrack_common::db::models::StudentField;
use feetrack_common::db::queries;
use feetrack_common::{month, Error, Result};
use serde_json::{json, Map, Value};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::services::{dispatcher, reconciler};
use crate::AppState;

/// Ceiling on the whole notification step. Exceeding it is a notification
/// failure, not an ambiguous outcome; the commit proceeds regardless.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(20);

/// Structured result of one invocation; the two effects are reported
/// separately instead of signalling through errors.
#[derive(Debug, Clone, Copy)]
pub struct MarkPaidOutcome {
    pub committed: bool,
    pub notified: bool,
}

/// Mark (student, month) paid and notify the enabled recipients.
///
/// Idempotent for state: re-invoking on an already-paid key updates the
/// same record in place (and re-sends SMS). Two concurrent invocations may
/// both notify; both converge on `paid`.
pub async fn mark_paid(
    state: &AppState,
    student_id: &str,
    month_key: &str,
    admin_email: &str,
) -> Result<MarkPaidOutcome> {
    // Preconditions: reject before any store write or gateway call.
    if !state.config.is_admin(admin_email) {
        return Err(Error::Unauthorized(format!(
            "{} is not an administrator",
            admin_email
        )));
    }
    if !month::is_canonical_month(month_key) {
        return Err(Error::InvalidInput(format!(
            "month must be YYYY-MM, got {:?}",
            month_key
        )));
    }
    if student_id.trim().is_empty() {
        return Err(Error::InvalidInput("studentId is required".to_string()));
    }
    let student = queries::get_student(&state.db, student_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Student {} not found", student_id)))?;

    let settings = queries::load_notify_settings(&state.db).await?;
    let field = reconciler::detect_student_field(&state.db).await?;

    // Step 1: best-effort notification, bounded. Failure here never aborts.
    let notified = match tokio::time::timeout(
        NOTIFY_TIMEOUT,
        dispatcher::dispatch(&state.db, &state.sms, &student, month_key, &settings),
    )
    .await
    {
        Ok(outcomes) => {
            let failed = outcomes.iter().filter(|o| !o.sent).count();
            if failed > 0 {
                warn!(
                    student_id,
                    month = month_key,
                    failed,
                    "Notification incomplete; payment will still be committed"
                );
            }
            failed == 0
        }
        Err(_) => {
            warn!(
                student_id,
                month = month_key,
                "Notification step exceeded {:?}; payment will still be committed",
                NOTIFY_TIMEOUT
            );
            false
        }
    };

    // Step 2: unconditional, idempotent commit using the detected key.
    commit_paid(&state.db, field, student_id, month_key).await?;

    info!(student_id, month = month_key, notified, "Payment marked paid");

    Ok(MarkPaidOutcome {
        committed: true,
        notified,
    })
}

/// Upsert the payment state for (student, month) to paid.
///
/// At-least-one semantics: the invariant is that one canonical paid record
/// exists for the key, never exactly one. Duplicate suppression stays a
/// read-time concern of the reconciler.
async fn commit_paid(
    pool: &SqlitePool,
    field: StudentField,
    student_id: &str,
    month_key: &str,
) -> Result<()> {
    let paid_at = chrono::Utc::now().to_rfc3339();

    match queries::find_payment_by_key(pool, field, student_id, month_key).await? {
        Some(mut existing) => {
            if let Some(obj) = existing.doc.as_object_mut() {
                obj.insert("status".to_string(), json!("paid"));
                obj.insert("paidAt".to_string(), json!(paid_at));
            }
            queries::update_payment_doc(pool, &existing.id, &existing.doc).await?;
        }
        None => {
            let mut doc = Map::new();
            doc.insert(field.key().to_string(), json!(student_id));
            doc.insert("month".to_string(), json!(month_key));
            doc.insert("status".to_string(), json!("paid"));
            doc.insert("paidAt".to_string(), json!(paid_at));
            queries::insert_payment(pool, &Uuid::new_v4().to_string(), &Value::Object(doc))
                .await?;
        }
    }

    Ok(())
}
