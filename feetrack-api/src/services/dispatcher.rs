//! SMS dispatch and audit logging
//!
//! Recipients are processed strictly sequentially so the audit log lands in
//! a stable, reproducible order and a gateway rate limit hits every
//! recipient uniformly. Every processed recipient produces exactly one
//! sms_logs row; an invalid destination never reaches the gateway.

use feetrack_common::db::models::{NotifySettings, SmsLog, Student};
use feetrack_common::db::queries;
use feetrack_common::{month, phone};
use sqlx::SqlitePool;
use tracing::warn;
use uuid::Uuid;

use crate::services::sms::SmsClient;

/// Audit text recorded when the destination fails phone normalization.
pub const INVALID_PHONE_RESPONSE: &str = "Invalid phone";

/// Recipient role on the audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientRole {
    Student,
    Guardian,
    Teacher,
}

impl RecipientRole {
    pub fn as_str(self) -> &'static str {
        match self {
            RecipientRole::Student => "student",
            RecipientRole::Guardian => "guardian",
            RecipientRole::Teacher => "teacher",
        }
    }
}

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub role: RecipientRole,
    pub to_phone: Option<String>,
    pub sent: bool,
    pub response: String,
}

/// Render the message template. `{name}`, `{month}` (long-form month name),
/// and `{coachingName}` are substituted; unknown placeholders stay verbatim.
pub fn render_template(template: &str, name: &str, month_key: &str, coaching_name: &str) -> String {
    template
        .replace("{name}", name)
        .replace("{month}", &month::month_display(month_key))
        .replace("{coachingName}", coaching_name)
}

/// Recipients eligible for this send: role toggled on in settings and a
/// phone number on file.
pub fn eligible_recipients(
    student: &Student,
    settings: &NotifySettings,
) -> Vec<(RecipientRole, String)> {
    let candidates = [
        (
            RecipientRole::Student,
            settings.send_to_student,
            &student.student_phone,
        ),
        (
            RecipientRole::Guardian,
            settings.send_to_guardian,
            &student.guardian_phone,
        ),
        (
            RecipientRole::Teacher,
            settings.send_to_teacher,
            &student.teacher_phone,
        ),
    ];

    candidates
        .into_iter()
        .filter(|(_, enabled, _)| *enabled)
        .filter_map(|(role, _, raw)| match raw {
            Some(p) if !p.trim().is_empty() => Some((role, p.clone())),
            _ => None,
        })
        .collect()
}

/// Send to every eligible recipient, one attempt each, writing one audit
/// row per attempt. Gateway failures stay per-recipient; audit-write
/// failures are logged and not retried.
pub async fn dispatch(
    pool: &SqlitePool,
    sms: &SmsClient,
    student: &Student,
    month_key: &str,
    settings: &NotifySettings,
) -> Vec<DispatchOutcome> {
    let message = render_template(
        &settings.sms_template,
        &student.name,
        month_key,
        &settings.coaching_name,
    );
    let mut outcomes = Vec::new();

    for (role, raw_phone) in eligible_recipients(student, settings) {
        let outcome = match phone::normalize_phone(&raw_phone) {
            None => DispatchOutcome {
                role,
                to_phone: None,
                sent: false,
                response: INVALID_PHONE_RESPONSE.to_string(),
            },
            Some(to) => match sms.send(&to, &message).await {
                Ok(body) => DispatchOutcome {
                    role,
                    to_phone: Some(to),
                    sent: true,
                    response: body,
                },
                Err(e) => {
                    warn!(role = role.as_str(), error = %e, "SMS dispatch failed");
                    DispatchOutcome {
                        role,
                        to_phone: Some(to),
                        sent: false,
                        response: e.audit_text(),
                    }
                }
            },
        };

        let log = SmsLog {
            id: Uuid::new_v4().to_string(),
            student_id: student.id.clone(),
            month: month_key.to_string(),
            recipient_role: outcome.role.as_str().to_string(),
            to_phone: outcome.to_phone.clone(),
            message: message.clone(),
            status: if outcome.sent { "sent" } else { "failed" }.to_string(),
            provider_response: outcome.response.clone(),
            created_at: None,
        };
        if let Err(e) = queries::insert_sms_log(pool, &log).await {
            warn!(error = %e, "Failed to write SMS audit row");
        }

        outcomes.push(outcome);
    }

    outcomes
}
