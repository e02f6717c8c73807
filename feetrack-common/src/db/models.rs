//! Store models

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub student_phone: Option<String>,
    pub guardian_phone: Option<String>,
    pub teacher_phone: Option<String>,
    pub active: bool,
}

/// A payments row exactly as persisted: an opaque JSON document plus the
/// store-maintained timestamps. Field names inside `doc` may drift; the
/// reconciler owns making sense of it.
#[derive(Debug, Clone)]
pub struct RawPayment {
    pub id: String,
    pub doc: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Append-only SMS delivery audit record. Created once per recipient per
/// mark-paid invocation; never mutated or deleted.
#[derive(Debug, Clone, Serialize)]
pub struct SmsLog {
    pub id: String,
    pub student_id: String,
    pub month: String,
    pub recipient_role: String,
    /// Normalized destination, or `None` when the raw number was invalid.
    pub to_phone: Option<String>,
    pub message: String,
    pub status: String,
    pub provider_response: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
}

/// Notification settings singleton, read per mark-paid invocation.
#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub coaching_name: String,
    pub sms_template: String,
    pub send_to_student: bool,
    pub send_to_guardian: bool,
    pub send_to_teacher: bool,
}

/// Which spelling of the student reference key is live in the payments
/// collection. Historical schemas wrote `studentId`, `studentid`, or
/// `studentID`; one spelling is detected per session and threaded through
/// every subsequent read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentField {
    CamelCase,
    LowerCase,
    UpperId,
}

impl StudentField {
    /// The JSON key as persisted.
    pub fn key(self) -> &'static str {
        match self {
            StudentField::CamelCase => "studentId",
            StudentField::LowerCase => "studentid",
            StudentField::UpperId => "studentID",
        }
    }

    /// `json_extract` path for equality filters on this key.
    pub fn json_path(self) -> String {
        format!("$.{}", self.key())
    }

    /// Detect the live key from the first document of a batch; an empty
    /// batch falls back to the primary spelling.
    pub fn detect(docs: &[RawPayment]) -> Self {
        let obj = match docs.first().and_then(|d| d.doc.as_object()) {
            Some(obj) => obj,
            None => return StudentField::CamelCase,
        };
        if obj.contains_key("studentId") {
            StudentField::CamelCase
        } else if obj.contains_key("studentid") {
            StudentField::LowerCase
        } else if obj.contains_key("studentID") {
            StudentField::UpperId
        } else {
            StudentField::CamelCase
        }
    }
}

/// Parse a store timestamp. The store writes either `CURRENT_TIMESTAMP`
/// text ("%Y-%m-%d %H:%M:%S") or RFC 3339 strings.
pub fn parse_store_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|n| n.and_utc())
}
