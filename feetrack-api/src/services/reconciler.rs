//! Payment reconciliation
//!
//! Raw payment rows may be duplicated for the same (student, month) and may
//! spell the student reference key three different ways. A [`PaymentLedger`]
//! is rebuilt in full from a store snapshot on every load - never patched
//! incrementally - and exposes exactly one winner per (student, month) key.

use chrono::{DateTime, Utc};
use feetrack_common::db::models::{RawPayment, StudentField};
use feetrack_common::db::queries;
use feetrack_common::{month, Result};
use sqlx::SqlitePool;
use std::collections::HashMap;

/// Authoritative paid/unpaid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Paid,
    Unpaid,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Unpaid => "unpaid",
        }
    }

    /// Case-insensitive; anything other than exactly `paid` is unpaid.
    pub fn from_raw(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("paid") {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Unpaid
        }
    }
}

/// One payment row after normalization. In-memory only; never persisted.
#[derive(Debug, Clone)]
pub struct NormalizedPayment {
    pub id: String,
    pub student_id: String,
    pub month: String,
    pub status: PaymentStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl NormalizedPayment {
    /// Last-known update instant: update timestamp, else creation.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }

    fn tiebreak_instant(&self) -> i64 {
        self.last_update().map(|t| t.timestamp_millis()).unwrap_or(0)
    }
}

/// Map a raw document through the month and status normalizers. Returns
/// `None` - the record is excluded from the view - when the student id or
/// month cannot be recovered.
pub fn normalize_payment(raw: &RawPayment, field: StudentField) -> Option<NormalizedPayment> {
    let obj = raw.doc.as_object()?;

    // Detected key first, then the historical spellings.
    let student_id = [field.key(), "studentId", "studentid", "studentID"]
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(json_string)?;

    let month_key = obj
        .get("month")
        .and_then(json_string)
        .and_then(|m| month::normalize_month_key(&m))?;

    let status = obj
        .get("status")
        .and_then(json_string)
        .map(|s| PaymentStatus::from_raw(&s))
        .unwrap_or(PaymentStatus::Unpaid);

    Some(NormalizedPayment {
        id: raw.id.clone(),
        student_id,
        month: month_key,
        status,
        created_at: raw.created_at,
        updated_at: raw.updated_at,
    })
}

fn json_string(value: &serde_json::Value) -> Option<String> {
    let s = match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Deterministic duplicate collapse: paid beats unpaid regardless of
/// timestamps; among equals the later of (update, creation) instant wins,
/// exact ties to the second operand. Pairwise application is
/// order-independent for the final winner.
pub fn pick_best(a: NormalizedPayment, b: NormalizedPayment) -> NormalizedPayment {
    let a_paid = a.status == PaymentStatus::Paid;
    let b_paid = b.status == PaymentStatus::Paid;

    if a_paid != b_paid {
        return if b_paid { b } else { a };
    }

    if b.tiebreak_instant() >= a.tiebreak_instant() {
        b
    } else {
        a
    }
}

/// Read-only reconciled view keyed by (student_id, month).
#[derive(Debug)]
pub struct PaymentLedger {
    student_field: StudentField,
    entries: HashMap<(String, String), NormalizedPayment>,
}

impl PaymentLedger {
    /// Collapse a store snapshot into the reconciled view. The snapshot is
    /// expected in descending update order so key detection sees the most
    /// recently written document first.
    pub fn build(raw: Vec<RawPayment>) -> Self {
        let student_field = StudentField::detect(&raw);
        let mut entries: HashMap<(String, String), NormalizedPayment> = HashMap::new();
        let mut dropped = 0usize;

        for record in &raw {
            let payment = match normalize_payment(record, student_field) {
                Some(p) => p,
                None => {
                    dropped += 1;
                    continue;
                }
            };
            let key = (payment.student_id.clone(), payment.month.clone());
            match entries.remove(&key) {
                Some(existing) => {
                    entries.insert(key, pick_best(existing, payment));
                }
                None => {
                    entries.insert(key, payment);
                }
            }
        }

        if dropped > 0 {
            tracing::debug!(dropped, "Excluded unparseable payment rows from reconciled view");
        }

        PaymentLedger {
            student_field,
            entries,
        }
    }

    /// Rebuild from the live store.
    pub async fn load(pool: &SqlitePool) -> Result<Self> {
        let raw = queries::fetch_payments_desc(pool, queries::PAGE_LIMIT).await?;
        Ok(Self::build(raw))
    }

    pub fn student_field(&self) -> StudentField {
        self.student_field
    }

    pub fn get(&self, student_id: &str, month: &str) -> Option<&NormalizedPayment> {
        self.entries
            .get(&(student_id.to_string(), month.to_string()))
    }

    pub fn entries(&self) -> impl Iterator<Item = &NormalizedPayment> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Detect the live student-reference key from the most recently updated
/// document; an empty collection falls back to the primary spelling.
pub async fn detect_student_field(pool: &SqlitePool) -> Result<StudentField> {
    let latest = queries::fetch_payments_desc(pool, 1).await?;
    Ok(StudentField::detect(&latest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(secs: i64) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(secs, 0)
    }

    fn raw(id: &str, doc: serde_json::Value, updated_secs: i64) -> RawPayment {
        RawPayment {
            id: id.to_string(),
            doc,
            created_at: at(updated_secs),
            updated_at: at(updated_secs),
        }
    }

    fn winner_id(ledger: &PaymentLedger, student: &str, month: &str) -> String {
        ledger.get(student, month).expect("entry").id.clone()
    }

    #[test]
    fn test_status_normalization() {
        assert_eq!(PaymentStatus::from_raw("paid"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_raw(" PAID "), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_raw("Paid"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_raw("pending"), PaymentStatus::Unpaid);
        assert_eq!(PaymentStatus::from_raw(""), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_normalize_tolerates_drifted_key_and_month() {
        let record = raw("p1", json!({"studentID": "s1", "month": "Jan 2026", "status": "PAID"}), 10);
        let p = normalize_payment(&record, StudentField::CamelCase).expect("normalizes");
        assert_eq!(p.student_id, "s1");
        assert_eq!(p.month, "2026-01");
        assert_eq!(p.status, PaymentStatus::Paid);
    }

    #[test]
    fn test_normalize_drops_bad_month_and_missing_student() {
        let record = raw("p1", json!({"studentId": "s1", "month": "banana"}), 10);
        assert!(normalize_payment(&record, StudentField::CamelCase).is_none());

        let record = raw("p2", json!({"month": "2026-01", "status": "paid"}), 10);
        assert!(normalize_payment(&record, StudentField::CamelCase).is_none());

        let record = raw("p3", json!({"studentId": "  ", "month": "2026-01"}), 10);
        assert!(normalize_payment(&record, StudentField::CamelCase).is_none());
    }

    #[test]
    fn test_paid_beats_unpaid_regardless_of_age() {
        let old_paid = raw("old-paid", json!({"studentId": "s1", "month": "2026-01", "status": "paid"}), 100);
        let new_unpaid = raw("new-unpaid", json!({"studentId": "s1", "month": "2026-01", "status": "unpaid"}), 900);

        let ledger = PaymentLedger::build(vec![old_paid, new_unpaid]);
        assert_eq!(winner_id(&ledger, "s1", "2026-01"), "old-paid");
        assert_eq!(ledger.get("s1", "2026-01").unwrap().status, PaymentStatus::Paid);
    }

    #[test]
    fn test_newer_wins_among_same_status() {
        let older = raw("older", json!({"studentId": "s1", "month": "2026-01", "status": "unpaid"}), 100);
        let newer = raw("newer", json!({"studentId": "s1", "month": "2026-01", "status": "unpaid"}), 900);

        let ledger = PaymentLedger::build(vec![newer.clone(), older.clone()]);
        assert_eq!(winner_id(&ledger, "s1", "2026-01"), "newer");

        let ledger = PaymentLedger::build(vec![older, newer]);
        assert_eq!(winner_id(&ledger, "s1", "2026-01"), "newer");
    }

    #[test]
    fn test_reconciliation_is_order_independent() {
        let a = raw("a", json!({"studentId": "s1", "month": "2026-01", "status": "unpaid"}), 100);
        let b = raw("b", json!({"studentId": "s1", "month": "2026-01", "status": "paid"}), 50);
        let c = raw("c", json!({"studentId": "s1", "month": "2026-01", "status": "paid"}), 200);

        let orderings: Vec<Vec<RawPayment>> = vec![
            vec![a.clone(), b.clone(), c.clone()],
            vec![a.clone(), c.clone(), b.clone()],
            vec![b.clone(), a.clone(), c.clone()],
            vec![b.clone(), c.clone(), a.clone()],
            vec![c.clone(), a.clone(), b.clone()],
            vec![c.clone(), b.clone(), a.clone()],
        ];

        for ordering in orderings {
            let ledger = PaymentLedger::build(ordering);
            assert_eq!(ledger.len(), 1);
            // "c" is the newest paid record; it must win from any order.
            assert_eq!(winner_id(&ledger, "s1", "2026-01"), "c");
        }
    }

    #[test]
    fn test_reconciliation_is_a_fixed_point() {
        let records = vec![
            raw("a", json!({"studentId": "s1", "month": "2026-01", "status": "paid"}), 100),
            raw("b", json!({"studentId": "s1", "month": "2026-1", "status": "unpaid"}), 900),
            raw("c", json!({"studentId": "s2", "month": "Feb 2026", "status": "unpaid"}), 300),
        ];

        let first = PaymentLedger::build(records);

        // Feed the winners back through reconciliation.
        let round_trip: Vec<RawPayment> = first
            .entries()
            .map(|p| RawPayment {
                id: p.id.clone(),
                doc: json!({
                    "studentId": p.student_id,
                    "month": p.month,
                    "status": p.status.as_str(),
                }),
                created_at: p.created_at,
                updated_at: p.updated_at,
            })
            .collect();
        let second = PaymentLedger::build(round_trip);

        assert_eq!(first.len(), second.len());
        for p in first.entries() {
            let q = second.get(&p.student_id, &p.month).expect("kept");
            assert_eq!(p.id, q.id);
            assert_eq!(p.status, q.status);
        }
    }

    #[test]
    fn test_duplicate_months_in_drifted_shapes_collapse() {
        // Same logical key spelled three ways across generations.
        let records = vec![
            raw("a", json!({"studentid": "s1", "month": "2026-01", "status": "unpaid"}), 100),
            raw("b", json!({"studentid": "s1", "month": "2026-1", "status": "unpaid"}), 200),
            raw("c", json!({"studentid": "s1", "month": "Jan 2026", "status": "paid"}), 50),
        ];

        let ledger = PaymentLedger::build(records);
        assert_eq!(ledger.student_field(), StudentField::LowerCase);
        assert_eq!(ledger.len(), 1);
        assert_eq!(winner_id(&ledger, "s1", "2026-01"), "c");
    }

    #[test]
    fn test_missing_timestamps_lose_to_any_timestamp() {
        let dated = RawPayment {
            id: "dated".to_string(),
            doc: json!({"studentId": "s1", "month": "2026-01", "status": "unpaid"}),
            created_at: at(100),
            updated_at: None,
        };
        let undated = RawPayment {
            id: "undated".to_string(),
            doc: json!({"studentId": "s1", "month": "2026-01", "status": "unpaid"}),
            created_at: None,
            updated_at: None,
        };

        let ledger = PaymentLedger::build(vec![undated, dated]);
        assert_eq!(winner_id(&ledger, "s1", "2026-01"), "dated");
    }
}
