//! Payment view and mark-paid endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use feetrack_common::{month, Error};
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::services::{self, reconciler::PaymentLedger};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PaymentsQuery {
    pub month: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentView {
    pub student_id: String,
    pub month: String,
    pub status: &'static str,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct PaymentsResponse {
    pub total: usize,
    pub student_field: &'static str,
    pub payments: Vec<PaymentView>,
}

/// GET /api/payments[?month=YYYY-MM]
///
/// Rebuilds the reconciled view from the live store on every call; the
/// dashboard treats this as its only source of payment truth and never
/// patches it incrementally.
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<PaymentsResponse>, ApiError> {
    if let Some(m) = &query.month {
        if !month::is_canonical_month(m) {
            return Err(Error::InvalidInput(format!("month must be YYYY-MM, got {:?}", m)).into());
        }
    }

    let ledger = PaymentLedger::load(&state.db).await?;

    let mut payments: Vec<PaymentView> = ledger
        .entries()
        .filter(|p| query.month.as_deref().map_or(true, |m| p.month == m))
        .map(|p| PaymentView {
            student_id: p.student_id.clone(),
            month: p.month.clone(),
            status: p.status.as_str(),
            updated_at: p.last_update(),
        })
        .collect();
    payments.sort_by(|a, b| (&a.month, &a.student_id).cmp(&(&b.month, &b.student_id)));

    Ok(Json(PaymentsResponse {
        total: payments.len(),
        student_field: ledger.student_field().key(),
        payments,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    pub student_id: String,
    pub month: String,
    pub admin_email: String,
}

#[derive(Debug, Serialize)]
pub struct MarkPaidResponse {
    pub ok: bool,
    pub notified: bool,
}

/// POST /api/payments/mark-paid
pub async fn mark_paid(
    State(state): State<AppState>,
    Json(request): Json<MarkPaidRequest>,
) -> Result<Json<MarkPaidResponse>, ApiError> {
    let outcome = services::mark_paid::mark_paid(
        &state,
        &request.student_id,
        &request.month,
        &request.admin_email,
    )
    .await?;

    Ok(Json(MarkPaidResponse {
        ok: outcome.committed,
        notified: outcome.notified,
    }))
}
