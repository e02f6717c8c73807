//! SMS delivery audit log browsing

use axum::{
    extract::{Query, State},
    Json,
};
use feetrack_common::db::models::SmsLog;
use feetrack_common::db::queries;
use feetrack_common::Error;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub month: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub total: usize,
    pub logs: Vec<SmsLog>,
}

/// GET /api/sms-logs[?month=YYYY-MM][&status=sent|failed]
pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    if let Some(status) = &query.status {
        if status != "sent" && status != "failed" {
            return Err(Error::InvalidInput(format!(
                "status must be 'sent' or 'failed', got {:?}",
                status
            ))
            .into());
        }
    }

    let logs =
        queries::list_sms_logs(&state.db, query.month.as_deref(), query.status.as_deref()).await?;

    Ok(Json(LogsResponse {
        total: logs.len(),
        logs,
    }))
}
