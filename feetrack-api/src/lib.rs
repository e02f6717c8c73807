//! feetrack-api library - payment reconciliation and notification service
//!
//! Exposes the mark-paid operation, the reconciled payment view, the
//! student roster, and the SMS delivery audit log over HTTP.

use axum::Router;
use feetrack_common::config::AppConfig;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::services::sms::SmsClient;

pub mod api;
pub mod services;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Store connection pool
    pub db: SqlitePool,
    /// Deployment configuration (administrator allow-list, gateway credentials)
    pub config: Arc<AppConfig>,
    /// Shared SMS gateway client
    pub sms: Arc<SmsClient>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: AppConfig, sms: SmsClient) -> Self {
        Self {
            db,
            config: Arc::new(config),
            sms: Arc::new(sms),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post};

    Router::new()
        .route("/api/payments/mark-paid", post(api::payments::mark_paid))
        .route("/api/payments", get(api::payments::list_payments))
        .route(
            "/api/students",
            get(api::students::list_students).post(api::students::create_student),
        )
        .route("/api/students/:id", delete(api::students::delete_student))
        .route("/api/sms-logs", get(api::logs::list_logs))
        .route("/health", get(api::health::health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}
