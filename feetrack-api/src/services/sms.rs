//! SMS gateway client
//!
//! One HTTP POST per recipient with bearer-token auth. The response body is
//! returned verbatim, success or failure, so the dispatcher can persist it
//! as the audit trail.

use feetrack_common::config::GatewayConfig;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Per-request ceiling; the orchestrator bounds the whole notification step
/// separately.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// SMS gateway client errors. Always scoped to a single recipient; never
/// propagated past the dispatch boundary.
#[derive(Debug, Error)]
pub enum SmsError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Gateway error {0}: {1}")]
    Gateway(u16, String),
}

impl SmsError {
    /// Verbatim text to persist in the audit log.
    pub fn audit_text(&self) -> String {
        match self {
            SmsError::Network(msg) => msg.clone(),
            SmsError::Gateway(_, body) => body.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendSmsBody<'a> {
    device_id: &'a str,
    phone: &'a str,
    message: &'a str,
}

/// SMS gateway client
pub struct SmsClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl SmsClient {
    pub fn new(config: GatewayConfig) -> Result<Self, SmsError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SmsError::Network(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Send one message to one normalized number.
    ///
    /// Returns the provider response body on 2xx; any other outcome is an
    /// error for this recipient only, carrying whatever the gateway said.
    pub async fn send(&self, phone: &str, message: &str) -> Result<String, SmsError> {
        let url = format!("{}/sms/send", self.config.base_url.trim_end_matches('/'));

        tracing::debug!(phone, "Dispatching SMS");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&SendSmsBody {
                device_id: &self.config.device_id,
                phone,
                message,
            })
            .send()
            .await
            .map_err(|e| SmsError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(SmsError::Gateway(status.as_u16(), body));
        }

        Ok(body)
    }
}
