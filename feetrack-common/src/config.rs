//! Configuration loading
//!
//! Deployment configuration (store path, bind port, administrator
//! allow-list, SMS gateway credentials) resolves per key in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Default listen port for feetrack-api.
pub const DEFAULT_PORT: u16 = 5730;

/// Resolved deployment configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub port: u16,
    /// Email addresses allowed to mark payments paid.
    pub admin_emails: Vec<String>,
    pub gateway: GatewayConfig,
}

/// SMS gateway endpoint and credentials.
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    pub device_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    db_path: Option<String>,
    port: Option<u16>,
    admin_emails: Option<Vec<String>>,
    #[serde(default)]
    gateway: GatewayFile,
}

#[derive(Debug, Default, Deserialize)]
struct GatewayFile {
    base_url: Option<String>,
    api_key: Option<String>,
    device_id: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments, the environment, and an
    /// optional TOML file.
    pub fn load(
        cli_db: Option<&str>,
        cli_port: Option<u16>,
        cli_config: Option<&str>,
    ) -> Result<Self> {
        let file = load_config_file(cli_config)?;

        let db_path = cli_db
            .map(PathBuf::from)
            .or_else(|| std::env::var("FEETRACK_DB").ok().map(PathBuf::from))
            .or_else(|| file.db_path.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("feetrack.db"));

        let port = cli_port
            .or_else(|| {
                std::env::var("FEETRACK_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
            })
            .or(file.port)
            .unwrap_or(DEFAULT_PORT);

        let admin_emails = std::env::var("ADMIN_EMAILS")
            .ok()
            .map(|v| split_emails(&v))
            .or_else(|| {
                file.admin_emails.map(|v| {
                    v.iter()
                        .map(|e| e.trim().to_string())
                        .filter(|e| !e.is_empty())
                        .collect()
                })
            })
            .unwrap_or_default();

        let gateway = GatewayConfig {
            base_url: std::env::var("SMS_GATEWAY_URL")
                .ok()
                .or(file.gateway.base_url)
                .unwrap_or_default(),
            api_key: std::env::var("SMS_GATEWAY_API_KEY")
                .ok()
                .or(file.gateway.api_key)
                .unwrap_or_default(),
            device_id: std::env::var("SMS_GATEWAY_DEVICE_ID")
                .ok()
                .or(file.gateway.device_id)
                .unwrap_or_default(),
        };

        Ok(AppConfig {
            db_path,
            port,
            admin_emails,
            gateway,
        })
    }

    /// True when `email` is on the administrator allow-list.
    pub fn is_admin(&self, email: &str) -> bool {
        self.admin_emails.iter().any(|e| e == email)
    }
}

/// Comma-separated list, entries trimmed, empties dropped.
fn split_emails(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect()
}

fn load_config_file(cli_path: Option<&str>) -> Result<ConfigFile> {
    let path = match cli_path
        .map(PathBuf::from)
        .or_else(|| std::env::var("FEETRACK_CONFIG").ok().map(PathBuf::from))
    {
        Some(p) => p,
        None => {
            let default = PathBuf::from("feetrack.toml");
            if !default.exists() {
                return Ok(ConfigFile::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
}
