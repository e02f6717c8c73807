//! Main entry point for feetrack-api.
//!
//! Initializes tracing, resolves deployment configuration, opens the store,
//! and serves the HTTP API.

use anyhow::Result;
use clap::Parser;
use feetrack_api::services::sms::SmsClient;
use feetrack_api::{build_router, AppState};
use feetrack_common::config::AppConfig;
use feetrack_common::db::init_database;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "feetrack-api",
    about = "Coaching fee tracking and SMS notification service"
)]
struct Cli {
    /// SQLite database path (overrides FEETRACK_DB / config file)
    #[arg(long)]
    db: Option<String>,

    /// Listen port (overrides FEETRACK_PORT / config file)
    #[arg(long)]
    port: Option<u16>,

    /// TOML config file path
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting feetrack-api v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = AppConfig::load(cli.db.as_deref(), cli.port, cli.config.as_deref())?;

    if config.admin_emails.is_empty() {
        warn!("Administrator allow-list is empty; every mark-paid request will be rejected");
    }
    if config.gateway.base_url.is_empty() {
        warn!("SMS gateway URL not configured; notification attempts will fail");
    }

    let pool = init_database(&config.db_path).await?;

    let sms = SmsClient::new(config.gateway.clone())?;
    let port = config.port;
    let state = AppState::new(pool, config, sms);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    info!("feetrack-api listening on http://127.0.0.1:{}", port);
    info!("Health check: http://127.0.0.1:{}/health", port);

    axum::serve(listener, app).await?;

    Ok(())
}
