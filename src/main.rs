mod auth;
mod config;
mod error;
mod i18n;
mod logging;
mod release;
mod shell;
mod telegram;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use teloxide::prelude::*;
use tracing::{error, info};

use config::{Cli, Config};
use release::GithubReleases;
use shell::ShellRunner;

async fn validate_telegram_token(token: &str) -> Result<()> {
    let url = format!("https://api.telegram.org/bot{}/getMe", token);
    let resp = reqwest::get(&url)
        .await
        .context("Failed to call Telegram getMe API")?;
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        anyhow::bail!(
            "Telegram token validation failed (HTTP {}): {}",
            status,
            body
        );
    }

    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let ok = parsed.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    if !ok {
        anyhow::bail!("Telegram token validation failed: {}", body);
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init();

    let cli = Cli::parse();
    let config = match Config::from_cli(cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Missing required environment variables (TG_BOT_TOKEN, TG_USER_ID)");
            return Err(e).context("invalid startup configuration");
        }
    };

    validate_telegram_token(&config.bot_token).await?;

    let runner = Arc::new(ShellRunner::new(&config.work_dir));
    let releases = Arc::new(
        GithubReleases::new(&config.release_url).context("failed to build release client")?,
    );
    let app = Arc::new(telegram::App::new(config.clone(), runner, releases));

    info!("========================================");
    info!("  {} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!(authorized_user = %config.authorized_user, "Authorized user ID");
    info!(work_dir = %config.work_dir.display(), container = %config.container, "Deployment directory");

    let bot = Bot::new(&config.bot_token);

    // In-flight handlers are not awaited on shutdown
    tokio::select! {
        _ = telegram::run_bot(bot, app) => {}
        _ = shutdown_signal() => {
            info!("Shutting down bot...");
        }
    }

    Ok(())
}
