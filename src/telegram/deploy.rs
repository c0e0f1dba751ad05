use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::i18n;
use crate::shell::{Reading, DEFAULT_TIMEOUT};

use super::bot::{App, Outbox};
use super::streaming::{html_escape, send_long_message};

const RESTART_TIMEOUT: Duration = Duration::from_secs(120);
const RESTART_SETTLE: Duration = Duration::from_secs(15);
const BACKUP_TIMEOUT: Duration = Duration::from_secs(300);
const STOP_TIMEOUT: Duration = Duration::from_secs(60);
const BUILD_TIMEOUT: Duration = Duration::from_secs(600);
const START_TIMEOUT: Duration = Duration::from_secs(120);
const UPDATE_SETTLE: Duration = Duration::from_secs(20);
const PRUNE_TIMEOUT: Duration = Duration::from_secs(60);

/// `docker ps` status prefix of a running container.
const RUNNING_MARKER: &str = "Up";

fn backup_command(app: &App) -> String {
    format!("{} 2>&1", app.config.backup_script.display())
}

/// Handle /restart - restart, wait for the container, then report its status
pub(super) async fn handle_restart_command(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    app: &App,
) -> Result<()> {
    let container = &app.config.container;
    outbox
        .send_text(chat_id, &i18n::with_app(i18n::MSG_RESTARTING, container), None)
        .await?;

    let restarted = app
        .runner
        .run(&format!("docker restart {}", container), RESTART_TIMEOUT)
        .await;
    if let Err(e) = restarted {
        outbox
            .send_text(chat_id, &format!("❌ Restart failed: {}", e), None)
            .await?;
        return Ok(());
    }

    tokio::time::sleep(RESTART_SETTLE).await;

    let status = match app
        .runner
        .run(&app.config.container_status_command(), DEFAULT_TIMEOUT)
        .await
    {
        Ok(status) => status,
        Err(e) => {
            outbox
                .send_text(chat_id, &format!("❌ Restart failed: {}", e), None)
                .await?;
            return Ok(());
        }
    };
    let status = status.trim();

    let text = if status.contains(RUNNING_MARKER) {
        info!(container = %container, status, "restart complete");
        format!("✅ {} restarted successfully\n📊 Status: {}", container, status)
    } else {
        warn!(container = %container, status, "container not running after restart");
        format!(
            "⚠️ {} restarted, but its status is: {}\n\nCheck the logs: /logs",
            container, status
        )
    };
    outbox.send_text(chat_id, &text, None).await?;
    Ok(())
}

/// Handle /backup - run the backup script and show the newest archive
pub(super) async fn handle_backup_command(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    app: &App,
) -> Result<()> {
    outbox
        .send_text(chat_id, i18n::MSG_BACKUP_STARTED, None)
        .await?;

    if let Err(e) = app.runner.run(&backup_command(app), BACKUP_TIMEOUT).await {
        outbox
            .send_text(chat_id, &format!("❌ Backup failed: {}", e), None)
            .await?;
        return Ok(());
    }

    let listing = format!(
        "ls -lh {}/backups/*.tar.gz* 2>/dev/null | tail -1",
        app.config.work_dir.display()
    );
    let latest = Reading::from_result(app.runner.run(&listing, DEFAULT_TIMEOUT).await);

    let text = format!(
        "✅ <b>Backup created successfully!</b>\n\n📁 {}",
        html_escape(latest.or(i18n::MSG_BACKUP_FILE_FALLBACK))
    );
    send_long_message(outbox, chat_id, &text, Some(ParseMode::Html)).await
}

/// Handle /update - stop, rebuild and restart the compose service
pub(super) async fn handle_update_command(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    app: &App,
) -> Result<()> {
    match run_update(outbox, chat_id, app).await {
        Ok(()) => Ok(()),
        Err(UpdateError::Step(e)) => {
            error!(error = %e, "update failed");
            let text = format!(
                "❌ <b>Update failed</b>\n\n{}\n\nTry running it manually:\n<code>{}</code>",
                html_escape(&e.to_string()),
                html_escape(&app.config.manual_update_hint())
            );
            outbox
                .send_text(chat_id, &text, Some(ParseMode::Html))
                .await?;
            Ok(())
        }
        Err(UpdateError::Send(e)) => Err(e),
    }
}

/// Separates a failed workflow step from a failed chat send.
enum UpdateError {
    Step(crate::error::Error),
    Send(crate::error::Error),
}

async fn notify(outbox: &dyn Outbox, chat_id: ChatId, text: &str) -> std::result::Result<(), UpdateError> {
    outbox
        .send_text(chat_id, text, None)
        .await
        .map(|_| ())
        .map_err(UpdateError::Send)
}

async fn notify_html(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    text: &str,
) -> std::result::Result<(), UpdateError> {
    outbox
        .send_text(chat_id, text, Some(ParseMode::Html))
        .await
        .map(|_| ())
        .map_err(UpdateError::Send)
}

async fn required_step(app: &App, command: &str, timeout: Duration) -> std::result::Result<(), UpdateError> {
    info!(command, "update step");
    app.runner
        .run(command, timeout)
        .await
        .map(|_| ())
        .map_err(UpdateError::Step)
}

async fn current_version(app: &App) -> Reading {
    let version = Reading::from_result(
        app.runner
            .run(&app.config.version_command(), DEFAULT_TIMEOUT)
            .await,
    );
    if version == Reading::Unavailable {
        warn!("could not determine the running version");
    }
    version
}

async fn run_update(outbox: &dyn Outbox, chat_id: ChatId, app: &App) -> std::result::Result<(), UpdateError> {
    let name = &app.config.container;
    let service = &app.config.compose_service;

    // 1. versions
    notify(outbox, chat_id, &i18n::with_app(i18n::MSG_UPDATE_CHECKING, name)).await?;
    let (current, latest) = tokio::join!(current_version(app), app.releases.latest_version());
    let latest = match latest {
        Ok(v) => Reading::Value(v),
        Err(e) => {
            warn!(error = %e, "could not determine the latest version");
            Reading::Unavailable
        }
    };
    notify_html(
        outbox,
        chat_id,
        &format!(
            "📦 Current version: <b>{}</b>\n🆕 Latest version: <b>{}</b>",
            html_escape(current.or(i18n::UNKNOWN)),
            html_escape(latest.or(i18n::UNKNOWN))
        ),
    )
    .await?;

    // 2. nothing to do
    if let (Some(cur), Some(new)) = (current.value(), latest.value()) {
        if cur == new {
            notify(outbox, chat_id, i18n::MSG_UPDATE_UP_TO_DATE).await?;
            return Ok(());
        }
    }

    // 3. backup (best-effort)
    notify(outbox, chat_id, i18n::MSG_UPDATE_BACKUP).await?;
    match app.runner.run(&backup_command(app), BACKUP_TIMEOUT).await {
        Ok(_) => notify(outbox, chat_id, i18n::MSG_UPDATE_BACKUP_DONE).await?,
        Err(e) => {
            warn!(error = %e, "pre-update backup failed");
            notify(outbox, chat_id, i18n::MSG_UPDATE_BACKUP_FAILED).await?;
        }
    }

    // 4-6. stop, rebuild, start
    notify(outbox, chat_id, &i18n::with_app(i18n::MSG_UPDATE_STOPPING, name)).await?;
    required_step(app, &format!("docker compose stop {}", service), STOP_TIMEOUT).await?;

    notify(outbox, chat_id, &i18n::with_app(i18n::MSG_UPDATE_BUILDING, name)).await?;
    required_step(
        app,
        &format!("docker compose build --no-cache {}", service),
        BUILD_TIMEOUT,
    )
    .await?;

    notify(outbox, chat_id, &i18n::with_app(i18n::MSG_UPDATE_STARTING, name)).await?;
    required_step(app, &format!("docker compose up -d {}", service), START_TIMEOUT).await?;

    // 7. settle
    notify(outbox, chat_id, i18n::MSG_UPDATE_SETTLING).await?;
    tokio::time::sleep(UPDATE_SETTLE).await;

    // 8. new version
    let updated = current_version(app).await;

    // 9. cleanup, failure ignored
    notify(outbox, chat_id, i18n::MSG_UPDATE_PRUNING).await?;
    if let Err(e) = app.runner.run("docker image prune -f", PRUNE_TIMEOUT).await {
        warn!(error = %e, "image prune failed");
    }

    // 10. final status
    let status = Reading::from_result(
        app.runner
            .run(&app.config.container_status_command(), DEFAULT_TIMEOUT)
            .await,
    );
    let status_text = status.or(i18n::UNKNOWN);

    let text = if status_text.contains(RUNNING_MARKER) {
        info!(
            from = current.or(i18n::UNKNOWN),
            to = updated.or(i18n::UNKNOWN),
            "update complete"
        );
        format!(
            "✅ <b>Update completed successfully!</b>\n\n\
📦 Old version: {}\n\
🆕 New version: {}\n\
📊 Status: {}",
            html_escape(current.or(i18n::UNKNOWN)),
            html_escape(updated.or(i18n::UNKNOWN)),
            html_escape(status_text)
        )
    } else {
        warn!(status = status_text, "container not running after update");
        format!(
            "⚠️ <b>Update completed with a warning</b>\n\n\
The container may still be starting.\n\
Status: {}\n\n\
Check again in a minute: /status",
            html_escape(status_text)
        )
    };
    notify_html(outbox, chat_id, &text).await
}
