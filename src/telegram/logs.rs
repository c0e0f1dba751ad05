use std::path::{Path, PathBuf};
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, warn};

use crate::error::Result;
use crate::i18n;

use super::bot::{App, Outbox};
use super::streaming::{html_escape, truncate_chars};

pub(super) const DEFAULT_LOG_LINES: u32 = 50;
const LOGS_TIMEOUT: Duration = Duration::from_secs(30);
/// Logs whose escaped form is longer than this (in chars) are delivered as a file.
const INLINE_LOG_LIMIT: usize = 3900;
/// Inline logs are cut to this many chars.
const INLINE_LOG_TRUNCATE: usize = 3800;

fn log_file_path(dir: &Path, container: &str) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    dir.join(format!("{}_logs_{}.txt", container, millis))
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temporary log file"),
    }
}

/// Handle /logs [N] - tail the container log inline or as a file
pub(super) async fn handle_logs_command(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    lines: u32,
    app: &App,
) -> Result<()> {
    let container = &app.config.container;
    outbox
        .send_text(
            chat_id,
            &format!("⏳ Fetching the last {} log lines...", lines),
            None,
        )
        .await?;

    let command = format!("docker logs {} --tail {} 2>&1", container, lines);
    let logs = match app.runner.run(&command, LOGS_TIMEOUT).await {
        Ok(logs) => logs,
        Err(e) => {
            outbox
                .send_text(chat_id, &format!("❌ Failed to fetch logs: {}", e), None)
                .await?;
            return Ok(());
        }
    };

    if logs.trim().is_empty() {
        outbox.send_text(chat_id, i18n::MSG_LOGS_EMPTY, None).await?;
        return Ok(());
    }

    // Entities grow `<`, `>` and `&` up to five-fold
    if html_escape(&logs).chars().count() > INLINE_LOG_LIMIT {
        return send_logs_file(outbox, chat_id, &std::env::temp_dir(), container, lines, &logs).await;
    }

    let text = format!(
        "📋 <b>{} logs:</b>\n<pre>{}</pre>",
        html_escape(container),
        html_escape(truncate_chars(&logs, INLINE_LOG_TRUNCATE))
    );
    outbox
        .send_text(chat_id, &text, Some(ParseMode::Html))
        .await?;
    Ok(())
}

/// Write `logs` to a temp file in `dir`, send it as a document, then remove it.
async fn send_logs_file(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    dir: &Path,
    container: &str,
    lines: u32,
    logs: &str,
) -> Result<()> {
    let path = log_file_path(dir, container);
    if let Err(e) = tokio::fs::write(&path, logs).await {
        warn!(path = %path.display(), error = %e, "failed to write log file");
        discard(&path).await;
        outbox
            .send_text(chat_id, &format!("❌ Failed to fetch logs: {}", e), None)
            .await?;
        return Ok(());
    }
    debug!(path = %path.display(), bytes = logs.len(), "sending logs as file");

    let caption = format!("📋 Last {} lines of {} logs", lines, container);
    let sent = outbox.send_file(chat_id, &path, &caption).await;
    discard(&path).await;
    sent
}
