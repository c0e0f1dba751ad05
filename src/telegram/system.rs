use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::error::Result;
use crate::i18n;
use crate::shell::{Reading, DEFAULT_TIMEOUT};

use super::bot::{App, Outbox};
use super::streaming::{html_escape, send_long_message};

const UPTIME_COMMAND: &str = "uptime -p";
const CONTAINERS_COMMAND: &str = "docker ps --format \"{{.Names}}: {{.Status}}\"";
const DISK_SUMMARY_COMMAND: &str = "df -h / | tail -1 | awk '{print $5\" used of \"$2}'";
const MEMORY_SUMMARY_COMMAND: &str = "free -h | grep Mem | awk '{print $3\" / \"$2}'";
const DISK_COMMAND: &str = "df -h /";
const DOCKER_DISK_COMMAND: &str = "docker system df";

/// Handle /help and /start
pub(super) async fn handle_help_command(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    app: &App,
) -> Result<()> {
    let help = i18n::with_app(i18n::HELP_TEXT_TEMPLATE, &app.config.container);
    outbox
        .send_text(chat_id, &help, Some(ParseMode::Html))
        .await?;
    Ok(())
}

pub(super) struct StatusReport {
    pub uptime: Reading,
    pub containers: Reading,
    pub disk: Reading,
    pub memory: Reading,
    pub version: Reading,
}

pub(super) fn format_status(app_name: &str, report: &StatusReport) -> String {
    let version = match report.version.value() {
        Some(v) => format!("v{}", html_escape(v)),
        None => i18n::NOT_AVAILABLE.to_string(),
    };
    format!(
        "📊 <b>Server status</b>\n\n\
⏱ Uptime: {}\n\
💾 Disk: {}\n\
🧠 RAM: {}\n\
📦 {}: {}\n\n\
<b>Containers:</b>\n\
<pre>{}</pre>",
        html_escape(report.uptime.or(i18n::NOT_AVAILABLE)),
        html_escape(report.disk.or(i18n::NOT_AVAILABLE)),
        html_escape(report.memory.or(i18n::NOT_AVAILABLE)),
        html_escape(app_name),
        version,
        html_escape(report.containers.or(i18n::NOT_AVAILABLE)),
    )
}

/// Handle /status - five independent queries, each degrading to N/A on its own
pub(super) async fn handle_status_command(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    app: &App,
) -> Result<()> {
    let placeholder = outbox
        .send_text(chat_id, i18n::MSG_STATUS_PENDING, None)
        .await?;

    let runner = app.runner.as_ref();
    let version_command = app.config.version_command();
    let (uptime, containers, disk, memory, version) = tokio::join!(
        runner.run(UPTIME_COMMAND, DEFAULT_TIMEOUT),
        runner.run(CONTAINERS_COMMAND, DEFAULT_TIMEOUT),
        runner.run(DISK_SUMMARY_COMMAND, DEFAULT_TIMEOUT),
        runner.run(MEMORY_SUMMARY_COMMAND, DEFAULT_TIMEOUT),
        runner.run(&version_command, DEFAULT_TIMEOUT),
    );

    let report = StatusReport {
        uptime: Reading::from_result(uptime),
        containers: Reading::from_result(containers),
        disk: Reading::from_result(disk),
        memory: Reading::from_result(memory),
        version: Reading::from_result(version),
    };

    let text = format_status(&app.config.container, &report);
    outbox
        .edit_text(chat_id, placeholder, &text, Some(ParseMode::Html))
        .await?;
    Ok(())
}

/// Handle /disk - system usage is required, docker usage is best-effort
pub(super) async fn handle_disk_command(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    app: &App,
) -> Result<()> {
    let runner = app.runner.as_ref();
    let (system, docker) = tokio::join!(
        runner.run(DISK_COMMAND, DEFAULT_TIMEOUT),
        runner.run(DOCKER_DISK_COMMAND, DEFAULT_TIMEOUT),
    );

    let system = match system {
        Ok(out) => out,
        Err(e) => {
            outbox
                .send_text(chat_id, &format!("❌ Error: {}", e), None)
                .await?;
            return Ok(());
        }
    };
    let docker = Reading::from_result(docker);

    let text = format!(
        "💾 <b>Disk space</b>\n\n\
<b>System:</b>\n<pre>{}</pre>\n\n\
<b>Docker:</b>\n<pre>{}</pre>",
        html_escape(system.trim()),
        html_escape(docker.or(i18n::NOT_AVAILABLE)),
    );
    send_long_message(outbox, chat_id, &text, Some(ParseMode::Html)).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;
    use crate::telegram::testing::{app_with, FakeOutbox, FakeRunner, Sent};

    const CHAT: ChatId = ChatId(42);

    #[tokio::test]
    async fn test_status_edits_placeholder_with_all_fields() {
        let runner = Arc::new(
            FakeRunner::default()
                .on("uptime", || Ok("up 3 days, 4 hours\n".into()))
                .on("docker ps", || Ok("n8n: Up 2 hours\npostgres: Up 3 days\n".into()))
                .on("df -h", || Ok("41% used of 80G\n".into()))
                .on("free -h", || Ok("1.2Gi / 3.8Gi\n".into()))
                .on("--version", || Ok("1.70.0\n".into())),
        );
        let app = app_with(runner.clone(), None);
        let outbox = FakeOutbox::default();

        let res = handle_status_command(&outbox, CHAT, &app).await;
        assert!(res.is_ok());

        let sent = outbox.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].text(), i18n::MSG_STATUS_PENDING);
        match &sent[1] {
            Sent::Edit { message_id, text } => {
                assert_eq!(*message_id, teloxide::types::MessageId(1));
                assert!(text.contains("up 3 days, 4 hours"));
                assert!(text.contains("41% used of 80G"));
                assert!(text.contains("1.2Gi / 3.8Gi"));
                assert!(text.contains("n8n: v1.70.0"));
                assert!(text.contains("postgres: Up 3 days"));
            }
            other => panic!("expected edit, got {:?}", other),
        }
        assert_eq!(runner.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_status_substitutes_failed_fields() {
        let runner = Arc::new(
            FakeRunner::default()
                .on("uptime", || Err(Error::TimedOut))
                .on("docker ps", || Ok("n8n: Up 2 hours".into()))
                .on("--version", || Err(Error::ExecutionFailed("No such container".into()))),
        );
        let app = app_with(runner, None);
        let outbox = FakeOutbox::default();

        assert!(handle_status_command(&outbox, CHAT, &app).await.is_ok());

        let text = outbox.last_text();
        assert!(text.contains("Uptime: N/A"));
        assert!(text.contains("n8n: N/A"));
        assert!(text.contains("n8n: Up 2 hours"));
    }

    #[test]
    fn test_format_status_escapes_output() {
        let report = StatusReport {
            uptime: Reading::Value("up 1 minute".into()),
            containers: Reading::Value("<weird>&name: Up".into()),
            disk: Reading::Unavailable,
            memory: Reading::Unavailable,
            version: Reading::Unavailable,
        };
        let text = format_status("n8n", &report);
        assert!(text.contains("&lt;weird&gt;&amp;name: Up"));
        assert!(text.contains("Disk: N/A"));
    }

    #[tokio::test]
    async fn test_disk_docker_failure_is_not_fatal() {
        let runner = Arc::new(
            FakeRunner::default()
                .on("docker system df", || Err(Error::ExecutionFailed("daemon down".into())))
                .on("df -h /", || Ok("Filesystem Size Used\n/dev/sda1 80G 33G\n".into())),
        );
        let app = app_with(runner, None);
        let outbox = FakeOutbox::default();

        assert!(handle_disk_command(&outbox, CHAT, &app).await.is_ok());

        let text = outbox.last_text();
        assert!(text.contains("/dev/sda1 80G 33G"));
        assert!(text.contains("<b>Docker:</b>\n<pre>N/A</pre>"));
    }

    #[tokio::test]
    async fn test_disk_system_failure_is_reported() {
        let runner = Arc::new(
            FakeRunner::default()
                .on("docker system df", || Ok("TYPE TOTAL".into()))
                .on("df -h /", || Err(Error::ExecutionFailed("df: not found".into()))),
        );
        let app = app_with(runner, None);
        let outbox = FakeOutbox::default();

        assert!(handle_disk_command(&outbox, CHAT, &app).await.is_ok());
        assert_eq!(outbox.texts(), vec!["❌ Error: df: not found".to_string()]);
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let app = app_with(Arc::new(FakeRunner::default()), None);
        let outbox = FakeOutbox::default();

        assert!(handle_help_command(&outbox, CHAT, &app).await.is_ok());
        let text = outbox.last_text();
        for cmd in ["/status", "/logs", "/update", "/backup", "/restart", "/disk", "/help"] {
            assert!(text.contains(cmd), "help is missing {}", cmd);
        }
    }
}
