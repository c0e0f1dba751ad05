use std::sync::{Arc, OnceLock};

use regex::Regex;
use teloxide::prelude::*;
use teloxide::types::UserId;
use tracing::{debug, error, info, warn};

use crate::auth::CommandRisk;
use crate::error::Result;
use crate::i18n;

use super::bot::{App, Outbox};
use super::deploy::{handle_backup_command, handle_restart_command, handle_update_command};
use super::logs::{handle_logs_command, DEFAULT_LOG_LINES};
use super::system::{handle_disk_command, handle_help_command, handle_status_command};

/// A recognized operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpsCommand {
    Help,
    Status,
    Logs(u32),
    Restart,
    Update,
    Backup,
    Disk,
}

/// Cached pattern: `/name[@bot] [args]`
fn command_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?s)^/([A-Za-z]+)(?:@\w+)?(?:\s+(.*))?$").expect("Invalid command regex")
    })
}

fn parse_line_count(args: Option<&str>) -> u32 {
    let digits: String = args
        .unwrap_or("")
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_LOG_LINES)
}

impl OpsCommand {
    /// Map message text to a command. Anything unrecognized yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = command_regex().captures(text.trim())?;
        let name = caps.get(1)?.as_str().to_ascii_lowercase();
        let args = caps.get(2).map(|m| m.as_str());
        let command = match name.as_str() {
            "help" | "start" => OpsCommand::Help,
            "status" => OpsCommand::Status,
            "logs" => OpsCommand::Logs(parse_line_count(args)),
            "restart" => OpsCommand::Restart,
            "update" => OpsCommand::Update,
            "backup" => OpsCommand::Backup,
            "disk" => OpsCommand::Disk,
            _ => return None,
        };
        Some(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpsCommand::Help => "help",
            OpsCommand::Status => "status",
            OpsCommand::Logs(_) => "logs",
            OpsCommand::Restart => "restart",
            OpsCommand::Update => "update",
            OpsCommand::Backup => "backup",
            OpsCommand::Disk => "disk",
        }
    }

    pub fn risk(&self) -> CommandRisk {
        match self {
            OpsCommand::Restart | OpsCommand::Update | OpsCommand::Backup => {
                CommandRisk::Destructive
            }
            _ => CommandRisk::ReadOnly,
        }
    }
}

/// Entry point: start the Telegram bot with long polling.
pub async fn run_bot(bot: Bot, app: Arc<App>) {
    let commands = vec![
        teloxide::types::BotCommand::new("status", "Server and container status"),
        teloxide::types::BotCommand::new("logs", "Last N log lines"),
        teloxide::types::BotCommand::new("update", "Update to the latest version"),
        teloxide::types::BotCommand::new("backup", "Create a backup"),
        teloxide::types::BotCommand::new("restart", "Restart the container"),
        teloxide::types::BotCommand::new("disk", "Disk space usage"),
        teloxide::types::BotCommand::new("help", "Show help"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!(error = %e, "Failed to set bot commands");
    }

    let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let app = Arc::clone(&app);
        async move {
            let sender = msg.from.as_ref().map(|u| u.id);
            let text = msg.text().unwrap_or("").to_string();
            let chat_id = msg.chat.id;
            // Long workflows must not stall polling
            tokio::spawn(async move {
                if let Err(e) = handle_message(&bot, &app, chat_id, sender, &text).await {
                    error!(chat_id = chat_id.0, error = %e, "failed to reply");
                }
            });
            respond(())
        }
    });

    info!("Bot started and waiting for commands...");
    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {
            debug!("ignored non-message update");
        })
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .build()
        .dispatch()
        .await;
}

/// Gate, parse and route one inbound message.
pub(super) async fn handle_message(
    outbox: &dyn Outbox,
    app: &App,
    chat_id: ChatId,
    sender: Option<UserId>,
    text: &str,
) -> Result<()> {
    if !app.gate.admits(sender) {
        return Ok(());
    }
    let Some(command) = OpsCommand::parse(text) else {
        return Ok(());
    };
    info!(command = command.name(), chat_id = chat_id.0, "◀ command");

    match command.risk() {
        CommandRisk::ReadOnly => route(outbox, app, chat_id, command).await,
        CommandRisk::Destructive => {
            let _guard = match app.operations.try_acquire(command.name()) {
                Ok(guard) => guard,
                Err(running) => {
                    warn!(command = command.name(), running, "rejected: operation in progress");
                    let busy = i18n::MSG_BUSY.replace("{command}", running);
                    outbox.send_text(chat_id, &busy, None).await?;
                    return Ok(());
                }
            };
            route(outbox, app, chat_id, command).await
        }
    }
}

async fn route(outbox: &dyn Outbox, app: &App, chat_id: ChatId, command: OpsCommand) -> Result<()> {
    match command {
        OpsCommand::Help => handle_help_command(outbox, chat_id, app).await,
        OpsCommand::Status => handle_status_command(outbox, chat_id, app).await,
        OpsCommand::Logs(lines) => handle_logs_command(outbox, chat_id, lines, app).await,
        OpsCommand::Restart => handle_restart_command(outbox, chat_id, app).await,
        OpsCommand::Update => handle_update_command(outbox, chat_id, app).await,
        OpsCommand::Backup => handle_backup_command(outbox, chat_id, app).await,
        OpsCommand::Disk => handle_disk_command(outbox, chat_id, app).await,
    }
}
