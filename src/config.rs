use std::path::PathBuf;

use clap::Parser;

use crate::error::{Error, Result};

pub const DEFAULT_WORK_DIR: &str = "/opt/main";
pub const DEFAULT_RELEASE_URL: &str = "https://api.github.com/repos/n8n-io/n8n/releases/latest";

#[derive(Parser, Debug)]
#[command(version, about = "Telegram bot for operating a docker compose deployment")]
pub struct Cli {
    /// Telegram Bot token
    #[arg(long, env = "TG_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Telegram user ID allowed to issue commands
    #[arg(long, env = "TG_USER_ID")]
    pub user_id: Option<String>,

    /// Deployment directory (compose project, backup script, backups/)
    #[arg(long, env = "N8N_DIR", default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    /// Container inspected by /status, /logs and /restart
    #[arg(long, env = "BOT_CONTAINER", default_value = "n8n")]
    pub container: String,

    /// Compose service rebuilt by /update
    #[arg(long, env = "BOT_COMPOSE_SERVICE", default_value = "n8n")]
    pub compose_service: String,

    /// Binary inside the container that reports the app version
    #[arg(long, env = "BOT_APP_BINARY", default_value = "n8n")]
    pub app_binary: String,

    /// Backup script (default: <work_dir>/backup_n8n.sh)
    #[arg(long, env = "BOT_BACKUP_SCRIPT")]
    pub backup_script: Option<PathBuf>,

    /// Endpoint returning the latest release as JSON with a `tag_name` field
    #[arg(long, env = "BOT_RELEASE_URL", default_value = DEFAULT_RELEASE_URL)]
    pub release_url: String,
}

/// Process-wide settings, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub authorized_user: String,
    pub work_dir: PathBuf,
    pub container: String,
    pub compose_service: String,
    pub app_binary: String,
    pub backup_script: PathBuf,
    pub release_url: String,
}

fn required(value: Option<String>, env_var: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(Error::Config(format!(
            "missing required value {env_var} (required: TG_BOT_TOKEN, TG_USER_ID)"
        ))),
    }
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        let bot_token = required(cli.token, "TG_BOT_TOKEN")?;
        let authorized_user = required(cli.user_id, "TG_USER_ID")?;
        let backup_script = cli
            .backup_script
            .unwrap_or_else(|| cli.work_dir.join("backup_n8n.sh"));

        Ok(Self {
            bot_token,
            authorized_user,
            work_dir: cli.work_dir,
            container: cli.container,
            compose_service: cli.compose_service,
            app_binary: cli.app_binary,
            backup_script,
            release_url: cli.release_url,
        })
    }

    /// Shell snippet printing the app version from inside the running container.
    pub fn version_command(&self) -> String {
        format!(
            "docker exec {} {} --version 2>/dev/null",
            self.container, self.app_binary
        )
    }

    /// Shell snippet printing the container's `docker ps` status column.
    pub fn container_status_command(&self) -> String {
        format!(
            "docker ps --filter name={} --format \"{{{{.Status}}}}\"",
            self.container
        )
    }

    /// Command an operator can run by hand when the bot-driven update fails.
    pub fn manual_update_hint(&self) -> String {
        format!("cd {} && ./update_n8n.sh", self.work_dir.display())
    }
}

#[cfg(test)]
pub(crate) fn test_config(work_dir: &str) -> Config {
    Config {
        bot_token: "123:abc".to_string(),
        authorized_user: "42".to_string(),
        work_dir: PathBuf::from(work_dir),
        container: "n8n".to_string(),
        compose_service: "n8n".to_string(),
        app_binary: "n8n".to_string(),
        backup_script: PathBuf::from(work_dir).join("backup_n8n.sh"),
        release_url: DEFAULT_RELEASE_URL.to_string(),
    }
}
