use teloxide::types::UserId;
use tracing::warn;

/// Risk classification for bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRisk {
    /// Read-only queries: /help, /status, /logs, /disk
    ReadOnly,
    /// Touches the running deployment: /restart, /update, /backup
    Destructive,
}

/// Single-operator authorization: exactly one Telegram user may issue commands.
#[derive(Debug, Clone)]
pub struct Gate {
    authorized: String,
}

impl Gate {
    pub fn new(authorized: &str) -> Self {
        Self {
            authorized: authorized.trim().to_string(),
        }
    }

    /// Whether `sender` is the configured operator. Rejections are logged.
    pub fn admits(&self, sender: Option<UserId>) -> bool {
        let Some(sender) = sender else {
            // No user info (e.g. channel post)
            warn!("Unauthorized access attempt without sender");
            return false;
        };
        let user_id = sender.0.to_string();
        let authorized = user_id == self.authorized;
        if !authorized {
            warn!(user_id = %user_id, "Unauthorized access attempt");
        }
        authorized
    }
}
