use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId, ParseMode};

use crate::auth::Gate;
use crate::config::Config;
use crate::error::Result;
use crate::release::ReleaseFeed;
use crate::shell::CommandRunner;

/// Messages longer than this many chars are split before sending
pub(super) const MESSAGE_CHUNK_LIMIT: usize = 4000;

/// Outbound side of the chat transport.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<MessageId>;

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<()>;

    async fn send_file(&self, chat_id: ChatId, path: &Path, caption: &str) -> Result<()>;
}

#[async_trait]
impl Outbox for Bot {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<MessageId> {
        let mut req = self.send_message(chat_id, text);
        if let Some(mode) = parse_mode {
            req = req.parse_mode(mode);
        }
        Ok(req.await?.id)
    }

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<()> {
        let mut req = self.edit_message_text(chat_id, message_id, text);
        if let Some(mode) = parse_mode {
            req = req.parse_mode(mode);
        }
        req.await?;
        Ok(())
    }

    async fn send_file(&self, chat_id: ChatId, path: &Path, caption: &str) -> Result<()> {
        self.send_document(chat_id, InputFile::file(path))
            .caption(caption)
            .await?;
        Ok(())
    }
}

/// Single-flight guard for destructive operations (restart, update, backup).
#[derive(Default)]
pub(super) struct OperationLock {
    active: Mutex<Option<&'static str>>,
}

/// Releases the lock when dropped.
pub(super) struct OperationGuard<'a> {
    lock: &'a OperationLock,
}

impl OperationLock {
    /// Claim the lock for `name`. On contention returns the running operation's name.
    pub(super) fn try_acquire(&self, name: &'static str) -> std::result::Result<OperationGuard<'_>, &'static str> {
        let mut active = match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match *active {
            Some(running) => Err(running),
            None => {
                *active = Some(name);
                Ok(OperationGuard { lock: self })
            }
        }
    }
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut active = match self.lock.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *active = None;
    }
}

/// Everything a handler needs. Immutable apart from the operation lock.
pub struct App {
    pub config: Arc<Config>,
    pub runner: Arc<dyn CommandRunner>,
    pub releases: Arc<dyn ReleaseFeed>,
    pub(super) gate: Gate,
    pub(super) operations: OperationLock,
}

impl App {
    pub fn new(
        config: Arc<Config>,
        runner: Arc<dyn CommandRunner>,
        releases: Arc<dyn ReleaseFeed>,
    ) -> Self {
        let gate = Gate::new(&config.authorized_user);
        Self {
            config,
            runner,
            releases,
            gate,
            operations: OperationLock::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_rejects_second_operation() {
        let lock = OperationLock::default();
        let first = lock.try_acquire("update");
        assert!(first.is_ok());
        assert_eq!(lock.try_acquire("restart").err(), Some("update"));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let lock = OperationLock::default();
        {
            let _guard = lock.try_acquire("backup");
        }
        assert!(lock.try_acquire("restart").is_ok());
    }
}
