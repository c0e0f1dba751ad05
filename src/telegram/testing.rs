//! In-memory doubles for the runner, release feed, and outbox.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use teloxide::types::{ChatId, MessageId, ParseMode};

use crate::config::{test_config, Config};
use crate::error::{Error, Result};
use crate::release::ReleaseFeed;
use crate::shell::CommandRunner;

use super::bot::{App, Outbox};

type Reply = std::result::Result<String, Error>;

/// Scripted runner: the first rule whose needle occurs in the command decides the reply.
/// Unmatched commands succeed with empty output. Every call is recorded.
#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<(String, fn() -> Reply)>>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl FakeRunner {
    pub fn on(self, needle: &str, reply: fn() -> Reply) -> Self {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push((needle.to_string(), reply));
        }
        self
    }

    pub fn calls(&self) -> Vec<(String, Duration)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|(cmd, _)| cmd).collect()
    }

    pub fn ran(&self, needle: &str) -> bool {
        self.commands().iter().any(|c| c.contains(needle))
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, command: &str, timeout: Duration) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((command.to_string(), timeout));
        }
        let reply = self.rules.lock().ok().and_then(|rules| {
            rules
                .iter()
                .find(|(needle, _)| command.contains(needle.as_str()))
                .map(|(_, reply)| *reply)
        });
        match reply {
            Some(reply) => reply(),
            None => Ok(String::new()),
        }
    }
}

pub struct FakeReleases(pub Option<&'static str>);

#[async_trait]
impl ReleaseFeed for FakeReleases {
    async fn latest_version(&self) -> Result<String> {
        self.0
            .map(str::to_string)
            .ok_or_else(|| Error::Release("offline".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text {
        text: String,
        parse_mode: Option<ParseMode>,
    },
    Edit {
        message_id: MessageId,
        text: String,
    },
    File {
        path: PathBuf,
        caption: String,
        /// File existed at send time
        existed: bool,
    },
}

impl Sent {
    pub fn text(&self) -> &str {
        match self {
            Sent::Text { text, .. } | Sent::Edit { text, .. } => text,
            Sent::File { caption, .. } => caption,
        }
    }
}

/// Recording outbox. Optionally starts failing after `fail_after` successful sends.
#[derive(Default)]
pub struct FakeOutbox {
    sent: Mutex<Vec<Sent>>,
    fail_after: Option<usize>,
}

impl FakeOutbox {
    pub fn failing_after(n: usize) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_after: Some(n),
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().iter().map(|s| s.text().to_string()).collect()
    }

    pub fn last_text(&self) -> String {
        self.texts().pop().unwrap_or_default()
    }

    fn record(&self, entry: Sent) -> Result<usize> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| Error::ExecutionFailed("poisoned".to_string()))?;
        if self.fail_after.is_some_and(|n| sent.len() >= n) {
            return Err(Error::Io(std::io::Error::other("send failed")));
        }
        sent.push(entry);
        Ok(sent.len())
    }
}

#[async_trait]
impl Outbox for FakeOutbox {
    async fn send_text(
        &self,
        _chat_id: ChatId,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<MessageId> {
        let n = self.record(Sent::Text {
            text: text.to_string(),
            parse_mode,
        })?;
        Ok(MessageId(n as i32))
    }

    async fn edit_text(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        _parse_mode: Option<ParseMode>,
    ) -> Result<()> {
        self.record(Sent::Edit {
            message_id,
            text: text.to_string(),
        })?;
        Ok(())
    }

    async fn send_file(&self, _chat_id: ChatId, path: &Path, caption: &str) -> Result<()> {
        self.record(Sent::File {
            path: path.to_path_buf(),
            caption: caption.to_string(),
            existed: path.exists(),
        })?;
        Ok(())
    }
}

pub fn app_with(runner: Arc<FakeRunner>, latest: Option<&'static str>) -> App {
    let config: Config = test_config("/opt/main");
    App::new(Arc::new(config), runner, Arc::new(FakeReleases(latest)))
}
