use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Timeout applied when a caller has no specific budget for a command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Per-stream capture limit (10 MB). Exceeding it fails the command.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Runs a shell command line and returns its captured output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, timeout: Duration) -> Result<String>;
}

/// Outcome of a best-effort query: either a value or nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading {
    Value(String),
    Unavailable,
}

impl Reading {
    /// Trimmed output on success; failures and blank output are `Unavailable`.
    pub fn from_result(result: Result<String>) -> Self {
        match result {
            Ok(out) if !out.trim().is_empty() => Reading::Value(out.trim().to_string()),
            Ok(_) => Reading::Unavailable,
            Err(e) => {
                debug!(error = %e, "best-effort query failed");
                Reading::Unavailable
            }
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Reading::Value(v) => Some(v),
            Reading::Unavailable => None,
        }
    }

    pub fn or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.value().unwrap_or(placeholder)
    }
}

/// Executes commands through `sh -c` inside the deployment directory.
pub struct ShellRunner {
    work_dir: PathBuf,
    output_limit: usize,
}

impl ShellRunner {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            output_limit: MAX_OUTPUT_BYTES,
        }
    }

    #[cfg(test)]
    fn with_output_limit(mut self, limit: usize) -> Self {
        self.output_limit = limit;
        self
    }
}

async fn read_capped<R: AsyncRead + Unpin>(pipe: Option<R>, limit: usize) -> Result<Vec<u8>> {
    let Some(pipe) = pipe else {
        return Ok(Vec::new());
    };
    let mut buf = Vec::new();
    pipe.take(limit as u64 + 1)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
    if buf.len() > limit {
        return Err(Error::ExecutionFailed(format!(
            "output exceeded {} byte limit",
            limit
        )));
    }
    Ok(buf)
}

async fn collect_output(child: &mut Child, limit: usize) -> Result<(ExitStatus, Vec<u8>, Vec<u8>)> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (out, err) = tokio::try_join!(read_capped(stdout, limit), read_capped(stderr, limit))?;
    let status = child
        .wait()
        .await
        .map_err(|e| Error::ExecutionFailed(e.to_string()))?;
    Ok((status, out, err))
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, timeout: Duration) -> Result<String> {
        debug!(command, timeout_secs = timeout.as_secs(), "exec");

        let mut child = Command::new("sh")
            .args(["-c", command])
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ExecutionFailed(format!("failed to spawn shell: {}", e)))?;

        let outcome = tokio::time::timeout(timeout, collect_output(&mut child, self.output_limit)).await;

        let (status, stdout, stderr) = match outcome {
            Ok(Ok(captured)) => captured,
            Ok(Err(e)) => {
                let _ = child.start_kill();
                return Err(e);
            }
            Err(_) => {
                let _ = child.start_kill();
                warn!(command, timeout_secs = timeout.as_secs(), "command timed out");
                return Err(Error::TimedOut);
            }
        };

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if !status.success() {
            let message = if stderr.trim().is_empty() {
                format!("command exited with {}", status)
            } else {
                stderr
            };
            debug!(command, %status, "command failed");
            return Err(Error::ExecutionFailed(message));
        }

        if stdout.is_empty() {
            Ok(stderr)
        } else {
            Ok(stdout)
        }
    }
}
