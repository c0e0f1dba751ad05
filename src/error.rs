//! Error types for opsbot.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external command outlived its timeout and was killed.
    #[error("Command timed out")]
    TimedOut,

    /// The external command failed; carries its stderr or a short reason.
    #[error("{0}")]
    ExecutionFailed(String),

    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error("Release lookup failed: {0}")]
    Release(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_is_distinct_from_failure() {
        assert_eq!(Error::TimedOut.to_string(), "Command timed out");
        assert_eq!(
            Error::ExecutionFailed("no such container: n8n".into()).to_string(),
            "no such container: n8n"
        );
    }
}
