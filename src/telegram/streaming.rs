use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::error::Result;

use super::bot::{Outbox, MESSAGE_CHUNK_LIMIT};

/// Pause between consecutive segments of one long message.
pub(super) const CHUNK_SEND_DELAY: Duration = Duration::from_millis(100);

/// Split `text` into consecutive segments of at most `limit` chars.
/// Splits fall on char boundaries only; words and markup are not respected.
/// A zero limit means no splitting.
pub(super) fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    if limit == 0 {
        return if text.is_empty() { Vec::new() } else { vec![text] };
    }
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let end = remaining
            .char_indices()
            .nth(limit)
            .map(|(idx, _)| idx)
            .unwrap_or(remaining.len());
        let (chunk, rest) = remaining.split_at(end);
        chunks.push(chunk);
        remaining = rest;
    }
    chunks
}

/// Send a message that may exceed the chunk limit by splitting it into
/// multiple messages. `parse_mode` is applied to the first segment only.
/// A failed send aborts the remaining segments.
pub(super) async fn send_long_message(
    outbox: &dyn Outbox,
    chat_id: ChatId,
    text: &str,
    parse_mode: Option<ParseMode>,
) -> Result<()> {
    if text.chars().count() <= MESSAGE_CHUNK_LIMIT {
        outbox.send_text(chat_id, text, parse_mode).await?;
        return Ok(());
    }

    for (i, chunk) in split_chunks(text, MESSAGE_CHUNK_LIMIT).into_iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(CHUNK_SEND_DELAY).await;
        }
        let mode = if i == 0 { parse_mode } else { None };
        outbox.send_text(chat_id, chunk, mode).await?;
    }

    Ok(())
}

/// Escape special HTML characters for Telegram HTML parse mode
pub(super) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Keep at most `max_chars` leading chars of `s`.
pub(super) fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
