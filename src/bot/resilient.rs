//! Resilient messaging utilities with automatic retry for Telegram API operations.
//!
//! Wrappers around status-message edits and deletes that retry transient
//! network failures using exponential backoff with jitter.
//!
//! # Usage
//!
//! ```ignore
//! use media_relay_bot::bot::resilient::{edit_message_resilient, delete_message_resilient};
//!
//! edit_message_resilient(&bot, chat_id, msg.id, "Uploading...").await?;
//! delete_message_resilient(&bot, chat_id, msg.id).await?;
//! ```

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, MessageId};
use tracing::debug;

const ERROR_NOT_MODIFIED: &str = "message is not modified";
const ERROR_NOT_FOUND: &str = "message to edit not found";
const ERROR_DELETE_NOT_FOUND: &str = "message to delete not found";

/// Whether a Telegram error only says the edit/delete had nothing to do
#[must_use]
pub fn is_benign_message_error(err: &str) -> bool {
    [ERROR_NOT_MODIFIED, ERROR_NOT_FOUND, ERROR_DELETE_NOT_FOUND]
        .iter()
        .any(|pattern| err.contains(pattern))
}

/// Edit a message's text with automatic retry on network failures.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn edit_message_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: impl Into<String>,
) -> Result<Message> {
    let text = text.into();
    crate::utils::retry_telegram_operation(|| async {
        bot.edit_message_text(chat_id, msg_id, text.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Telegram edit error: {e}"))
    })
    .await
}

/// Delete a message with automatic retry on network failures.
///
/// A message that is already gone counts as deleted.
///
/// # Errors
///
/// Returns the last error after all retries are exhausted.
pub async fn delete_message_resilient(bot: &Bot, chat_id: ChatId, msg_id: MessageId) -> Result<()> {
    let result = crate::utils::retry_telegram_operation(|| async {
        bot.delete_message(chat_id, msg_id)
            .await
            .map(|_| ())
            .map_err(|e| anyhow::anyhow!("Telegram delete error: {e}"))
    })
    .await;

    match result {
        Err(e) if is_benign_message_error(&e.to_string()) => {
            debug!("Message delete skipped: {e}");
            Ok(())
        }
        other => other,
    }
}
