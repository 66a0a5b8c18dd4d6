//! Chat-side operations used by download jobs.
//!
//! Jobs talk to the chat only through [`ChatTransport`], so the download flow
//! can run against Telegram in production and against mocks in tests.

use crate::bot::resilient::{delete_message_resilient, edit_message_resilient, is_benign_message_error};
use crate::download::{DownloadResult, MediaKind};
use anyhow::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, MessageId};
use tracing::{debug, info};

/// Outbound chat operations needed by the delivery pipeline
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Replace the text of the in-flight status message
    async fn edit_status(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()>;

    /// Remove a message from the chat
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    /// Upload a downloaded file as audio or video
    async fn send_media(&self, chat_id: ChatId, media: &DownloadResult) -> Result<()>;
}

/// [`ChatTransport`] on top of the Telegram Bot API
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    /// Wrap a bot handle
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn edit_status(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        match edit_message_resilient(&self.bot, chat_id, message_id, text).await {
            Ok(_) => Ok(()),
            Err(e) if is_benign_message_error(&e.to_string()) => {
                debug!("Status update skipped: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        delete_message_resilient(&self.bot, chat_id, message_id).await
    }

    async fn send_media(&self, chat_id: ChatId, media: &DownloadResult) -> Result<()> {
        info!(
            chat_id = chat_id.0,
            path = %media.path.display(),
            kind = ?media.kind,
            "Uploading media"
        );

        crate::utils::retry_telegram_operation(|| async {
            let file = InputFile::file(media.path.clone());
            let sent = match media.kind {
                MediaKind::Audio => {
                    self.bot
                        .send_audio(chat_id, file)
                        .title(media.title.clone())
                        .performer(media.uploader.clone().unwrap_or_else(|| "Unknown".to_string()))
                        .await
                }
                MediaKind::Video => {
                    self.bot
                        .send_video(chat_id, file)
                        .caption(media.title.clone())
                        .supports_streaming(true)
                        .await
                }
            };
            sent.map(|_| ())
                .map_err(|e| anyhow::anyhow!("Telegram upload error: {e}"))
        })
        .await
    }
}
