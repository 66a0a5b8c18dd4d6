use crate::bot::service::{DownloadService, Selection};
use crate::bot::views;
use crate::download::FormatChoice;
use anyhow::Result;
use std::sync::Arc;
use teloxide::{prelude::*, types::ParseMode, utils::command::BotCommands};
use tracing::{debug, info};

// Helper function to get user name from Message
fn get_user_name(msg: &Message) -> String {
    msg.from
        .as_ref()
        .map_or_else(|| "Unknown".to_string(), |u| u.first_name.clone())
}

/// Safely get user ID from a message.
///
/// Returns 0 for messages without a sender (channel posts).
#[must_use]
pub fn get_user_id_safe(msg: &Message) -> i64 {
    msg.from.as_ref().map_or(0, |u| u.id.0.cast_signed())
}

/// Supported bot commands
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message
    #[command(description = "Start the bot.")]
    Start,
    /// List commands
    #[command(description = "Show this help.")]
    Help,
}

/// Handle the /start command
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message) -> Result<()> {
    let user_id = get_user_id_safe(&msg);
    let user_name = get_user_name(&msg);
    info!("User {user_id} ({user_name}) initiated /start command.");

    bot.send_message(msg.chat.id, views::WELCOME)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

/// Handle the /help command
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Whether a message should be treated as a link to download.
///
/// Any text not starting with `/` qualifies. Unknown commands are dropped
/// rather than sent to yt-dlp, and non-text messages never qualify.
#[must_use]
pub fn is_link_candidate(text: Option<&str>) -> bool {
    text.is_some_and(|text| !text.starts_with('/'))
}

/// Store the text as the user's pending link and offer the format menu.
///
/// The text is not validated; yt-dlp decides whether it can handle it.
///
/// # Errors
///
/// Returns an error if the menu cannot be sent.
pub async fn handle_link(bot: Bot, msg: Message, service: Arc<DownloadService>) -> Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let user_id = get_user_id_safe(&msg);
    debug!(user_id, "Received link candidate");

    service.remember_link(user_id, text).await;

    bot.send_message(msg.chat.id, views::FORMAT_PROMPT)
        .reply_markup(views::format_keyboard())
        .await?;
    Ok(())
}

/// Handle a press on one of the format buttons.
///
/// Always acknowledges the query. Unknown payloads are ignored.
///
/// # Errors
///
/// Returns an error if the query carries no message or the status message
/// cannot be updated.
pub async fn handle_format_callback(
    bot: Bot,
    q: CallbackQuery,
    service: Arc<DownloadService>,
) -> Result<()> {
    let _ = bot.answer_callback_query(q.id.clone()).await;

    let Some(choice) = q.data.as_deref().and_then(FormatChoice::from_callback_data) else {
        debug!(data = ?q.data, "Ignoring unknown callback payload");
        return Ok(());
    };

    let user_id = q.from.id.0.cast_signed();
    let (chat_id, message_id) = q
        .message
        .as_ref()
        .map(|msg| (msg.chat().id, msg.id()))
        .ok_or_else(|| anyhow::anyhow!("Callback message missing chat id"))?;

    info!(
        "User {user_id} selected format {} in chat {chat_id}.",
        choice.label()
    );

    match service
        .select_format(user_id, chat_id, message_id, choice)
        .await?
    {
        Selection::Expired => debug!(user_id, "Session expired"),
        // The job reports back to the chat on its own
        Selection::Dispatched(_) => {}
    }
    Ok(())
}
