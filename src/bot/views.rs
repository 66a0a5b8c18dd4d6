//! User-facing texts and keyboards.

use crate::config::TELEGRAM_MESSAGE_LIMIT;
use crate::download::FormatChoice;
use crate::utils::truncate_utf16;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Reply to `/start`
pub const WELCOME: &str = "👋 <b>Hi!</b> Send me a link to a video and I'll download it for you.\n\n\
     You can pick 360p, 720p or audio only.";

/// Prompt above the format keyboard
pub const FORMAT_PROMPT: &str = "Select download format:";

/// Shown when a button is pressed but no link is stored
pub const SESSION_EXPIRED: &str = "Error: session expired. Please send the link again.";

/// Status while the file is being sent to Telegram
pub const UPLOADING: &str = "Uploading...";

/// Inline keyboard with the download profiles: two video tiers, then audio
///
/// # Examples
///
/// ```
/// use media_relay_bot::bot::views::format_keyboard;
/// let keyboard = format_keyboard();
/// assert_eq!(keyboard.inline_keyboard.len(), 2);
/// ```
#[must_use]
pub fn format_keyboard() -> InlineKeyboardMarkup {
    let button =
        |choice: FormatChoice| InlineKeyboardButton::callback(choice.label(), choice.callback_data());

    InlineKeyboardMarkup::new(vec![
        vec![
            button(FormatChoice::Video360),
            button(FormatChoice::Video720),
        ],
        vec![button(FormatChoice::Audio)],
    ])
}

/// Status while yt-dlp runs
#[must_use]
pub fn downloading(choice: FormatChoice) -> String {
    format!("Downloading {}...", choice.label())
}

/// Status while waiting for a free download slot
#[must_use]
pub fn queued(choice: FormatChoice) -> String {
    format!("Queued {}, waiting for a free download slot...", choice.label())
}

/// Error report shown in place of the status message
#[must_use]
pub fn error_message(error: &str) -> String {
    let text = format!("Error: {error}");
    truncate_utf16(text, TELEGRAM_MESSAGE_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    #[test]
    fn test_keyboard_layout() {
        let keyboard = format_keyboard();
        let rows: Vec<Vec<(&str, Option<&str>)>> = keyboard
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| {
                        let data = match &b.kind {
                            InlineKeyboardButtonKind::CallbackData(data) => Some(data.as_str()),
                            _ => None,
                        };
                        (b.text.as_str(), data)
                    })
                    .collect()
            })
            .collect();

        assert_eq!(
            rows,
            vec![
                vec![("360p", Some("360")), ("720p", Some("720"))],
                vec![("Audio", Some("mp3"))],
            ]
        );
    }

    #[test]
    fn test_error_message_is_truncated() {
        let long = "x".repeat(10_000);
        let text = error_message(&long);
        assert!(text.starts_with("Error: "));
        assert_eq!(text.chars().count(), TELEGRAM_MESSAGE_LIMIT);
    }

    #[test]
    fn test_error_message_fits_telegram_units() {
        let text = error_message(&"🎬".repeat(3000));
        assert!(text.encode_utf16().count() <= TELEGRAM_MESSAGE_LIMIT);
        assert!(text.starts_with("Error: 🎬"));
    }

    #[test]
    fn test_status_texts_name_the_choice() {
        assert_eq!(downloading(FormatChoice::Video360), "Downloading 360p...");
        assert!(queued(FormatChoice::Audio).contains("Audio"));
    }
}
