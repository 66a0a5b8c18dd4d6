//! Small helpers shared by the bot and the download pipeline.

use anyhow::Result;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Truncates a string to at most `max_units` UTF-16 code units.
///
/// Telegram measures message length in UTF-16 units, so a character outside
/// the Basic Multilingual Plane (most emoji) counts twice. Never splits a
/// character.
///
/// # Examples
///
/// ```
/// use media_relay_bot::utils::truncate_utf16;
/// assert_eq!(truncate_utf16("Привет, мир!", 6), "Привет");
/// assert_eq!(truncate_utf16("😀😀😀", 5), "😀😀");
/// ```
pub fn truncate_utf16(s: impl AsRef<str>, max_units: usize) -> String {
    let s = s.as_ref();
    let mut units = 0;
    for (pos, ch) in s.char_indices() {
        units += ch.len_utf16();
        if units > max_units {
            return s[..pos].to_string();
        }
    }
    s.to_string()
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Used for uploads and status edits that may fail on transient network errors.
/// Backoff starts at 500ms, is capped at 4s and gives up after 3 attempts
/// (see the `TELEGRAM_API_*` constants in `config.rs`).
///
/// # Examples
///
/// ```no_run
/// use media_relay_bot::utils::retry_telegram_operation;
/// use anyhow::Result;
///
/// async fn upload() -> Result<()> {
///     Ok(())
/// }
///
/// # async fn example() -> Result<()> {
/// retry_telegram_operation(|| async { upload().await }).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the last error if every attempt fails.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_truncate_utf16_unicode() {
        let s = "Привет, мир!";
        assert_eq!(truncate_utf16(s, 6), "Привет");
        assert_eq!(truncate_utf16(s, 50), "Привет, мир!");
    }

    #[test]
    fn test_truncate_utf16_exact_length() {
        assert_eq!(truncate_utf16("abc", 3), "abc");
        assert_eq!(truncate_utf16("", 3), "");
    }

    #[test]
    fn test_truncate_utf16_counts_surrogate_pairs() {
        let emoji = "😀".repeat(3000);
        let truncated = truncate_utf16(&emoji, 4000);

        assert_eq!(truncated.encode_utf16().count(), 4000);
        assert_eq!(truncated.chars().count(), 2000);
        // A pair is never split
        assert_eq!(truncate_utf16("a😀", 2), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_after_transient_failure() -> Result<()> {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let value = retry_telegram_operation(|| async move {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("connection reset");
            }
            Ok(42)
        })
        .await?;

        assert_eq!(value, 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let counter = AtomicUsize::new(0);
        let attempts = &counter;
        let result: Result<()> = retry_telegram_operation(|| async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("still down")
        })
        .await;

        assert!(result.is_err());
        // First try plus TELEGRAM_API_MAX_RETRIES retries
        assert_eq!(
            attempts.load(Ordering::SeqCst),
            crate::config::TELEGRAM_API_MAX_RETRIES + 1
        );
    }
}
