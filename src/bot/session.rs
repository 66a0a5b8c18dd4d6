//! Pending link storage
//!
//! Remembers the last link each user sent until they pick a format.
//! Entries idle longer than the TTL are evicted and read as "expired".

use moka::future::Cache;
use std::time::Duration;
use tracing::debug;

/// Per-user pending links, last write wins
#[derive(Clone)]
pub struct SessionStore {
    /// Moka cache storing user_id -> link with idle expiry
    links: Cache<i64, String>,
}

impl SessionStore {
    /// Creates a store whose entries expire after `ttl` without access
    ///
    /// # Examples
    ///
    /// ```
    /// use media_relay_bot::bot::SessionStore;
    /// use std::time::Duration;
    ///
    /// let sessions = SessionStore::new(Duration::from_secs(3600), 10_000);
    /// ```
    #[must_use]
    pub fn new(ttl: Duration, max_capacity: u64) -> Self {
        let links = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_idle(ttl)
            .build();
        Self { links }
    }

    /// Stores `link` as the user's pending link, replacing any previous one
    pub async fn remember(&self, user_id: i64, link: impl Into<String>) {
        let link = link.into();
        debug!(user_id, "Storing pending link");
        self.links.insert(user_id, link).await;
    }

    /// Returns the user's pending link, `None` if absent or expired.
    ///
    /// The entry stays in place so another format can be requested for it.
    pub async fn pending_link(&self, user_id: i64) -> Option<String> {
        self.links.get(&user_id).await
    }

    /// Number of pending links held
    #[must_use]
    pub fn len(&self) -> u64 {
        self.links.entry_count()
    }

    /// Whether no link is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(60), 100)
    }

    #[tokio::test]
    async fn test_absent_link_is_none() {
        assert_eq!(store().pending_link(1).await, None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let sessions = store();
        sessions.remember(1, "https://example.com/a").await;
        sessions.remember(1, "https://example.com/b").await;

        assert_eq!(
            sessions.pending_link(1).await.as_deref(),
            Some("https://example.com/b")
        );
    }

    #[tokio::test]
    async fn test_read_does_not_consume() {
        let sessions = store();
        sessions.remember(7, "https://example.com/v").await;

        assert!(sessions.pending_link(7).await.is_some());
        assert!(sessions.pending_link(7).await.is_some());
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let sessions = store();
        sessions.remember(111, "https://example.com/one").await;

        assert_eq!(sessions.pending_link(222).await, None);

        sessions.links.run_pending_tasks().await;
        assert_eq!(sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_idle_entries_expire() {
        let sessions = SessionStore::new(Duration::from_millis(50), 100);
        sessions.remember(5, "https://example.com/old").await;

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(sessions.pending_link(5).await, None);
    }
}
