//! Download service shared by all update handlers.
//!
//! Holds the pending-link sessions and a bounded pool of download workers.
//! Handlers hand over format selections and return right away; jobs run in
//! background tasks, at most `max_concurrent_downloads` at a time.

use crate::bot::job::{run_job, DownloadJob, JobOutcome};
use crate::bot::session::SessionStore;
use crate::bot::transport::ChatTransport;
use crate::bot::views;
use crate::config::Settings;
use crate::download::{DownloadRequest, Extractor, FormatChoice};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Result of pressing a format button
#[derive(Debug)]
pub enum Selection {
    /// No pending link for the user; the status message now says so
    Expired,
    /// A job was queued; the handle resolves when it ends
    Dispatched(JoinHandle<JobOutcome>),
}

/// Shared state behind the bot handlers
#[derive(Clone)]
pub struct DownloadService {
    sessions: SessionStore,
    extractor: Arc<dyn Extractor>,
    transport: Arc<dyn ChatTransport>,
    permits: Arc<Semaphore>,
    download_dir: PathBuf,
    max_upload_bytes: u64,
}

impl DownloadService {
    /// Build a service from explicit parts.
    ///
    /// Every job downloads into its own subdirectory of `download_dir`.
    #[must_use]
    pub fn new(
        sessions: SessionStore,
        extractor: Arc<dyn Extractor>,
        transport: Arc<dyn ChatTransport>,
        download_dir: impl Into<PathBuf>,
        max_concurrent: usize,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            sessions,
            extractor,
            transport,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            download_dir: download_dir.into(),
            max_upload_bytes,
        }
    }

    /// Build a service sized by `settings`
    #[must_use]
    pub fn from_settings(
        settings: &Settings,
        extractor: Arc<dyn Extractor>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        info!(
            "Initializing download service (workers: {}, session ttl: {}s, upload limit: {} MB)",
            settings.max_concurrent_downloads, settings.session_ttl_secs, settings.max_upload_mb
        );
        Self::new(
            SessionStore::new(settings.session_ttl(), settings.session_max_entries),
            extractor,
            transport,
            settings.download_dir(),
            settings.max_concurrent_downloads,
            settings.max_upload_bytes(),
        )
    }

    /// Pending-link store
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Remember `link` as the user's pending link
    pub async fn remember_link(&self, user_id: i64, link: &str) {
        self.sessions.remember(user_id, link.trim()).await;
    }

    /// Start a download for the user's pending link.
    ///
    /// `status_message` is the message holding the format keyboard; it is
    /// reused for progress and error reporting.
    ///
    /// # Errors
    ///
    /// Returns an error only if the expired-session notice could not be shown.
    pub async fn select_format(
        &self,
        user_id: i64,
        chat_id: ChatId,
        status_message: MessageId,
        choice: FormatChoice,
    ) -> Result<Selection> {
        let Some(url) = self.sessions.pending_link(user_id).await else {
            info!(user_id, "Format selected without a pending link");
            self.transport
                .edit_status(chat_id, status_message, views::SESSION_EXPIRED)
                .await?;
            return Ok(Selection::Expired);
        };

        let job_id = Uuid::new_v4();
        let job = DownloadJob {
            job_id,
            user_id,
            chat_id,
            status_message,
            request: DownloadRequest {
                url,
                format: choice,
                work_dir: self.download_dir.join(job_id.to_string()),
            },
        };

        let queued = self.permits.available_permits() == 0;
        let initial = if queued {
            views::queued(choice)
        } else {
            views::downloading(choice)
        };
        if let Err(e) = self
            .transport
            .edit_status(chat_id, status_message, &initial)
            .await
        {
            warn!(job_id = %job.job_id, "Failed to show download status: {e}");
        }

        info!(
            job_id = %job.job_id,
            user_id,
            url = %job.request.url,
            format = choice.label(),
            queued,
            "Download job accepted"
        );

        let span = info_span!(
            "download_job",
            job_id = %job.job_id,
            user_id,
            format = choice.label()
        );
        let service = self.clone();
        let handle = tokio::spawn(async move { service.process(job, queued).await }.instrument(span));

        Ok(Selection::Dispatched(handle))
    }

    async fn process(&self, job: DownloadJob, queued: bool) -> JobOutcome {
        // The semaphore is never closed, so acquiring only fails in theory
        let _permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(e) => {
                warn!("Download pool unavailable, running unthrottled: {e}");
                None
            }
        };

        if queued {
            let text = views::downloading(job.request.format);
            if let Err(e) = self
                .transport
                .edit_status(job.chat_id, job.status_message, &text)
                .await
            {
                warn!("Failed to update queued status: {e}");
            }
        }

        run_job(
            self.transport.as_ref(),
            self.extractor.as_ref(),
            &job,
            self.max_upload_bytes,
        )
        .await
    }
}
