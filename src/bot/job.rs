//! One download job: fetch, upload, clean up.
//!
//! The job owns the status message shown to the user. It is edited while the
//! job moves through its stages and deleted once the file was delivered. On
//! failure it is left in place showing the error.

use crate::bot::transport::ChatTransport;
use crate::bot::views;
use crate::download::{DownloadError, DownloadRequest, Extractor};
use std::path::Path;
use teloxide::types::{ChatId, MessageId};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A format selection ready to be processed
#[derive(Debug, Clone)]
pub struct DownloadJob {
    /// Correlates log lines of one job
    pub job_id: Uuid,
    /// Telegram user who asked for the download
    pub user_id: i64,
    /// Chat to deliver into
    pub chat_id: ChatId,
    /// Message carrying the progress text
    pub status_message: MessageId,
    /// Link and format
    pub request: DownloadRequest,
}

/// Where a job stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    /// Running yt-dlp
    Downloading,
    /// Sending the file to Telegram
    Uploading,
}

/// Errors that end a job
#[derive(Debug, Error)]
pub enum JobError {
    /// yt-dlp did not produce a file
    #[error(transparent)]
    Extraction(#[from] DownloadError),
    /// The file exceeds what the Bot API accepts
    #[error("file is too large to send ({size} bytes, limit is {limit} bytes)")]
    TooLarge {
        /// Size on disk in bytes
        size: u64,
        /// Upload limit in bytes
        limit: u64,
    },
    /// Telegram rejected the upload
    #[error("upload failed: {0}")]
    Upload(#[source] anyhow::Error),
}

/// How a job ended
#[derive(Debug)]
pub enum JobOutcome {
    /// The file reached the chat
    Delivered {
        /// Title of the delivered media
        title: String,
    },
    /// The job stopped with an error shown to the user
    Failed {
        /// Stage that failed
        stage: JobStage,
        /// What went wrong
        error: JobError,
    },
}

impl JobOutcome {
    /// Whether the file was delivered
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Runs a job to completion. Never panics and never returns early without
/// telling the user what happened.
///
/// The request's working directory is removed on every exit path, taking the
/// downloaded file and any partial leftovers with it.
pub async fn run_job(
    transport: &dyn ChatTransport,
    extractor: &dyn Extractor,
    job: &DownloadJob,
    max_upload_bytes: u64,
) -> JobOutcome {
    let outcome = deliver(transport, extractor, job, max_upload_bytes).await;
    remove_work_dir(&job.request.work_dir).await;
    outcome
}

async fn deliver(
    transport: &dyn ChatTransport,
    extractor: &dyn Extractor,
    job: &DownloadJob,
    max_upload_bytes: u64,
) -> JobOutcome {
    let media = match extractor.extract(&job.request).await {
        Ok(media) => media,
        Err(e) => return fail(transport, job, JobStage::Downloading, e.into()).await,
    };

    if let Err(e) = check_size(&media.path, max_upload_bytes).await {
        return fail(transport, job, JobStage::Downloading, e).await;
    }

    if let Err(e) = transport
        .edit_status(job.chat_id, job.status_message, views::UPLOADING)
        .await
    {
        warn!(job_id = %job.job_id, "Failed to update status message: {e}");
    }

    if let Err(e) = transport.send_media(job.chat_id, &media).await {
        return fail(transport, job, JobStage::Uploading, JobError::Upload(e)).await;
    }

    if let Err(e) = transport.delete_message(job.chat_id, job.status_message).await {
        warn!(job_id = %job.job_id, "Failed to delete status message: {e}");
    }

    info!(job_id = %job.job_id, user_id = job.user_id, title = %media.title, "Media delivered");
    JobOutcome::Delivered { title: media.title }
}

async fn check_size(path: &Path, limit: u64) -> Result<(), JobError> {
    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| JobError::Extraction(DownloadError::Io(e)))?
        .len();
    if size > limit {
        return Err(JobError::TooLarge { size, limit });
    }
    Ok(())
}

async fn remove_work_dir(dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => debug!(path = %dir.display(), "Removed job directory"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %dir.display(), "Failed to remove job directory: {e}"),
    }
}

async fn fail(
    transport: &dyn ChatTransport,
    job: &DownloadJob,
    stage: JobStage,
    error: JobError,
) -> JobOutcome {
    warn!(job_id = %job.job_id, user_id = job.user_id, ?stage, "Job failed: {error}");

    let text = views::error_message(&error.to_string());
    if let Err(e) = transport
        .edit_status(job.chat_id, job.status_message, &text)
        .await
    {
        warn!(job_id = %job.job_id, "Failed to report error to user: {e}");
    }

    JobOutcome::Failed { stage, error }
}
