//! yt-dlp failure types and classification.

use lazy_regex::regex;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

/// Messages yt-dlp prints for failures a retry will not fix
const FATAL_ERROR_PATTERNS: &[&str] = &[
    "Video unavailable",
    "Private video",
    "This video is not available",
    "Sign in to confirm your age",
    "age-restricted",
    "members-only",
    "This video is private",
    "removed by the uploader",
    "no longer available",
    "blocked it in your country",
    "geo-restricted",
    "copyright",
    "terminated account",
    "This video has been removed",
    "Unsupported URL",
    "is not a valid URL",
    "Requested format is not available",
    "Premieres in",
    "This live event will begin",
    "Join this channel to get access",
    "HTTP Error 403",
    "HTTP Error 404",
];

/// Messages that usually mean a network hiccup
const TRANSIENT_ERROR_PATTERNS: &[&str] = &[
    "Connection reset",
    "Connection timed out",
    "Unable to download webpage",
    "HTTP Error 429",
    "HTTP Error 503",
    "Read timed out",
    "network is unreachable",
    "Temporary failure in name resolution",
];

/// Rough nature of an extraction failure, used for logging only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Content cannot be fetched (private, removed, unsupported site, ...)
    Fatal,
    /// Network-level problem that may go away
    Transient,
    /// Anything else
    Other,
}

impl FailureKind {
    /// Classify a yt-dlp error message
    #[must_use]
    pub fn classify(message: &str) -> Self {
        if FATAL_ERROR_PATTERNS.iter().any(|p| message.contains(p)) {
            Self::Fatal
        } else if TRANSIENT_ERROR_PATTERNS.iter().any(|p| message.contains(p)) {
            Self::Transient
        } else {
            Self::Other
        }
    }
}

/// Errors produced while running yt-dlp
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The executable could not be started
    #[error("failed to launch yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),
    /// Reading the child's output or touching the downloaded file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// yt-dlp exited with an error
    #[error("{message}")]
    Extraction {
        /// Raw error text reported by yt-dlp
        message: String,
        /// Classification of `message`
        kind: FailureKind,
    },
    /// yt-dlp did not finish in time and was killed
    #[error("download timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
    /// yt-dlp succeeded but printed no file path
    #[error("yt-dlp did not report a downloaded file")]
    MissingOutput,
    /// The printed metadata line was not valid JSON
    #[error("unexpected yt-dlp output: {0}")]
    Parse(#[from] serde_json::Error),
}

impl DownloadError {
    /// Build an extraction error from a failed run's stderr.
    ///
    /// Prefers the `ERROR:` lines yt-dlp prints, then the last line of output,
    /// then the exit status itself.
    #[must_use]
    pub fn from_failed_run(status: ExitStatus, stderr: &str) -> Self {
        let reported: Vec<&str> = regex!(r"(?m)^ERROR:\s*(.+?)\s*$")
            .captures_iter(stderr)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        let message = if reported.is_empty() {
            stderr
                .lines()
                .map(str::trim)
                .rfind(|line| !line.is_empty())
                .map_or_else(|| format!("yt-dlp exited with {status}"), str::to_string)
        } else {
            reported.join("\n")
        };

        Self::Extraction {
            kind: FailureKind::classify(&message),
            message,
        }
    }

    /// Failure classification, `None` for errors that did not come from yt-dlp itself
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Extraction { kind, .. } => Some(*kind),
            Self::Timeout(_) => Some(FailureKind::Transient),
            _ => None,
        }
    }
}
