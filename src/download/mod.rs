//! Media download layer
//!
//! Maps format choices onto yt-dlp parameters and runs the extraction.

/// yt-dlp error types
pub mod error;
/// Download profiles
pub mod format;
/// yt-dlp process runner
pub mod ytdlp;

pub use error::{DownloadError, FailureKind};
pub use format::{FormatChoice, MediaKind};
pub use ytdlp::{DownloadRequest, DownloadResult, Extractor, YtDlpExtractor};

#[cfg(test)]
pub use ytdlp::MockExtractor;
