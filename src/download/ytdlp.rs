//! yt-dlp runner
//!
//! Runs the yt-dlp executable as a child process for a single link and reads
//! back where the file landed plus the title/uploader metadata.

use super::error::{DownloadError, FailureKind};
use super::format::{FormatChoice, MediaKind};
use crate::config::Settings;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Output template, relative to the job's working directory
const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Printed once the file reached its final location (after any post-processing)
const PRINT_TEMPLATE: &str = "after_move:%(.{title,uploader,filepath})j";

/// What to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Link submitted by the user
    pub url: String,
    /// Selected profile
    pub format: FormatChoice,
    /// Directory owned by this request alone; yt-dlp writes its output and
    /// partial files here
    pub work_dir: PathBuf,
}

/// A finished download sitting on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    /// Media title, used as caption / audio title
    pub title: String,
    /// Channel or uploader name, if known
    pub uploader: Option<String>,
    /// Location of the downloaded file
    pub path: PathBuf,
    /// Attachment type for delivery
    pub kind: MediaKind,
}

/// Interface for anything that can turn a link into a local file
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Download the media behind `request.url` with the requested profile
    async fn extract(&self, request: &DownloadRequest) -> Result<DownloadResult, DownloadError>;
}

/// Metadata line printed by yt-dlp
#[derive(Debug, Deserialize)]
struct PrintedInfo {
    title: Option<String>,
    uploader: Option<String>,
    filepath: Option<String>,
}

/// [`Extractor`] backed by the yt-dlp command line tool
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
    cookies_file: PathBuf,
    audio_format: Option<String>,
    timeout: Duration,
}

impl YtDlpExtractor {
    /// Create an extractor with explicit paths and limits
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            cookies_file: PathBuf::from("cookies.txt"),
            audio_format: None,
            timeout,
        }
    }

    /// Create an extractor from application settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let mut extractor = Self::new(&settings.ytdlp_path, settings.download_timeout())
            .with_cookies_file(settings.cookies_path());
        if let Some(fmt) = settings.audio_format() {
            extractor = extractor.with_audio_format(fmt);
        }
        extractor
    }

    /// Use a different cookie file location
    #[must_use]
    pub fn with_cookies_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookies_file = path.into();
        self
    }

    /// Re-encode audio downloads into `format`
    #[must_use]
    pub fn with_audio_format(mut self, format: impl Into<String>) -> Self {
        self.audio_format = Some(format.into());
        self
    }

    /// Cookie file to pass along, if one is present on disk
    fn cookies(&self) -> Option<&Path> {
        self.cookies_file
            .is_file()
            .then_some(self.cookies_file.as_path())
    }

    /// Command line arguments for one run
    #[must_use]
    pub fn build_args(&self, request: &DownloadRequest, cookies: Option<&Path>) -> Vec<String> {
        let template = request.work_dir.join(OUTPUT_TEMPLATE);
        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--no-simulate".to_string(),
            "-f".to_string(),
            request.format.format_selector(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            "--print".to_string(),
            PRINT_TEMPLATE.to_string(),
        ];

        if let Some(path) = cookies {
            args.push("--cookies".to_string());
            args.push(path.to_string_lossy().into_owned());
        }

        if request.format.media_kind() == MediaKind::Audio {
            if let Some(ref fmt) = self.audio_format {
                args.extend(["-x".to_string(), "--audio-format".to_string(), fmt.clone()]);
            }
        }

        // Links starting with '-' must not be read as options
        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    /// Turn yt-dlp's stdout into a [`DownloadResult`]
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::MissingOutput`] if no metadata line or file path
    /// was printed and [`DownloadError::Parse`] if the line is not valid JSON.
    pub fn parse_output(stdout: &str, kind: MediaKind) -> Result<DownloadResult, DownloadError> {
        let line = stdout
            .lines()
            .map(str::trim)
            .rfind(|line| line.starts_with('{'))
            .ok_or(DownloadError::MissingOutput)?;

        let info: PrintedInfo = serde_json::from_str(line)?;
        let path = info
            .filepath
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .ok_or(DownloadError::MissingOutput)?;

        let fallback_title = match kind {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        };
        let title = info
            .title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title.to_string());

        Ok(DownloadResult {
            title,
            uploader: info.uploader.filter(|u| !u.is_empty()),
            path,
            kind,
        })
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    async fn extract(&self, request: &DownloadRequest) -> Result<DownloadResult, DownloadError> {
        let cookies = self.cookies();
        if cookies.is_none() {
            debug!(path = %self.cookies_file.display(), "No cookie file, downloading anonymously");
        }
        let args = self.build_args(request, cookies);
        debug!(binary = %self.binary.display(), ?args, "Running yt-dlp");

        tokio::fs::create_dir_all(&request.work_dir).await?;

        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(DownloadError::Spawn)?;

        // Dropping the future on timeout drops the child, which kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| DownloadError::Timeout(self.timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let err = DownloadError::from_failed_run(output.status, &stderr);
            match err.failure_kind() {
                Some(FailureKind::Fatal) => {
                    warn!(url = %request.url, error = %err, "Fatal yt-dlp error");
                }
                Some(FailureKind::Transient) => {
                    warn!(url = %request.url, error = %err, "Transient yt-dlp error");
                }
                _ => error!(url = %request.url, error = %err, "yt-dlp failed"),
            }
            return Err(err);
        }

        let result = Self::parse_output(&stdout, request.format.media_kind())?;
        info!(
            url = %request.url,
            title = %result.title,
            path = %result.path.display(),
            "yt-dlp download finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(format: FormatChoice) -> DownloadRequest {
        DownloadRequest {
            url: "https://example.com/video".to_string(),
            format,
            work_dir: Path::new("downloads").join("job-1"),
        }
    }

    fn extractor() -> YtDlpExtractor {
        YtDlpExtractor::new("yt-dlp", Duration::from_secs(60))
    }

    #[test]
    fn test_video_args() {
        let args = extractor().build_args(&request(FormatChoice::Video360), None);

        assert_eq!(args[0], "--no-playlist");
        let f = args.iter().position(|a| a == "-f").map(|i| &args[i + 1]);
        assert_eq!(f.map(String::as_str), Some("best[height<=360]"));
        let o = args.iter().position(|a| a == "-o").map(|i| &args[i + 1]);
        assert_eq!(
            o.map(PathBuf::from),
            Some(Path::new("downloads").join("job-1").join("%(title)s.%(ext)s"))
        );
        assert!(!args.contains(&"--cookies".to_string()));
        assert!(!args.contains(&"-x".to_string()));
        assert_eq!(args[args.len() - 2], "--");
        assert_eq!(args[args.len() - 1], "https://example.com/video");
    }

    #[test]
    fn test_cookies_passed_when_given() {
        let args = extractor().build_args(
            &request(FormatChoice::Video720),
            Some(Path::new("cookies.txt")),
        );
        let pos = args.iter().position(|a| a == "--cookies");
        assert_eq!(pos.map(|i| args[i + 1].as_str()), Some("cookies.txt"));
    }

    #[test]
    fn test_missing_cookie_file_is_skipped() {
        let extractor = extractor().with_cookies_file("/definitely/not/here/cookies.txt");
        assert!(extractor.cookies().is_none());
    }

    #[test]
    fn test_audio_keeps_source_format_by_default() {
        let args = extractor().build_args(&request(FormatChoice::Audio), None);
        assert!(args.contains(&"bestaudio/best".to_string()));
        assert!(!args.contains(&"-x".to_string()));
    }

    #[test]
    fn test_audio_format_only_applies_to_audio() {
        let extractor = extractor().with_audio_format("mp3");

        let audio = extractor.build_args(&request(FormatChoice::Audio), None);
        let pos = audio.iter().position(|a| a == "--audio-format");
        assert!(audio.contains(&"-x".to_string()));
        assert_eq!(pos.map(|i| audio[i + 1].as_str()), Some("mp3"));

        let video = extractor.build_args(&request(FormatChoice::Video720), None);
        assert!(!video.contains(&"-x".to_string()));
    }

    #[test]
    fn test_parse_output_takes_last_json_line() -> Result<(), DownloadError> {
        let stdout = "[info] something\n\
                      {\"title\": \"Clip\", \"uploader\": \"Chan\", \"filepath\": \"./Clip.mp4\"}\n";
        let result = YtDlpExtractor::parse_output(stdout, MediaKind::Video)?;

        assert_eq!(result.title, "Clip");
        assert_eq!(result.uploader.as_deref(), Some("Chan"));
        assert_eq!(result.path, PathBuf::from("./Clip.mp4"));
        assert_eq!(result.kind, MediaKind::Video);
        Ok(())
    }

    #[test]
    fn test_parse_output_defaults_title() -> Result<(), DownloadError> {
        let stdout = r#"{"title": null, "uploader": null, "filepath": "a.m4a"}"#;
        let result = YtDlpExtractor::parse_output(stdout, MediaKind::Audio)?;
        assert_eq!(result.title, "Audio");
        assert_eq!(result.uploader, None);
        Ok(())
    }

    #[test]
    fn test_parse_output_without_path_fails() {
        assert!(matches!(
            YtDlpExtractor::parse_output("", MediaKind::Video),
            Err(DownloadError::MissingOutput)
        ));
        assert!(matches!(
            YtDlpExtractor::parse_output(r#"{"title": "x"}"#, MediaKind::Video),
            Err(DownloadError::MissingOutput)
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let extractor = YtDlpExtractor::new("/nonexistent/yt-dlp-binary", Duration::from_secs(5));
        let mut req = request(FormatChoice::Audio);
        req.work_dir = dir.path().join("job");

        let result = extractor.extract(&req).await;
        assert!(matches!(result, Err(DownloadError::Spawn(_))));
    }
}
