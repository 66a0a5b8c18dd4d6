//! Startup environment report.
//!
//! Logs what the bot depends on at runtime so misconfigured deployments are
//! visible in the first lines of output. Nothing here is fatal.

use crate::config::Settings;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Run `binary args...` and return the first line it prints, if it succeeded
pub async fn probe_version(binary: impl AsRef<Path>, args: &[&str]) -> Option<String> {
    let binary = binary.as_ref();
    let run = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(PROBE_TIMEOUT, run).await {
        Ok(Ok(output)) if output.status.success() => output,
        Ok(Ok(output)) => {
            debug!(binary = %binary.display(), status = %output.status, "Version probe failed");
            return None;
        }
        Ok(Err(e)) => {
            debug!(binary = %binary.display(), "Version probe could not run: {e}");
            return None;
        }
        Err(_) => {
            debug!(binary = %binary.display(), "Version probe timed out");
            return None;
        }
    };

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Log tool versions and cookie file status
pub async fn log_environment(settings: &Settings) {
    match probe_version(&settings.ytdlp_path, &["--version"]).await {
        Some(version) => info!("✅ yt-dlp found: {version}"),
        None => error!(
            "❌ yt-dlp not found at '{}'. Downloads will fail.",
            settings.ytdlp_path
        ),
    }

    match probe_version("node", &["-v"]).await {
        Some(version) => info!("✅ Node.js found: {version}"),
        None => warn!("⚠️ Node.js not found. YouTube signature solving may fail."),
    }

    let cookies = settings.cookies_path();
    match tokio::fs::metadata(&cookies).await {
        Ok(meta) if meta.is_file() => info!(
            "✅ Cookie file found at '{}' ({} bytes)",
            cookies.display(),
            meta.len()
        ),
        _ => warn!(
            "Cookie file '{}' not found. Downloads run without cookies.",
            cookies.display()
        ),
    }
}
