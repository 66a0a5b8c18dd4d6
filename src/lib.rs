#![deny(missing_docs)]
//! Telegram bot that downloads media links with yt-dlp and sends them back.

/// Telegram handlers, sessions and the download pipeline.
pub mod bot;
/// Application configuration.
pub mod config;
/// Startup environment checks.
pub mod diagnostics;
/// yt-dlp integration.
pub mod download;
/// HTTP liveness endpoint.
pub mod health;
/// Tracing subscriber with token redaction.
pub mod logging;
/// Bot runtime entrypoint.
pub mod runner;
/// Shared helpers.
pub mod utils;
