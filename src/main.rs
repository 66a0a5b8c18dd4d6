use dotenvy::dotenv;
use media_relay_bot::config::Settings;
use media_relay_bot::{logging, runner};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenv().ok();

    logging::init_logging().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?;

    info!("Starting media relay bot...");

    let settings = init_settings();

    if let Err(e) = runner::run_bot(settings).await {
        error!("Bot stopped with error: {e:#}");
        return Err(e);
    }

    info!("Bot stopped.");
    Ok(())
}

fn init_settings() -> Arc<Settings> {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            Arc::new(s)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Error: {e}. Is TELEGRAM_TOKEN set?");
            std::process::exit(1);
        }
    }
}
