use crate::bot::handlers::{self, Command};
use crate::bot::{DownloadService, TelegramTransport};
use crate::config::Settings;
use crate::diagnostics;
use crate::download::YtDlpExtractor;
use crate::health;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the bot and the liveness server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the download directory, the health listener or the
/// HTTP client cannot be set up.
pub async fn run_bot(settings: Arc<Settings>) -> Result<()> {
    diagnostics::log_environment(&settings).await;

    let download_dir = settings.download_dir();
    tokio::fs::create_dir_all(&download_dir)
        .await
        .with_context(|| format!("cannot create download directory {}", download_dir.display()))?;

    let shutdown = CancellationToken::new();
    let health_task = spawn_health_server(settings.port, shutdown.clone()).await?;

    let bot = init_bot(&settings)?;
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let service = Arc::new(DownloadService::from_settings(
        &settings,
        Arc::new(YtDlpExtractor::from_settings(&settings)),
        Arc::new(TelegramTransport::new(bot.clone())),
    ));
    let handler = setup_handler();

    info!("Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![service, settings])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Dispatcher stopped, shutting down health server.");
    shutdown.cancel();
    if let Err(e) = health_task.await {
        error!("Health server task failed: {e}");
    }
    Ok(())
}

async fn spawn_health_server(
    port: u16,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let listener = health::bind(port)
        .await
        .with_context(|| format!("cannot bind health server on port {port}"))?;

    Ok(tokio::spawn(async move {
        if let Err(e) = health::serve(listener, shutdown).await {
            error!("Health server stopped: {e}");
        }
    }))
}

fn init_bot(settings: &Settings) -> Result<Bot> {
    // Uploads of large videos need far more than the default request timeout
    let client = teloxide::net::default_reqwest_settings()
        .connect_timeout(Duration::from_secs(settings.telegram_connect_timeout_secs))
        .timeout(Duration::from_secs(settings.telegram_request_timeout_secs))
        .build()
        .context("failed to build Telegram HTTP client")?;

    info!(
        "Telegram client initialized (connect timeout: {}s, request timeout: {}s)",
        settings.telegram_connect_timeout_secs, settings.telegram_request_timeout_secs
    );
    Ok(Bot::with_client(settings.telegram_token.clone(), client))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(Update::filter_callback_query().endpoint(handle_format_callback))
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_command),
                )
                .branch(
                    dptree::filter(|msg: Message| handlers::is_link_candidate(msg.text()))
                        .endpoint(handle_link),
                ),
        )
}

async fn handle_command(bot: Bot, msg: Message, cmd: Command) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg).await,
        Command::Help => handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_link(
    bot: Bot,
    msg: Message,
    service: Arc<DownloadService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_link(bot, msg, service).await {
        error!("Link handler error: {}", e);
    }
    respond(())
}

async fn handle_format_callback(
    bot: Bot,
    q: CallbackQuery,
    service: Arc<DownloadService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::handle_format_callback(bot, q, service).await {
        error!("Format callback error: {}", e);
    }
    respond(())
}
