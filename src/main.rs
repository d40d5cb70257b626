use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tokio::time::sleep;

use worktrack::cli::{Cli, Commands};
use worktrack::core::{config, init_logger, instance::InstanceLock};
use worktrack::report;
use worktrack::scheduler;
use worktrack::storage::{create_pool, get_connection};
use worktrack::telegram::notifications::notify_admin_text;
use worktrack::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TrackingState};
use worktrack::web;

/// Main entry point for the tracker bot.
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present (before the logger,
    // which reads LOG_FILE_PATH)
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { webhook }) => run_bot(webhook).await,
        Some(Commands::InitDb) => run_init_db(),
        Some(Commands::Report { user, date }) => run_cli_report(user, date),
        Some(Commands::DeleteWebhook) => run_delete_webhook().await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot(false).await
        }
    }
}

/// `init-db`: create/migrate the schema and exit.
fn run_init_db() -> Result<()> {
    let _pool = create_pool(&config::DATABASE_PATH)?;
    log::info!("Database initialized at {}", config::DATABASE_PATH.as_str());
    println!("Database initialized: {}", config::DATABASE_PATH.as_str());
    Ok(())
}

/// `report --user <id> [--date <date>]`: generate artifacts from the CLI.
fn run_cli_report(user: i64, date: Option<String>) -> Result<()> {
    let date = match date {
        Some(raw) => chrono::NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid date '{}': {}", raw, e))?,
        None => config::today_local(),
    };

    let pool = create_pool(&config::DATABASE_PATH)?;
    let conn = get_connection(&pool)?;
    let generated = report::generate_for_user(&conn, user, date)?;

    println!("Report: {}", generated.csv_path.display());
    println!("Map:    {}", generated.map_path.display());
    Ok(())
}

/// `delete-webhook`: clear webhook registration, dropping queued updates.
async fn run_delete_webhook() -> Result<()> {
    if config::BOT_TOKEN.is_empty() {
        anyhow::bail!("TELEGRAM_TOKEN environment variable not set");
    }
    let client = reqwest::Client::builder().timeout(config::network::timeout()).build()?;
    web::botapi::delete_webhook(&client, true).await?;
    log::info!("Webhook deleted (pending updates dropped)");
    println!("Webhook deleted.");
    Ok(())
}

/// Run the Telegram bot with schedulers and the admin dashboard.
async fn run_bot(force_webhook: bool) -> Result<()> {
    log::info!("Starting WorkTrack bot...");

    // Refuse to start next to a live instance; stale locks are taken over
    let lock = InstanceLock::acquire(&config::PID_FILE)?;
    log::info!("Running as pid {}", lock.pid());

    let db_pool = Arc::new(create_pool(&config::DATABASE_PATH)?);

    let bot = create_bot()?;

    // Wait out Bot API hiccups on startup instead of dying immediately
    let bot_info = {
        let max_retries = 12;
        let mut attempt = 0;
        loop {
            match bot.get_me().await {
                Ok(info) => break info,
                Err(e) => {
                    attempt += 1;
                    if attempt >= max_retries {
                        return Err(anyhow::anyhow!("Failed to connect to Bot API after {} retries: {}", attempt, e));
                    }
                    log::warn!("Bot API not ready (attempt {}/{}): {}. Retrying in 5 seconds...", attempt, max_retries, e);
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    };
    log::info!("Bot username: {:?}, ID: {}", bot_info.username, bot_info.id);

    setup_bot_commands(&bot).await?;
    notify_admin_text(
        &bot,
        &format!(
            "🤖 Бот запущен (@{})",
            bot_info.username.as_deref().unwrap_or("worktrack_bot")
        ),
    )
    .await;

    let tracking = Arc::new(TrackingState::new());

    // Background jobs: morning checks, daily reports, location flush,
    // activity monitoring
    scheduler::start_all(bot.clone(), Arc::clone(&db_pool), Arc::clone(&tracking));

    // Admin dashboard
    {
        let web_pool = Arc::clone(&db_pool);
        let web_port = *config::WEB_PORT;
        tokio::spawn(async move {
            if let Err(e) = web::start_web_server(web_port, web_pool).await {
                log::error!("Admin dashboard error: {}", e);
            }
        });
    }

    let deps = HandlerDeps::new(Arc::clone(&db_pool), Arc::clone(&tracking));
    let handler = schema(deps);

    let use_webhook = force_webhook || config::BOT_MODE.as_str() == "webhook";
    let webhook_base = config::WEBHOOK_URL.clone();

    match (use_webhook, webhook_base) {
        (true, Some(base)) => {
            use teloxide::update_listeners::webhooks;

            let public_url = url::Url::parse(&format!("{}/webhook", base))?;
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], *config::PORT));
            log::info!("Starting bot in webhook mode: {} (listening on {})", public_url, addr);

            // Clear any previous registration before teloxide re-registers
            let _ = bot.delete_webhook().await;

            let listener = webhooks::axum(bot.clone(), webhooks::Options::new(addr, public_url)).await?;

            Dispatcher::builder(bot.clone(), handler)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;

            log::info!("Shutting down, removing webhook...");
            bot.delete_webhook().await?;
        }
        (true, None) => {
            log::warn!("BOT_MODE=webhook but WEBHOOK_URL is not set; falling back to polling");
            run_polling(bot, handler).await;
        }
        (false, _) => {
            run_polling(bot, handler).await;
        }
    }

    drop(lock);
    Ok(())
}

/// Long-polling dispatcher, dropping updates queued while we were down.
async fn run_polling(bot: worktrack::telegram::Bot, handler: teloxide::dispatching::UpdateHandler<worktrack::telegram::HandlerError>) {
    use teloxide::update_listeners::Polling;

    log::info!("Starting bot in long polling mode");

    // getUpdates is rejected while a webhook is registered
    if let Err(e) = bot.delete_webhook().await {
        log::warn!("Failed to delete webhook before polling: {}", e);
    }
    log::info!("📡 Ready to receive updates!");

    let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
}
