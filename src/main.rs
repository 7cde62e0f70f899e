use std::path::Path;
use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod commands;
mod config;
mod health;
mod services;
mod state;
mod utils;

use crate::config::Config;
use crate::services::quote_service::QuoteBook;
use crate::state::AppState;

/// Long-poll timeout for getUpdates, in seconds
const POLL_TIMEOUT_SECS: u32 = 10;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("yirmibir_bot=debug,teloxide=warn")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("🤖 Starting Yirmibir bot v{}...", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return;
        }
    };
    info!("Loaded configuration: {:?}", config);

    let quotes = QuoteBook::load(
        Path::new(&config.quotes_path),
        Path::new(&config.quotes_fallback_path),
    );
    let health_addr = config.health_addr;
    let bot = Bot::new(&config.telegram_bot_token);
    let state = Arc::new(AppState::new(config, quotes));

    match bot.get_me().await {
        Ok(me) => info!(
            "Bot connected as @{} (ID: {})",
            me.username.as_deref().unwrap_or("unknown"),
            me.id
        ),
        Err(e) => {
            error!("Failed to validate bot token: {}", e);
            return;
        }
    }

    tokio::spawn(async move {
        if let Err(e) = health::serve(health_addr).await {
            error!("Health server stopped: {}", e);
        }
    });
    tokio::spawn(commands::quotes::run_quote_scheduler(bot.clone(), Arc::clone(&state)));

    tokio::select! {
        _ = poll_updates(bot, state) => {}
        _ = tokio::signal::ctrl_c() => info!("Shutdown signal received, stopping bot"),
    }
}

/// getUpdates loop; every update is handled on its own task
async fn poll_updates(bot: Bot, state: Arc<AppState>) {
    let mut offset: i32 = 0;
    loop {
        let updates = match bot.get_updates().offset(offset).timeout(POLL_TIMEOUT_SECS).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Failed to fetch updates: {}", e);
                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                continue;
            }
        };

        for update in updates {
            offset = update.id.0 as i32 + 1;
            tokio::spawn(commands::handle_update(bot.clone(), update, Arc::clone(&state)));
        }
    }
}
