use std::sync::Arc;
use std::time::{Duration, Instant};

use teloxide::prelude::*;
use teloxide::types::ChatMemberUpdated;
use tracing::{debug, error, info, warn};

use super::send_html;
use crate::services::quote_service::{format_scheduled_quote, format_source, format_welcome, is_source_request};
use crate::state::AppState;
use crate::utils::BotError;

/// Upper bound on how late a due quote can be
const SCHEDULER_TICK: Duration = Duration::from_secs(60);

/// Track chats the bot joins and greet them with a first quote
pub async fn on_membership_change(bot: &Bot, change: &ChatMemberUpdated, state: &AppState) -> Result<(), BotError> {
    if !change.new_chat_member.kind.is_member() {
        return Ok(());
    }

    let chat_id = change.chat.id;
    if state.quote_chats.track(chat_id.0).await {
        info!(
            "Bot added to chat {} ({}), now tracking {} chats for quote posts",
            chat_id,
            change.chat.title().unwrap_or("Private Chat"),
            state.quote_chats.len().await
        );
    }

    if let Some(quote) = state.quotes.random() {
        send_html(bot, chat_id, format_welcome(quote)).await?;
        state.quote_chats.mark_posted(chat_id.0, Instant::now()).await;
        info!("Posted welcome message with quote to chat {}", chat_id);
    }
    Ok(())
}

/// Reply with a quote's source when someone answers a bot quote with "source" or "kaynak"
pub async fn answer_source_request(bot: &Bot, msg: &Message, state: &AppState, text: &str) -> Result<(), BotError> {
    let Some(replied) = msg.reply_to_message() else {
        return Ok(());
    };
    if !replied.from.as_ref().map_or(false, |u| u.is_bot) || !is_source_request(text) {
        return Ok(());
    }

    let Some(quote) = replied.text().and_then(|t| state.quotes.find_in(t)) else {
        debug!("Source requested for a bot message without a known quote");
        return Ok(());
    };
    if !state.answered_sources.first_time(msg.chat.id.0, replied.id.0).await {
        return Ok(());
    }

    send_html(bot, msg.chat.id, format_source(quote)).await?;
    Ok(())
}

/// Post a random quote to every tracked chat whose interval has elapsed
pub async fn post_due_quotes(bot: &Bot, state: &AppState) {
    let now = Instant::now();
    let due = state.quote_chats.due(now, state.config.quote_interval).await;
    if due.is_empty() {
        return;
    }

    let Some(quote) = state.quotes.random().cloned() else {
        error!("No quotes available to post");
        return;
    };
    let message = format_scheduled_quote(&quote);

    for chat_id in due {
        match send_html(bot, ChatId(chat_id), message.clone()).await {
            Ok(_) => {
                state.quote_chats.mark_posted(chat_id, now).await;
                info!("Posted quote to chat {}", chat_id);
            }
            Err(e) => warn!("Failed to post quote to chat {}: {}", chat_id, e),
        }
    }
}

pub async fn run_quote_scheduler(bot: Bot, state: Arc<AppState>) {
    let period = SCHEDULER_TICK
        .min(state.config.quote_interval)
        .max(Duration::from_secs(1));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        post_due_quotes(&bot, &state).await;
    }
}
