pub mod ban;
pub mod dollar;
pub mod gimmecheese;
pub mod groupid;
pub mod help;
pub mod lira;
pub mod price;
pub mod quotes;
pub mod volume;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ParseMode, UpdateKind};
use tracing::{debug, error, info};

use crate::state::AppState;
use crate::utils::BotError;

/// Commands subject to the per-chat cooldown
const RATE_LIMITED: &[&str] = &["start", "help", "price", "volume", "dollar", "100lira", "gimmecheese"];

/// Split `/cmd@botname arg1 arg2` into `("cmd", ["arg1", "arg2"])`
pub fn parse_command(text: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let command = head.split('@').next().unwrap_or(head);
    if command.is_empty() {
        return None;
    }
    Some((command, parts.collect()))
}

pub async fn send_html(bot: &Bot, chat_id: ChatId, text: impl Into<String>) -> Result<Message, BotError> {
    Ok(bot
        .send_message(chat_id, text)
        .parse_mode(ParseMode::Html)
        .await?)
}

/// Replace the text of a message the bot sent earlier
pub async fn edit_html(bot: &Bot, message: &Message, text: impl Into<String>) -> Result<(), BotError> {
    bot.edit_message_text(message.chat.id, message.id, text)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

pub async fn handle_update(bot: Bot, update: Update, state: Arc<AppState>) {
    match update.kind {
        UpdateKind::Message(message) => handle_message(&bot, &message, &state).await,
        UpdateKind::MyChatMember(change) => {
            if let Err(e) = quotes::on_membership_change(&bot, &change, &state).await {
                error!("Error handling membership change in chat {}: {}", change.chat.id, e);
            }
        }
        _ => {}
    }
}

pub async fn handle_message(bot: &Bot, msg: &Message, state: &AppState) {
    let Some(text) = msg.text() else {
        return;
    };
    let sender = msg.from.as_ref();
    if sender.map_or(false, |user| user.is_bot) {
        return;
    }

    let username = sender.and_then(|user| user.username.as_deref());
    if state.bans.is_banned(username).await {
        debug!("Ignoring message from banned user {:?}", username);
        return;
    }

    let chat_id = msg.chat.id;
    let Some((command, args)) = parse_command(text) else {
        // Plain text: either the awaited payment input or a quote source request
        let result = if state.awaiting_payment.is_waiting(chat_id.0).await
            && state.config.is_admin(username)
        {
            gimmecheese::process_input(bot, msg, state, text).await
        } else {
            quotes::answer_source_request(bot, msg, state, text).await
        };
        if let Err(e) = result {
            error!("❌ Error handling message in chat {}: {}", chat_id, e);
            let _ = bot.send_message(chat_id, e.user_message()).await;
        }
        return;
    };

    if RATE_LIMITED.contains(&command) && !state.config.is_admin(username) {
        let is_private = msg.chat.is_private();
        if let Err(cooldown) = state.rate_limiter.check(command, chat_id.0, is_private).await {
            debug!("/{} in chat {} on cooldown for {:?}", command, chat_id, cooldown.remaining);
            if cooldown.should_warn {
                let _ = bot.send_message(chat_id, cooldown.message()).await;
            }
            return;
        }
    }

    info!("/{} from {:?} in chat {}", command, username, chat_id);
    let result = match command {
        "start" => help::start(bot, msg).await,
        "help" => help::help(bot, msg, state).await,
        "price" => price::execute(bot, msg, state).await,
        "volume" => volume::execute(bot, msg, state).await,
        "dollar" => dollar::execute(bot, msg, state).await,
        "100lira" => lira::execute(bot, msg, state).await,
        "gimmecheese" => gimmecheese::execute(bot, msg, state).await,
        "cancel" => gimmecheese::cancel(bot, msg, state).await,
        "ban" => ban::execute(bot, msg, state, &args).await,
        "groupid" => groupid::execute(bot, msg, state).await,
        _ => return,
    };

    if let Err(e) = result {
        error!("❌ Error executing command /{}: {}", command, e);
        let _ = bot.send_message(chat_id, e.user_message()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("/price"), Some(("price", vec![])));
        assert_eq!(parse_command("/100lira@yirmibir_bot"), Some(("100lira", vec![])));
        assert_eq!(parse_command("/ban @spammer"), Some(("ban", vec!["@spammer"])));
        assert_eq!(parse_command("  /help  "), Some(("help", vec![])));
    }

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse_command("satoshi@lightning.com"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("/"), None);
        assert_eq!(parse_command("/@bot"), None);
    }
}
