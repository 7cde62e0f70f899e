use teloxide::prelude::*;

use super::send_html;
use crate::state::AppState;
use crate::utils::format::escape_html;
use crate::utils::BotError;

pub fn chat_info(chat_id: i64, title: Option<&str>) -> String {
    format!(
        "Chat ID: <code>{}</code>\nChat Title: {}",
        chat_id,
        escape_html(title.unwrap_or("Private Chat"))
    )
}

pub async fn execute(bot: &Bot, msg: &Message, state: &AppState) -> Result<(), BotError> {
    let username = msg.from.as_ref().and_then(|u| u.username.as_deref());
    if !state.config.is_admin(username) {
        return Ok(());
    }

    send_html(bot, msg.chat.id, chat_info(msg.chat.id.0, msg.chat.title())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_info() {
        assert_eq!(
            chat_info(-1001234, Some("Yirmibir & Co")),
            "Chat ID: <code>-1001234</code>\nChat Title: Yirmibir &amp; Co"
        );
        assert!(chat_info(42, None).ends_with("Private Chat"));
    }
}
