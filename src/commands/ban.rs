use teloxide::prelude::*;
use tracing::info;

use crate::state::AppState;
use crate::utils::BotError;

pub async fn execute(bot: &Bot, msg: &Message, state: &AppState, args: &[&str]) -> Result<(), BotError> {
    let username = msg.from.as_ref().and_then(|u| u.username.as_deref());
    if !state.config.is_admin(username) {
        return Ok(());
    }

    let [target] = args else {
        bot.send_message(msg.chat.id, "Kullanım: /ban [kullanıcı_adı]").await?;
        return Ok(());
    };
    let target = target.trim_start_matches('@');

    let reply = if state.config.is_admin(Some(target)) {
        "Kendinizi banlayamazsınız.".to_string()
    } else if state.bans.ban(target).await {
        info!("Banned user @{}", target);
        format!("@{} kullanıcısı banlandı.", target)
    } else {
        format!("@{} kullanıcısı zaten banlanmış.", target)
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}
