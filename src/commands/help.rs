use teloxide::prelude::*;

use crate::state::AppState;
use crate::utils::BotError;

const COMMAND_LIST: &str = "Kullanılabilir komutlar:\n\
    /100lira - 100 TL'yi anlık kur ile satoshi'ye çevir\n\
    /price - Güncel BTC/USD ve BTC/TRY kurlarını göster\n\
    /volume - En yüksek hacimli 5 para birimi çiftini göster\n\
    /dollar - USDT/TRY ve USD/TRY kurlarını göster";

pub fn start_text() -> String {
    format!(
        "Merhaba! 👋 Türk Lirası'nı Bitcoin satoshi'ye çevirmenize yardımcı olabilirim.\n\n\
         {}\n/help - Yardım mesajını göster",
        COMMAND_LIST
    )
}

pub fn help_text(is_admin: bool, send_amount_sats: u64) -> String {
    let mut text = format!(
        "Türk Lirası'nı Bitcoin satoshi'ye çevirmenize yardımcı olabilirim.\n\n{}",
        COMMAND_LIST
    );
    if is_admin {
        text.push_str(&format!(
            "\n\nAdmin komutları:\n\
             /gimmecheese - Lightning adresine veya faturaya {} satoshi gönder\n\
             /ban [kullanıcı_adı] - Kullanıcıyı banla\n\
             /groupid - Mevcut sohbetin ID'sini göster",
            send_amount_sats
        ));
    }
    text
}

pub async fn start(bot: &Bot, msg: &Message) -> Result<(), BotError> {
    bot.send_message(msg.chat.id, start_text()).await?;
    Ok(())
}

pub async fn help(bot: &Bot, msg: &Message, state: &AppState) -> Result<(), BotError> {
    let username = msg.from.as_ref().and_then(|u| u.username.as_deref());
    let text = help_text(state.config.is_admin(username), state.config.send_amount_sats);
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
