use teloxide::prelude::*;

use super::edit_html;
use crate::api::Pair;
use crate::services::price_service::{fetch_all_quotes, first_available};
use crate::state::AppState;
use crate::utils::format::format_dollar_message;
use crate::utils::BotError;

pub async fn execute(bot: &Bot, msg: &Message, state: &AppState) -> Result<(), BotError> {
    let loading = bot
        .send_message(msg.chat.id, "Döviz kurları alınıyor, lütfen bekleyin...")
        .await?;

    let (usdt_try, usd_try) = tokio::join!(
        fetch_all_quotes(&state.exchanges, Pair::UsdtTry),
        fetch_all_quotes(&state.exchanges, Pair::UsdTry)
    );

    let message = format_dollar_message(first_available(&usdt_try), first_available(&usd_try));
    edit_html(bot, &loading, message).await
}
