use teloxide::prelude::*;
use tracing::error;

use super::send_html;
use crate::services::price_service::{
    compute_denominator_volumes, volume_report, PAIR_OF_INTEREST, TOP_VOLUME_COUNT,
};
use crate::state::AppState;
use crate::utils::format::{format_volume_message, NO_VOLUME_DATA};
use crate::utils::BotError;

pub async fn execute(bot: &Bot, msg: &Message, state: &AppState) -> Result<(), BotError> {
    let tickers = match state.exchanges.btcturk_tickers().await {
        Ok(tickers) => tickers,
        Err(e) => {
            error!("Error fetching BTCTurk tickers: {}", e);
            bot.send_message(msg.chat.id, NO_VOLUME_DATA).await?;
            return Ok(());
        }
    };

    let ordered = compute_denominator_volumes(&tickers);
    let report = volume_report(&ordered, TOP_VOLUME_COUNT, PAIR_OF_INTEREST);
    send_html(bot, msg.chat.id, format_volume_message(&report)).await?;
    Ok(())
}
