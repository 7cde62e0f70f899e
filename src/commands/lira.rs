use teloxide::prelude::*;
use tracing::error;

use super::edit_html;
use crate::api::{Pair, PriceSource};
use crate::services::price_service::{lira_to_sats, QuoteFetcher};
use crate::state::AppState;
use crate::utils::format::{format_lira_message, INVALID_RATE};
use crate::utils::BotError;

const LIRA_AMOUNT: u64 = 100;

pub async fn execute(bot: &Bot, msg: &Message, state: &AppState) -> Result<(), BotError> {
    let loading = bot
        .send_message(msg.chat.id, "Hesaplanıyor, lütfen bekleyin...")
        .await?;

    let rate = state
        .exchanges
        .fetch_price(PriceSource::BtcTurk, Pair::BtcTry)
        .await
        .map_err(|e| error!("Error fetching BTC/TRY from BTCTurk: {}", e))
        .ok();

    let message = match rate.and_then(|r| lira_to_sats(LIRA_AMOUNT as f64, r).map(|sats| (r, sats))) {
        Some((rate, sats)) => format_lira_message(LIRA_AMOUNT, sats, rate),
        None => INVALID_RATE.to_string(),
    };
    edit_html(bot, &loading, message).await
}
