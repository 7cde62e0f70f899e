use teloxide::prelude::*;
use tracing::info;

use super::edit_html;
use crate::services::payment_service::{classify, execute_payment, plan_payment, PaymentError, PaymentReceipt};
use crate::state::AppState;
use crate::utils::errors::payment_message;
use crate::utils::format::escape_html;
use crate::utils::BotError;

/// Enter the "awaiting payment input" state for this chat
pub async fn execute(bot: &Bot, msg: &Message, state: &AppState) -> Result<(), BotError> {
    let username = msg.from.as_ref().and_then(|u| u.username.as_deref());
    let chat_id = msg.chat.id;

    if !state.config.is_admin(username) {
        bot.send_message(chat_id, "Bu komutu sadece bot yöneticisi kullanabilir.")
            .await?;
        return Ok(());
    }
    if !msg.chat.is_private() {
        bot.send_message(chat_id, "Bu komut sadece özel mesajlarda kullanılabilir.")
            .await?;
        return Ok(());
    }
    if state.payment_lock.is_busy() {
        bot.send_message(chat_id, payment_message(&PaymentError::InProgress))
            .await?;
        return Ok(());
    }
    if state.wallet.is_none() {
        bot.send_message(
            chat_id,
            "Blink API anahtarı ayarlanmamış. Lütfen .env dosyasında BLINK_API_KEY değerini güncelleyin.",
        )
        .await?;
        return Ok(());
    }

    state.awaiting_payment.begin(chat_id.0).await;
    bot.send_message(
        chat_id,
        "Lütfen ödeme göndermek istediğiniz Lightning adresini veya Lightning faturasını girin.\n\
         Örnek: satoshi@lightning.com\n\n\
         İptal etmek için /cancel yazın.",
    )
    .await?;
    Ok(())
}

pub async fn cancel(bot: &Bot, msg: &Message, state: &AppState) -> Result<(), BotError> {
    if state.awaiting_payment.end(msg.chat.id.0).await {
        bot.send_message(msg.chat.id, "İşlem iptal edildi.").await?;
    }
    Ok(())
}

fn receipt_message(receipt: &PaymentReceipt) -> String {
    format!(
        "✅ Ödeme başarıyla gönderildi!\n\n\
         Alıcı: <code>{}</code>\n\
         Miktar: {} satoshi\n\
         İşlem No: <code>{}</code>",
        escape_html(&receipt.recipient),
        receipt.amount_sats,
        receipt.payment_id
    )
}

/// Classify the awaited input and pay it.
///
/// Input that cannot be routed keeps the conversation open so the admin can
/// try again; anything routable ends it, whatever the payment outcome.
pub async fn process_input(bot: &Bot, msg: &Message, state: &AppState, text: &str) -> Result<(), BotError> {
    let chat_id = msg.chat.id;
    let intent = classify(text);
    info!("Payment input classified as {:?}", intent);

    let plan = match plan_payment(&intent, state.config.send_amount_sats) {
        Ok(plan) => plan,
        Err(e) => {
            bot.send_message(chat_id, payment_message(&e)).await?;
            return Ok(());
        }
    };

    state.awaiting_payment.end(chat_id.0).await;
    let Some(wallet) = state.wallet.as_ref() else {
        return Err(PaymentError::NoBtcWallet.into());
    };

    let processing = bot
        .send_message(chat_id, "Lightning ödemesi işleniyor...")
        .await?;

    let message = match execute_payment(
        wallet.as_ref(),
        &state.payment_lock,
        &plan,
        state.config.min_wallet_balance_sats,
    )
    .await
    {
        Ok(receipt) => receipt_message(&receipt),
        Err(e) => escape_html(&payment_message(&e)),
    };
    edit_html(bot, &processing, message).await
}
