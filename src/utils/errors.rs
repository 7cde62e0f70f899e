use thiserror::Error;

use crate::api::http::ApiError;
use crate::services::payment_service::PaymentError;
use crate::utils::format::GENERIC_ERROR;

/// Errors surfaced by a command handler
#[derive(Debug, Error)]
pub enum BotError {
    #[error("Telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

impl BotError {
    /// Short Turkish text shown to the user in place of the raw error
    pub fn user_message(&self) -> String {
        match self {
            BotError::Payment(e) => payment_message(e),
            BotError::Api(ApiError::RateLimited(_)) => {
                "⚠️ Veri sağlayıcısı istek sınırına ulaşıldı. Lütfen biraz sonra tekrar deneyin.".to_string()
            }
            BotError::Api(ApiError::Timeout) => {
                "⚠️ Sunucu zamanında yanıt vermedi. Lütfen daha sonra tekrar deneyin.".to_string()
            }
            _ => GENERIC_ERROR.to_string(),
        }
    }
}

pub fn payment_message(error: &PaymentError) -> String {
    match error {
        PaymentError::InProgress => "Zaten bir ödeme işlemi devam ediyor. Lütfen bekleyin.".to_string(),
        PaymentError::Unrecognized => "Geçersiz giriş. Lütfen bir Lightning adresi (kullanıcı@domain.com) \
             veya Lightning faturası girin."
            .to_string(),
        PaymentError::ExceedsLimit { amount_sats, limit_sats } => format!(
            "Fatura tutarı ({} satoshi) izin verilen üst sınırı ({} satoshi) aşıyor.",
            amount_sats, limit_sats
        ),
        PaymentError::NoBtcWallet => "BTC cüzdanı bulunamadı.".to_string(),
        PaymentError::InsufficientBalance { required_sats, .. } => {
            format!("Yetersiz bakiye. En az {} satoshi gerekiyor.", required_sats)
        }
        PaymentError::Rejected(reason) => format!("❌ Ödeme gönderilemedi: {}", reason),
        PaymentError::Api(e) => format!("❌ Ödeme gönderilemedi: {}", e),
    }
}
