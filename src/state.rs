use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::api::{BlinkClient, ExchangeClient};
use crate::config::Config;
use crate::services::payment_service::{LightningWallet, PaymentLock};
use crate::services::quote_service::{AnsweredSources, QuoteBook, QuoteChats};
use crate::utils::{BanList, RateLimiter};

/// Chats where `/gimmecheese` is waiting for an address or invoice
#[derive(Debug, Default)]
pub struct AwaitingPaymentInput {
    chats: Mutex<HashSet<i64>>,
}

impl AwaitingPaymentInput {
    pub async fn begin(&self, chat_id: i64) {
        self.chats.lock().await.insert(chat_id);
    }

    /// Returns true if the chat was waiting
    pub async fn end(&self, chat_id: i64) -> bool {
        self.chats.lock().await.remove(&chat_id)
    }

    pub async fn is_waiting(&self, chat_id: i64) -> bool {
        self.chats.lock().await.contains(&chat_id)
    }
}

/// Everything a handler needs, shared behind an `Arc`
pub struct AppState {
    pub config: Config,
    pub exchanges: ExchangeClient,
    /// Absent when no wallet API key is configured
    pub wallet: Option<Arc<dyn LightningWallet>>,
    pub rate_limiter: RateLimiter,
    pub bans: BanList,
    pub payment_lock: PaymentLock,
    pub awaiting_payment: AwaitingPaymentInput,
    pub quotes: QuoteBook,
    pub quote_chats: QuoteChats,
    pub answered_sources: AnsweredSources,
}

impl AppState {
    pub fn new(config: Config, quotes: QuoteBook) -> Self {
        let wallet: Option<Arc<dyn LightningWallet>> = match &config.blink_api_key {
            Some(key) => Some(Arc::new(BlinkClient::new(
                key.clone(),
                config.endpoints.blink.clone(),
            ))),
            None => {
                warn!("BLINK_API_KEY not set, /gimmecheese is disabled");
                None
            }
        };
        info!("{} quotes available", quotes.len());

        Self {
            exchanges: ExchangeClient::new(config.endpoints.clone()),
            wallet,
            rate_limiter: RateLimiter::new(config.private_chat_cooldown, config.public_group_cooldown),
            bans: BanList::new(),
            payment_lock: PaymentLock::new(),
            awaiting_payment: AwaitingPaymentInput::default(),
            quotes,
            quote_chats: QuoteChats::new(),
            answered_sources: AnsweredSources::default(),
            config,
        }
    }
}
