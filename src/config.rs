//! Environment-driven configuration
//!
//! Everything the bot needs at runtime is read once at startup from the
//! process environment (optionally seeded from a `.env` file).

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    /// `<numeric bot id>:<secret>` as issued by BotFather
    static ref TOKEN_PATTERN: Regex = Regex::new(r"^\d+:[A-Za-z0-9_-]+$").unwrap();
}

const DEFAULT_ADMIN_USERNAME: &str = "pretyflaco";
const DEFAULT_PUBLIC_GROUP_COOLDOWN_SECS: u64 = 3600;
const DEFAULT_PRIVATE_CHAT_COOLDOWN_SECS: u64 = 900;
const DEFAULT_QUOTE_INTERVAL_SECS: u64 = 86_400;
const DEFAULT_SEND_AMOUNT_SATS: u64 = 21;
const DEFAULT_MIN_WALLET_BALANCE_SATS: u64 = 1000;
const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:5000";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    #[error("TELEGRAM_BOT_TOKEN format appears to be invalid (expected 123456789:ABCDefGhIJklmNoPQRsTUVwxyZ)")]
    InvalidToken,
    #[error("Invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Base URLs of every external price source and the wallet API
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub btcturk: String,
    pub binance: String,
    pub blink: String,
    pub bitstamp: String,
    pub bitfinex: String,
    pub coinbase: String,
    pub kraken: String,
    pub paribu: String,
    pub okx: String,
    pub bitflyer: String,
    pub yadio: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            btcturk: "https://api.btcturk.com".to_string(),
            binance: "https://api.binance.com".to_string(),
            blink: "https://api.blink.sv/graphql".to_string(),
            bitstamp: "https://www.bitstamp.net".to_string(),
            bitfinex: "https://api-pub.bitfinex.com".to_string(),
            coinbase: "https://api.coinbase.com".to_string(),
            kraken: "https://api.kraken.com".to_string(),
            paribu: "https://www.paribu.com".to_string(),
            okx: "https://www.okx.com".to_string(),
            bitflyer: "https://api.bitflyer.com".to_string(),
            yadio: "https://api.yadio.io".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every source at a single host (used with mock servers)
    #[cfg(test)]
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            btcturk: base.clone(),
            binance: base.clone(),
            blink: format!("{}/graphql", base),
            bitstamp: base.clone(),
            bitfinex: base.clone(),
            coinbase: base.clone(),
            kraken: base.clone(),
            paribu: base.clone(),
            okx: base.clone(),
            bitflyer: base.clone(),
            yadio: base,
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub admin_username: String,
    pub blink_api_key: Option<String>,
    pub public_group_cooldown: Duration,
    pub private_chat_cooldown: Duration,
    pub quote_interval: Duration,
    /// Fixed amount sent by `/gimmecheese`, also the ceiling for invoices
    pub send_amount_sats: u64,
    pub min_wallet_balance_sats: u64,
    pub quotes_path: String,
    pub quotes_fallback_path: String,
    pub health_addr: SocketAddr,
    pub endpoints: Endpoints,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_bot_token", &"<redacted>")
            .field("admin_username", &self.admin_username)
            .field(
                "blink_api_key",
                &self.blink_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("public_group_cooldown", &self.public_group_cooldown)
            .field("private_chat_cooldown", &self.private_chat_cooldown)
            .field("quote_interval", &self.quote_interval)
            .field("send_amount_sats", &self.send_amount_sats)
            .field("min_wallet_balance_sats", &self.min_wallet_balance_sats)
            .field("quotes_path", &self.quotes_path)
            .field("quotes_fallback_path", &self.quotes_fallback_path)
            .field("health_addr", &self.health_addr)
            .field("endpoints", &self.endpoints)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("TELEGRAM_BOT_TOKEN")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?;

        if !TOKEN_PATTERN.is_match(&token) {
            return Err(ConfigError::InvalidToken);
        }

        let admin_username = lookup("ADMIN_USERNAME")
            .map(|u| u.trim().trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string());

        let blink_api_key = lookup("BLINK_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let health_addr = match lookup("HEALTH_ADDR") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "HEALTH_ADDR",
                value: raw.clone(),
            })?,
            None => DEFAULT_HEALTH_ADDR.parse().map_err(|_| ConfigError::Invalid {
                key: "HEALTH_ADDR",
                value: DEFAULT_HEALTH_ADDR.to_string(),
            })?,
        };

        Ok(Self {
            telegram_bot_token: token,
            admin_username,
            blink_api_key,
            public_group_cooldown: Duration::from_secs(parse_u64(
                &lookup,
                "PUBLIC_GROUP_COOLDOWN",
                DEFAULT_PUBLIC_GROUP_COOLDOWN_SECS,
            )?),
            private_chat_cooldown: Duration::from_secs(parse_u64(
                &lookup,
                "PRIVATE_CHAT_COOLDOWN",
                DEFAULT_PRIVATE_CHAT_COOLDOWN_SECS,
            )?),
            quote_interval: Duration::from_secs(parse_u64(
                &lookup,
                "QUOTE_INTERVAL",
                DEFAULT_QUOTE_INTERVAL_SECS,
            )?),
            send_amount_sats: parse_u64(&lookup, "GIMMECHEESE_AMOUNT_SATS", DEFAULT_SEND_AMOUNT_SATS)?,
            min_wallet_balance_sats: parse_u64(
                &lookup,
                "GIMMECHEESE_MIN_BALANCE_SATS",
                DEFAULT_MIN_WALLET_BALANCE_SATS,
            )?,
            quotes_path: lookup("QUOTES_PATH").unwrap_or_else(|| "quotes_tr.json".to_string()),
            quotes_fallback_path: lookup("QUOTES_FALLBACK_PATH")
                .unwrap_or_else(|| "quotes.json".to_string()),
            health_addr,
            endpoints: Endpoints::default(),
        })
    }

    /// Case-insensitive admin check; users without a username are never admin
    pub fn is_admin(&self, username: Option<&str>) -> bool {
        username
            .map(|u| u.eq_ignore_ascii_case(&self.admin_username))
            .unwrap_or(false)
    }
}

fn parse_u64<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key,
            value: raw,
        }),
        _ => Ok(default),
    }
}
