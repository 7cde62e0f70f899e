//! Ticker adapters for every price source the bot quotes
//!
//! Each exchange answers with its own JSON shape. Requests are built per
//! `(source, pair)` and the one scalar price is pulled out by a pure
//! extractor, so the shapes can be tested without a network.

use std::fmt;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use crate::api::blink::GraphQlResponse;
use crate::api::http::{as_decimal, positive, send_json, ApiError, PRICE_TIMEOUT};
use crate::config::Endpoints;
use crate::services::price_service::QuoteFetcher;

/// Blink reports `base × 10^-offset` in cents; this turns it into dollars.
/// Specific to Blink's documented unit, not a general rule.
pub const BLINK_PRICE_UNIT_DIVISOR: f64 = 100.0;

const BLINK_PRICE_QUERY: &str = r#"
query BtcPriceList($range: PriceGraphRange!) {
  btcPriceList(range: $range) {
    price {
      base
      offset
      currencyUnit
    }
    timestamp
  }
}
"#;

/// Quoted currency pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pair {
    BtcUsd,
    BtcTry,
    UsdtTry,
    UsdTry,
}

impl Pair {
    pub fn label(&self) -> &'static str {
        match self {
            Pair::BtcUsd => "BTC/USD",
            Pair::BtcTry => "BTC/TRY",
            Pair::UsdtTry => "USDT/TRY",
            Pair::UsdTry => "USD/TRY",
        }
    }

    /// Sources for this pair, in the order they are presented to users
    pub fn sources(&self) -> &'static [PriceSource] {
        use PriceSource::*;
        match self {
            Pair::BtcTry => &[BtcTurk, Binance, Bitfinex, Paribu],
            Pair::BtcUsd => &[
                BtcTurk, Binance, Blink, Bitstamp, Bitfinex, Coinbase, Kraken, Paribu, Okx, Bitflyer,
            ],
            Pair::UsdtTry => &[BtcTurk],
            Pair::UsdTry => &[Yadio],
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceSource {
    BtcTurk,
    Binance,
    Blink,
    Bitstamp,
    Bitfinex,
    Coinbase,
    Kraken,
    Paribu,
    Okx,
    Bitflyer,
    Yadio,
}

impl PriceSource {
    pub fn name(&self) -> &'static str {
        match self {
            PriceSource::BtcTurk => "BTCTurk",
            PriceSource::Binance => "Binance",
            PriceSource::Blink => "Blink",
            PriceSource::Bitstamp => "Bitstamp",
            PriceSource::Bitfinex => "Bitfinex",
            PriceSource::Coinbase => "Coinbase",
            PriceSource::Kraken => "Kraken",
            PriceSource::Paribu => "Paribu",
            PriceSource::Okx => "OKX",
            PriceSource::Bitflyer => "Bitflyer",
            PriceSource::Yadio => "Yadio",
        }
    }

    pub fn supports(&self, pair: Pair) -> bool {
        pair.sources().contains(self)
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HTTP client over every exchange endpoint
#[derive(Debug, Clone)]
pub struct ExchangeClient {
    http_client: HttpClient,
    endpoints: Endpoints,
}

impl ExchangeClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoints,
        }
    }

    fn get(&self, url: String) -> RequestBuilder {
        self.http_client.get(url).timeout(PRICE_TIMEOUT)
    }

    fn request_for(&self, source: PriceSource, pair: Pair) -> Result<RequestBuilder, ApiError> {
        let e = &self.endpoints;
        let request = match (source, pair) {
            (PriceSource::BtcTurk, _) => self.get(format!("{}/api/v2/ticker", e.btcturk)),
            (PriceSource::Binance, _) => self
                .get(format!("{}/api/v3/ticker/price", e.binance))
                .query(&[("symbol", binance_symbol(pair)?)]),
            (PriceSource::Blink, _) => self
                .http_client
                .post(&e.blink)
                .timeout(PRICE_TIMEOUT)
                .json(&json!({ "query": BLINK_PRICE_QUERY, "variables": { "range": "ONE_DAY" } })),
            (PriceSource::Bitstamp, _) => self.get(format!("{}/api/v2/ticker/btcusd/", e.bitstamp)),
            (PriceSource::Bitfinex, _) => {
                self.get(format!("{}/v2/ticker/{}", e.bitfinex, bitfinex_symbol(pair)?))
            }
            (PriceSource::Coinbase, _) => self.get(format!("{}/v2/prices/BTC-USD/spot", e.coinbase)),
            (PriceSource::Kraken, _) => self
                .get(format!("{}/0/public/Ticker", e.kraken))
                .query(&[("pair", "XBTUSDT")]),
            (PriceSource::Paribu, _) => self.get(format!("{}/ticker", e.paribu)),
            (PriceSource::Okx, _) => self
                .get(format!("{}/api/v5/market/ticker", e.okx))
                .query(&[("instId", "BTC-USDT")]),
            (PriceSource::Bitflyer, _) => self
                .get(format!("{}/v1/ticker", e.bitflyer))
                .query(&[("product_code", "BTC_USD")]),
            (PriceSource::Yadio, _) => self.get(format!("{}/exrates/USD", e.yadio)),
        };
        Ok(request)
    }

    /// Raw BTCTurk ticker entries, used for volume ranking
    pub async fn btcturk_tickers(&self) -> Result<Vec<Value>, ApiError> {
        let body = send_json(self.get(format!("{}/api/v2/ticker", self.endpoints.btcturk))).await?;
        match body.get("data") {
            Some(Value::Array(entries)) => Ok(entries.clone()),
            _ => Err(ApiError::MissingField("data".to_string())),
        }
    }
}

#[async_trait]
impl QuoteFetcher for ExchangeClient {
    async fn fetch_price(&self, source: PriceSource, pair: Pair) -> Result<f64, ApiError> {
        if !source.supports(pair) {
            return Err(unsupported(source, pair));
        }
        debug!("Fetching {} from {}", pair, source);
        let body = send_json(self.request_for(source, pair)?).await?;
        extract_price(source, pair, &body)
    }
}

fn unsupported(source: PriceSource, pair: Pair) -> ApiError {
    ApiError::RequestError(format!("{} does not quote {}", source, pair))
}

fn binance_symbol(pair: Pair) -> Result<&'static str, ApiError> {
    match pair {
        Pair::BtcUsd => Ok("BTCUSDT"),
        Pair::BtcTry => Ok("BTCTRY"),
        _ => Err(unsupported(PriceSource::Binance, pair)),
    }
}

fn bitfinex_symbol(pair: Pair) -> Result<&'static str, ApiError> {
    match pair {
        Pair::BtcUsd => Ok("tBTCUSD"),
        Pair::BtcTry => Ok("tBTCTRY"),
        _ => Err(unsupported(PriceSource::Bitfinex, pair)),
    }
}

fn btcturk_symbol(pair: Pair) -> Result<&'static str, ApiError> {
    match pair {
        Pair::BtcTry => Ok("BTCTRY"),
        Pair::BtcUsd => Ok("BTCUSDT"),
        Pair::UsdtTry => Ok("USDTTRY"),
        Pair::UsdTry => Err(unsupported(PriceSource::BtcTurk, pair)),
    }
}

fn paribu_symbol(pair: Pair) -> Result<&'static str, ApiError> {
    match pair {
        Pair::BtcUsd => Ok("BTC_USDT"),
        Pair::BtcTry => Ok("BTC_TL"),
        _ => Err(unsupported(PriceSource::Paribu, pair)),
    }
}

fn number_at(body: &Value, pointer: &str) -> Result<f64, ApiError> {
    body.pointer(pointer)
        .and_then(as_decimal)
        .ok_or_else(|| ApiError::MissingField(pointer.to_string()))
}

/// Pull the single price scalar out of a source's response body
pub fn extract_price(source: PriceSource, pair: Pair, body: &Value) -> Result<f64, ApiError> {
    let raw = match source {
        PriceSource::BtcTurk => {
            let symbol = btcturk_symbol(pair)?;
            let entries = body
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| ApiError::MissingField("data".to_string()))?;
            let entry = entries
                .iter()
                .find(|e| e.get("pair").and_then(Value::as_str) == Some(symbol))
                .ok_or_else(|| ApiError::MissingField(format!("data[pair={}]", symbol)))?;
            number_at(entry, "/last")?
        }
        PriceSource::Binance => number_at(body, "/price")?,
        PriceSource::Blink => extract_blink_price(body)?,
        PriceSource::Bitstamp => number_at(body, "/last")?,
        PriceSource::Bitfinex => number_at(body, "/6")?,
        PriceSource::Coinbase => number_at(body, "/data/amount")?,
        PriceSource::Kraken => number_at(body, "/result/XBTUSDT/c/0")?,
        PriceSource::Paribu => number_at(body, &format!("/{}/last", paribu_symbol(pair)?))?,
        PriceSource::Okx => number_at(body, "/data/0/last")?,
        PriceSource::Bitflyer => number_at(body, "/ltp")?,
        PriceSource::Yadio => number_at(body, "/USD/TRY")?,
    };
    positive(raw)
}

/// Newest point of `btcPriceList`, converted with `BLINK_PRICE_UNIT_DIVISOR`
fn extract_blink_price(body: &Value) -> Result<f64, ApiError> {
    let response: GraphQlResponse = serde_json::from_value(body.clone())
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    let points = response
        .operation("btcPriceList")?
        .as_array()
        .filter(|points| !points.is_empty())
        .ok_or_else(|| ApiError::MissingField("data.btcPriceList".to_string()))?;

    let timestamp = |point: &Value| point.get("timestamp").and_then(as_decimal).unwrap_or(0.0);
    let latest = points
        .iter()
        .fold(None::<&Value>, |best, point| match best {
            Some(b) if timestamp(b) >= timestamp(point) => Some(b),
            _ => Some(point),
        })
        .ok_or_else(|| ApiError::MissingField("data.btcPriceList".to_string()))?;

    let base = number_at(latest, "/price/base")?;
    let offset = number_at(latest, "/price/offset")? as i32;

    Ok(base * 10f64.powi(-offset) / BLINK_PRICE_UNIT_DIVISOR)
}
