use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::api::exchanges::{Pair, PriceSource};
use crate::api::http::{as_decimal, positive, ApiError, PRICE_TIMEOUT};

pub const SATS_PER_BTC: f64 = 100_000_000.0;

/// Pair whose volume rank is always reported
pub const PAIR_OF_INTEREST: &str = "BTCTRY";
pub const TOP_VOLUME_COUNT: usize = 5;

/// A single positive price observed from one source
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub source: PriceSource,
    pub pair: Pair,
    pub value: f64,
    pub fetched_at: DateTime<Utc>,
}

/// Anything that can answer "what does `source` say `pair` costs"
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch_price(&self, source: PriceSource, pair: Pair) -> Result<f64, ApiError>;
}

/// Quotes in the pair's declared source order; `None` marks a failed source
pub type QuoteSet = Vec<(PriceSource, Option<PriceQuote>)>;

pub async fn fetch_all_quotes<F>(fetcher: &F, pair: Pair) -> QuoteSet
where
    F: QuoteFetcher + ?Sized,
{
    fetch_all_quotes_within(fetcher, pair, PRICE_TIMEOUT).await
}

/// Fan out one request per source and join them all.
///
/// A source that errors, times out or reports a non-positive value is
/// logged and becomes `None`; it never affects the other sources.
pub async fn fetch_all_quotes_within<F>(fetcher: &F, pair: Pair, timeout: Duration) -> QuoteSet
where
    F: QuoteFetcher + ?Sized,
{
    let fetches = pair.sources().iter().map(|&source| async move {
        let result = match tokio::time::timeout(timeout, fetcher.fetch_price(source, pair)).await {
            Ok(Ok(value)) => positive(value),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ApiError::Timeout),
        };

        let quote = match result {
            Ok(value) => {
                debug!("{} {} = {}", source, pair, value);
                Some(PriceQuote {
                    source,
                    pair,
                    value,
                    fetched_at: Utc::now(),
                })
            }
            Err(e) => {
                error!("Error fetching {} price from {}: {}", pair, source, e);
                None
            }
        };
        (source, quote)
    });

    // join_all yields results in input order, not completion order
    let quotes = join_all(fetches).await;
    info!(
        "💹 {}: {}/{} sources answered",
        pair,
        available_count(&quotes),
        quotes.len()
    );
    quotes
}

pub fn available_count(quotes: &QuoteSet) -> usize {
    quotes.iter().filter(|(_, q)| q.is_some()).count()
}

/// First usable value in priority order
pub fn first_available(quotes: &QuoteSet) -> Option<f64> {
    quotes.iter().find_map(|(_, q)| q.as_ref().map(|q| q.value))
}

/// One BTCTurk market ranked by volume in its quote currency
#[derive(Debug, Clone, PartialEq)]
pub struct VolumePair {
    pub symbol: String,
    pub base_volume: f64,
    pub last_price: f64,
    pub denominator_volume: f64,
    pub denominator_symbol: String,
}

/// Convert raw ticker entries into pairs sorted by `volume × last`, highest first.
///
/// Entries with a missing symbol or a non-numeric volume or price are dropped.
/// The sort is stable, so equal volumes keep their input order.
pub fn compute_denominator_volumes(raw: &[Value]) -> Vec<VolumePair> {
    let mut pairs: Vec<VolumePair> = raw
        .iter()
        .filter_map(|entry| {
            let symbol = entry.get("pair")?.as_str()?.to_string();
            let base_volume = entry.get("volume").and_then(as_decimal)?;
            let last_price = entry.get("last").and_then(as_decimal)?;
            let denominator_volume = base_volume * last_price;
            if !denominator_volume.is_finite() {
                return None;
            }
            let denominator_symbol = entry
                .get("denominatorSymbol")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            Some(VolumePair {
                symbol,
                base_volume,
                last_price,
                denominator_volume,
                denominator_symbol,
            })
        })
        .collect();

    pairs.sort_by(|a, b| b.denominator_volume.total_cmp(&a.denominator_volume));
    pairs
}

/// 1-based rank of `symbol` in an already ordered list
pub fn rank_pair<'a>(ordered: &'a [VolumePair], symbol: &str) -> Option<(&'a VolumePair, usize)> {
    ordered
        .iter()
        .position(|p| p.symbol == symbol)
        .map(|index| (&ordered[index], index + 1))
}

pub fn top_n(ordered: &[VolumePair], n: usize) -> &[VolumePair] {
    &ordered[..n.min(ordered.len())]
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeReport {
    pub top: Vec<VolumePair>,
    /// Set only when the pair of interest exists but falls outside `top`
    pub outside_top: Option<(VolumePair, usize)>,
}

/// Top `n` pairs plus the rank of `symbol` over the full list when it is not among them
pub fn volume_report(ordered: &[VolumePair], n: usize, symbol: &str) -> VolumeReport {
    let outside_top = rank_pair(ordered, symbol)
        .filter(|(_, rank)| *rank > n)
        .map(|(pair, rank)| (pair.clone(), rank));

    VolumeReport {
        top: top_n(ordered, n).to_vec(),
        outside_top,
    }
}

/// Satoshis bought by `lira` at `btc_try`, or `None` for an unusable rate
pub fn lira_to_sats(lira: f64, btc_try: f64) -> Option<u64> {
    if !(btc_try > 0.0 && btc_try.is_finite()) {
        return None;
    }
    Some((lira / btc_try * SATS_PER_BTC).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// Canned answers per source, with an optional delay to shuffle completion order
    struct MockFetcher {
        answers: HashMap<PriceSource, Result<f64, ApiError>>,
        delays: HashMap<PriceSource, Duration>,
    }

    impl MockFetcher {
        fn new(answers: Vec<(PriceSource, Result<f64, ApiError>)>) -> Self {
            Self {
                answers: answers.into_iter().collect(),
                delays: HashMap::new(),
            }
        }

        fn delayed(mut self, source: PriceSource, delay: Duration) -> Self {
            self.delays.insert(source, delay);
            self
        }
    }

    #[async_trait]
    impl QuoteFetcher for MockFetcher {
        async fn fetch_price(&self, source: PriceSource, _pair: Pair) -> Result<f64, ApiError> {
            if let Some(delay) = self.delays.get(&source) {
                tokio::time::sleep(*delay).await;
            }
            self.answers
                .get(&source)
                .cloned()
                .unwrap_or(Err(ApiError::NotFound(source.to_string())))
        }
    }

    #[tokio::test]
    async fn test_three_failed_sources_keep_priority_order() {
        use PriceSource::*;
        let fetcher = MockFetcher::new(vec![
            (BtcTurk, Ok(65_010.0)),
            (Binance, Ok(65_000.0)),
            (Blink, Err(ApiError::Timeout)),
            (Bitstamp, Ok(64_990.0)),
            (Bitfinex, Ok(65_020.0)),
            (Coinbase, Err(ApiError::ServerError(502, String::new()))),
            (Kraken, Ok(64_980.0)),
            (Paribu, Ok(65_100.0)),
            (Okx, Err(ApiError::MissingField("data".to_string()))),
            (Bitflyer, Ok(65_050.0)),
        ])
        .delayed(BtcTurk, Duration::from_millis(40))
        .delayed(Binance, Duration::from_millis(20));

        let quotes = fetch_all_quotes(&fetcher, Pair::BtcUsd).await;

        let order: Vec<PriceSource> = quotes.iter().map(|(s, _)| *s).collect();
        assert_eq!(order, Pair::BtcUsd.sources());
        assert_eq!(available_count(&quotes), 7);

        let failed: Vec<PriceSource> = quotes
            .iter()
            .filter(|(_, q)| q.is_none())
            .map(|(s, _)| *s)
            .collect();
        assert_eq!(failed, vec![Blink, Coinbase, Okx]);
        assert_eq!(first_available(&quotes), Some(65_010.0));
    }

    #[tokio::test]
    async fn test_zero_value_becomes_failure() {
        let fetcher = MockFetcher::new(vec![
            (PriceSource::BtcTurk, Ok(0.0)),
            (PriceSource::Binance, Ok(2_100_000.0)),
        ]);

        let quotes = fetch_all_quotes(&fetcher, Pair::BtcTry).await;
        assert!(quotes[0].1.is_none());
        assert_eq!(quotes[1].1.as_ref().map(|q| q.value), Some(2_100_000.0));
        assert_eq!(first_available(&quotes), Some(2_100_000.0));
    }

    #[tokio::test]
    async fn test_slow_source_is_cut_off() {
        let fetcher = MockFetcher::new(vec![(PriceSource::Yadio, Ok(32.5))])
            .delayed(PriceSource::Yadio, Duration::from_millis(500));

        let quotes = fetch_all_quotes_within(&fetcher, Pair::UsdTry, Duration::from_millis(20)).await;
        assert_eq!(quotes.len(), 1);
        assert!(quotes[0].1.is_none());
    }

    #[tokio::test]
    async fn test_all_sources_failing_is_empty_not_error() {
        let fetcher = MockFetcher::new(vec![]);
        let quotes = fetch_all_quotes(&fetcher, Pair::BtcTry).await;
        assert_eq!(quotes.len(), 4);
        assert_eq!(available_count(&quotes), 0);
        assert_eq!(first_available(&quotes), None);
    }

    fn tickers() -> Vec<Value> {
        json!([
            { "pair": "ETHTRY", "volume": "100", "last": "100000", "denominatorSymbol": "TRY" },
            { "pair": "USDTTRY", "volume": "5000000", "last": "32", "denominatorSymbol": "TRY" },
            { "pair": "BROKEN", "volume": "n/a", "last": "1", "denominatorSymbol": "TRY" },
            { "pair": "AVAXTRY", "volume": "10000", "last": "1000", "denominatorSymbol": "TRY" },
            { "pair": "BTCUSDT", "volume": "150", "last": "65000", "denominatorSymbol": "USDT" },
            { "pair": "XRPTRY", "volume": "1000000", "last": "10", "denominatorSymbol": "TRY" },
            { "pair": "SOLTRY", "volume": "2000", "last": "5000", "denominatorSymbol": "TRY" },
            { "pair": "BTCTRY", "volume": "4", "last": "2000000", "denominatorSymbol": "TRY" },
            { "pair": "DOGETRY", "volume": "1000000", "last": "10", "denominatorSymbol": "TRY" }
        ])
        .as_array()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_volumes_sorted_descending_and_stable() {
        let ordered = compute_denominator_volumes(&tickers());

        assert_eq!(ordered.len(), 8);
        assert!(ordered.iter().all(|p| p.symbol != "BROKEN"));
        assert!(ordered
            .windows(2)
            .all(|w| w[0].denominator_volume >= w[1].denominator_volume));

        // XRPTRY and DOGETRY tie at 10M; input order wins
        let xrp = ordered.iter().position(|p| p.symbol == "XRPTRY").unwrap();
        let doge = ordered.iter().position(|p| p.symbol == "DOGETRY").unwrap();
        assert!(xrp < doge);
        assert_eq!(ordered[0].symbol, "USDTTRY");
        assert_eq!(ordered[0].denominator_volume, 160_000_000.0);
    }

    #[test]
    fn test_rank_is_one_based() {
        let ordered = compute_denominator_volumes(&tickers());
        let (pair, rank) = rank_pair(&ordered, "USDTTRY").unwrap();
        assert_eq!(rank, 1);
        assert_eq!(pair.denominator_symbol, "TRY");
        assert!(rank_pair(&ordered, "NOPE").is_none());
    }

    #[test]
    fn test_pair_of_interest_reported_outside_top() {
        let ordered = compute_denominator_volumes(&tickers());
        // BTCTRY (8M) sits below five 10M pairs and BTCUSDT (9.75M)
        let report = volume_report(&ordered, TOP_VOLUME_COUNT, PAIR_OF_INTEREST);

        assert_eq!(report.top.len(), 5);
        let (pair, rank) = report.outside_top.expect("BTCTRY must be reported");
        assert_eq!(pair.symbol, "BTCTRY");
        assert_eq!(rank, 8);
        assert_eq!(rank_pair(&ordered, PAIR_OF_INTEREST).unwrap().1, rank);
    }

    #[test]
    fn test_pair_of_interest_inside_top_not_repeated() {
        let ordered = compute_denominator_volumes(&tickers());
        let report = volume_report(&ordered, 20, PAIR_OF_INTEREST);
        assert_eq!(report.top.len(), ordered.len());
        assert!(report.outside_top.is_none());
    }

    #[test]
    fn test_top_n_with_short_list() {
        let ordered = compute_denominator_volumes(&tickers()[..2]);
        assert_eq!(top_n(&ordered, 5).len(), 2);
        assert!(top_n(&[], 5).is_empty());
    }

    #[test]
    fn test_lira_to_sats() {
        assert_eq!(lira_to_sats(100.0, 2_000_000.0), Some(5_000));
        assert_eq!(lira_to_sats(100.0, 0.0), None);
        assert_eq!(lira_to_sats(100.0, -1.0), None);
    }
}
