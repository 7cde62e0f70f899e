//! Telegram message builders (HTML parse mode)

use num_format::{Locale, ToFormattedString};

use crate::api::exchanges::Pair;
use crate::services::price_service::{available_count, QuoteSet, VolumeReport};

pub const NO_PRICE_DATA: &str =
    "Üzgünüm, hiçbir kaynaktan Bitcoin fiyat verisi alınamadı. Lütfen daha sonra tekrar deneyin.";
pub const NO_VOLUME_DATA: &str =
    "Üzgünüm, hacim bilgilerini alırken bir hata oluştu. Lütfen daha sonra tekrar deneyin.";
pub const INVALID_RATE: &str = "Üzgünüm, geçersiz bir kur aldım. Lütfen daha sonra tekrar deneyin.";
pub const GENERIC_ERROR: &str = "Üzgünüm, bir hata oluştu. Lütfen daha sonra tekrar deneyin.";
const NOT_AVAILABLE: &str = "Veri alınamadı";

/// Escape HTML special characters
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Whole units, truncated, with thousands separators
fn whole(value: f64) -> String {
    (value.max(0.0).trunc() as u64).to_formatted_string(&Locale::en)
}

fn price_section(out: &mut String, pair: Pair, quotes: &QuoteSet, symbol: &str) {
    if available_count(quotes) == 0 {
        return;
    }
    out.push_str(&format!("<b>{}</b>\n", pair.label()));
    for (source, quote) in quotes {
        if let Some(quote) = quote {
            out.push_str(&format!("{}: {}{}\n", source.name(), symbol, whole(quote.value)));
        }
    }
    out.push('\n');
}

/// BTC/TRY then BTC/USD, each in source priority order; failed sources omitted
pub fn format_price_message(btc_try: &QuoteSet, btc_usd: &QuoteSet) -> String {
    if available_count(btc_try) == 0 && available_count(btc_usd) == 0 {
        return NO_PRICE_DATA.to_string();
    }

    let mut message = String::from("💰 <b>Güncel Bitcoin Fiyatları</b>\n\n");
    price_section(&mut message, Pair::BtcTry, btc_try, "₺");
    price_section(&mut message, Pair::BtcUsd, btc_usd, "$");
    message.push_str(
        "<i>Veri kaynakları: Blink API, BTCTurk, Binance, Bitfinex, Kraken, Paribu, Bitstamp, Coinbase, OKX, Bitflyer</i>",
    );
    message
}

pub fn format_volume_message(report: &VolumeReport) -> String {
    if report.top.is_empty() {
        return NO_VOLUME_DATA.to_string();
    }

    let mut message = format!(
        "📊 <b>En Yüksek Hacimli {} Para Birimi Çifti</b>\n\n",
        report.top.len()
    );
    for (i, pair) in report.top.iter().enumerate() {
        message.push_str(&format!(
            "{}. <b>{}</b>: {} {}\n",
            i + 1,
            escape_html(&pair.symbol),
            whole(pair.denominator_volume),
            escape_html(&pair.denominator_symbol)
        ));
    }

    if let Some((pair, rank)) = &report.outside_top {
        message.push_str(&format!(
            "\n<b>{}</b>: {} {} (Genel sıralama: #{})",
            escape_html(&pair.symbol),
            whole(pair.denominator_volume),
            escape_html(&pair.denominator_symbol),
            rank
        ));
    }

    message.push_str("\n<i>Veri kaynağı: BTCTurk</i>");
    message
}

pub fn format_dollar_message(usdt_try: Option<f64>, usd_try: Option<f64>) -> String {
    let rate = |value: Option<f64>| match value {
        Some(v) => format!("₺{:.2}", v),
        None => NOT_AVAILABLE.to_string(),
    };

    format!(
        "💵 <b>Güncel Dolar Kurları</b>\n\n\
         <b>USDT/TRY:</b> {}\n\
         <b>USD/TRY:</b> {}\n\n\
         <i>Veri kaynakları: BTCTurk, Yadio</i>",
        rate(usdt_try),
        rate(usd_try)
    )
}

pub fn format_lira_message(lira: u64, sats: u64, btc_try: f64) -> String {
    format!(
        "💰 <b>{} Türk Lirası = {} satoshi</b>\n\n\
         Kur: 1 BTC = ₺{}\n\
         Veri kaynağı: BTCTurk\n\
         <i>Şu anda güncellendi</i>",
        lira,
        sats,
        whole(btc_try)
    )
}
