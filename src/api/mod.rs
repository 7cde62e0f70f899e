pub mod blink;
pub mod exchanges;
pub mod http;

pub use blink::BlinkClient;
pub use exchanges::{ExchangeClient, Pair, PriceSource};
