pub mod client;
pub mod models;

pub use client::BlinkClient;
pub use models::{GraphQlResponse, PaymentOutcome, PaymentStatus, WalletSnapshot};
