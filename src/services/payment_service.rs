//! Lightning payment classification, routing and execution
//!
//! Free text from the admin is classified into a `PaymentIntent`, turned
//! into a `PaymentPlan` bounded by the configured send limit, and finally
//! executed against a `LightningWallet` while a `PaymentLock` is held.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::blink::{PaymentOutcome, PaymentStatus, WalletSnapshot};
use crate::api::http::ApiError;

/// What a pasted payment destination turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentIntent {
    LightningAddress { value: String },
    Bolt11WithAmount { raw: String, amount_sats: u64 },
    Bolt11NoAmount { raw: String },
    /// Looks like an invoice but its amount field could not be decoded
    Bolt11Unknown { raw: String },
    Unknown { raw: String },
}

enum AmountField {
    Absent,
    Sats(u64),
    Unreadable,
}

/// Classify user input. Pure; never fails.
pub fn classify(input: &str) -> PaymentIntent {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();
    let is_invoice = lower.starts_with("ln");

    if trimmed.contains('@') && !is_invoice {
        return PaymentIntent::LightningAddress {
            value: trimmed.to_string(),
        };
    }

    if !is_invoice {
        return PaymentIntent::Unknown {
            raw: trimmed.to_string(),
        };
    }

    let raw = trimmed.to_string();
    match invoice_amount(&lower[2..]) {
        AmountField::Absent => PaymentIntent::Bolt11NoAmount { raw },
        AmountField::Sats(amount_sats) => PaymentIntent::Bolt11WithAmount { raw, amount_sats },
        AmountField::Unreadable => PaymentIntent::Bolt11Unknown { raw },
    }
}

/// Decode the human-readable amount that follows `ln` + network tag.
///
/// Multipliers: `m` milli, `u` micro, `n` nano (floored to 1 sat),
/// `p` pico (treated as no amount).
fn invoice_amount(after_prefix: &str) -> AmountField {
    let rest = after_prefix.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let digit_count = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digit_count == 0 || rest[digit_count..].starts_with('p') {
        return AmountField::Absent;
    }

    let n = match rest[..digit_count].parse::<u64>() {
        Ok(0) | Err(_) => return AmountField::Unreadable,
        Ok(n) => n,
    };

    let sats = match rest[digit_count..].chars().next() {
        Some('m') => n.checked_mul(100_000),
        Some('u') => n.checked_mul(100),
        Some('n') => Some((n / 10).max(1)),
        _ => None,
    };

    sats.map_or(AmountField::Unreadable, AmountField::Sats)
}

/// A payment ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentPlan {
    ToAddress { address: String, amount_sats: u64 },
    Invoice { payment_request: String, amount_sats: u64 },
    NoAmountInvoice { payment_request: String, amount_sats: u64 },
}

impl PaymentPlan {
    pub fn amount_sats(&self) -> u64 {
        match self {
            PaymentPlan::ToAddress { amount_sats, .. }
            | PaymentPlan::Invoice { amount_sats, .. }
            | PaymentPlan::NoAmountInvoice { amount_sats, .. } => *amount_sats,
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            PaymentPlan::ToAddress { address, .. } => address,
            PaymentPlan::Invoice { payment_request, .. }
            | PaymentPlan::NoAmountInvoice { payment_request, .. } => payment_request,
        }
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("A payment is already in progress")]
    InProgress,
    #[error("Input is neither a Lightning address nor a readable invoice")]
    Unrecognized,
    #[error("Invoice amount {amount_sats} sats exceeds the limit of {limit_sats} sats")]
    ExceedsLimit { amount_sats: u64, limit_sats: u64 },
    #[error("No BTC wallet found")]
    NoBtcWallet,
    #[error("Insufficient balance: {balance_sats} sats, at least {required_sats} required")]
    InsufficientBalance { balance_sats: u64, required_sats: u64 },
    #[error("Payment rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Route an intent to a plan. Unknown inputs are rejected here, before any
/// network call is made.
pub fn plan_payment(intent: &PaymentIntent, send_limit_sats: u64) -> Result<PaymentPlan, PaymentError> {
    match intent {
        PaymentIntent::LightningAddress { value } => Ok(PaymentPlan::ToAddress {
            address: value.clone(),
            amount_sats: send_limit_sats,
        }),
        PaymentIntent::Bolt11WithAmount { raw, amount_sats } => {
            if *amount_sats > send_limit_sats {
                return Err(PaymentError::ExceedsLimit {
                    amount_sats: *amount_sats,
                    limit_sats: send_limit_sats,
                });
            }
            Ok(PaymentPlan::Invoice {
                payment_request: raw.clone(),
                amount_sats: *amount_sats,
            })
        }
        PaymentIntent::Bolt11NoAmount { raw } => Ok(PaymentPlan::NoAmountInvoice {
            payment_request: raw.clone(),
            amount_sats: send_limit_sats,
        }),
        PaymentIntent::Bolt11Unknown { .. } | PaymentIntent::Unknown { .. } => {
            Err(PaymentError::Unrecognized)
        }
    }
}

/// Wallet provider operations needed to send a payment
#[async_trait]
pub trait LightningWallet: Send + Sync {
    async fn wallets(&self) -> Result<Vec<WalletSnapshot>, ApiError>;

    async fn pay_address(
        &self,
        wallet_id: &str,
        address: &str,
        amount_sats: u64,
    ) -> Result<PaymentOutcome, ApiError>;

    async fn pay_invoice(&self, wallet_id: &str, payment_request: &str) -> Result<PaymentOutcome, ApiError>;

    async fn pay_no_amount_invoice(
        &self,
        wallet_id: &str,
        payment_request: &str,
        amount_sats: u64,
    ) -> Result<PaymentOutcome, ApiError>;
}

/// Process-wide "a payment is in flight" flag
#[derive(Debug, Clone, Default)]
pub struct PaymentLock {
    in_progress: Arc<AtomicBool>,
}

/// Clears the lock when dropped
#[derive(Debug)]
pub struct PaymentGuard {
    in_progress: Arc<AtomicBool>,
}

impl PaymentLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<PaymentGuard> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PaymentGuard {
                in_progress: Arc::clone(&self.in_progress),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

impl Drop for PaymentGuard {
    fn drop(&mut self) {
        self.in_progress.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Local reference for log correlation
    pub payment_id: String,
    pub recipient: String,
    pub amount_sats: u64,
    pub status: PaymentStatus,
}

/// Send `plan` from the BTC wallet. Only `SUCCESS` counts as success.
pub async fn execute_payment<W>(
    wallet: &W,
    lock: &PaymentLock,
    plan: &PaymentPlan,
    min_balance_sats: u64,
) -> Result<PaymentReceipt, PaymentError>
where
    W: LightningWallet + ?Sized,
{
    let _guard = lock.try_acquire().ok_or(PaymentError::InProgress)?;
    let payment_id = Uuid::new_v4().to_string();

    let wallets = wallet.wallets().await?;
    let btc_wallet = wallets
        .iter()
        .find(|w| w.currency.eq_ignore_ascii_case("BTC"))
        .ok_or(PaymentError::NoBtcWallet)?;

    let required_sats = min_balance_sats.max(plan.amount_sats());
    if btc_wallet.balance_sats < required_sats {
        warn!(
            "Payment {}: BTC wallet balance {} below required {}",
            payment_id, btc_wallet.balance_sats, required_sats
        );
        return Err(PaymentError::InsufficientBalance {
            balance_sats: btc_wallet.balance_sats,
            required_sats,
        });
    }

    let wallet_id = btc_wallet.wallet_id.as_str();
    let outcome = match plan {
        PaymentPlan::ToAddress { address, amount_sats } => {
            wallet.pay_address(wallet_id, address, *amount_sats).await?
        }
        PaymentPlan::Invoice { payment_request, .. } => {
            wallet.pay_invoice(wallet_id, payment_request).await?
        }
        PaymentPlan::NoAmountInvoice {
            payment_request,
            amount_sats,
        } => {
            wallet
                .pay_no_amount_invoice(wallet_id, payment_request, *amount_sats)
                .await?
        }
    };

    if !outcome.is_success() {
        let reason = outcome
            .first_error_message()
            .map(str::to_string)
            .unwrap_or_else(|| outcome.status.to_string());
        warn!("Payment {} not settled ({}): {}", payment_id, outcome.status, reason);
        return Err(PaymentError::Rejected(reason));
    }

    info!("⚡ Payment {} sent {} sats", payment_id, plan.amount_sats());
    Ok(PaymentReceipt {
        payment_id,
        recipient: plan.recipient().to_string(),
        amount_sats: plan.amount_sats(),
        status: outcome.status,
    })
}
