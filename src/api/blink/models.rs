use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::http::{as_decimal, ApiError};

/// One entry of a GraphQL `errors` array (top-level or per-mutation)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub path: Option<Vec<Value>>,
}

/// Settlement status reported by a payment mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Success,
    #[serde(alias = "FAILURE")]
    Error,
    AlreadyPaid,
    Pending,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Error => "ERROR",
            PaymentStatus::AlreadyPaid => "ALREADY_PAID",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// `data.<operation>` payload of a payment mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

impl PaymentOutcome {
    pub fn is_success(&self) -> bool {
        self.status == PaymentStatus::Success
    }

    pub fn first_error_message(&self) -> Option<&str> {
        self.errors.first().map(|e| e.message.as_str())
    }
}

/// Raw GraphQL response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

impl GraphQlResponse {
    /// Joined top-level error messages, if the whole request was rejected
    pub fn error_summary(&self) -> Option<String> {
        let errors = self.errors.as_ref().filter(|e| !e.is_empty())?;
        Some(
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Pull `data.<operation>` out of the envelope
    pub fn operation(&self, name: &str) -> Result<&Value, ApiError> {
        match self.data.as_ref().and_then(|d| d.get(name)).filter(|v| !v.is_null()) {
            Some(value) => Ok(value),
            None => match self.error_summary() {
                Some(summary) => Err(ApiError::GraphQl(summary)),
                None => Err(ApiError::MissingField(format!("data.{}", name))),
            },
        }
    }
}

/// A wallet as seen by the bot: which currency, how much is in it
#[derive(Debug, Clone, PartialEq)]
pub struct WalletSnapshot {
    pub wallet_id: String,
    pub currency: String,
    pub balance_sats: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawWallet {
    pub id: String,
    pub wallet_currency: String,
    #[serde(default)]
    pub balance: Value,
}

impl From<RawWallet> for WalletSnapshot {
    fn from(raw: RawWallet) -> Self {
        let balance = as_decimal(&raw.balance).unwrap_or(0.0).max(0.0);
        Self {
            wallet_id: raw.id,
            currency: raw.wallet_currency,
            balance_sats: balance as u64,
        }
    }
}
