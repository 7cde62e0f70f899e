use std::time::Duration;

use reqwest::RequestBuilder;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Timeout for read-only price lookups
pub const PRICE_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for calls that move funds
pub const PAYMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while talking to an external HTTP or GraphQL API
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Rate Limited: {0}")]
    RateLimited(String),
    #[error("Server Error ({0}): {1}")]
    ServerError(u16, String),
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    #[error("Request timed out")]
    Timeout,
    #[error("Request Error: {0}")]
    RequestError(String),
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
    #[error("Missing field: {0}")]
    MissingField(String),
    #[error("Non-positive value: {0}")]
    NonPositive(f64),
    #[error("GraphQL Error: {0}")]
    GraphQl(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_decode() {
            ApiError::DeserializationError(e.to_string())
        } else {
            ApiError::RequestError(e.to_string())
        }
    }
}

/// Map a non-success status and its body onto an `ApiError`
pub fn classify_error_status(status: u16, body_text: String) -> ApiError {
    match status {
        400 => {
            // Prefer the API's own message when the body is JSON
            let message = serde_json::from_str::<Value>(&body_text)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or(body_text);
            ApiError::BadRequest(message)
        }
        401 => ApiError::Unauthorized(body_text),
        403 => ApiError::Forbidden(body_text),
        404 => ApiError::NotFound(body_text),
        429 => {
            warn!("Rate limited by upstream API");
            ApiError::RateLimited(body_text)
        }
        500..=599 => {
            warn!("Server error {}: {}", status, body_text);
            ApiError::ServerError(status, body_text)
        }
        _ => ApiError::HttpError(status, body_text),
    }
}

/// Send a request and decode the JSON body, failing on any non-2xx status
pub async fn send_json(request: RequestBuilder) -> Result<Value, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    debug!("Response status: {}", status);

    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        return Err(classify_error_status(status.as_u16(), body_text));
    }

    let body = response.bytes().await?;
    serde_json::from_slice::<Value>(&body)
        .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
}

/// Read a number that exchanges send either as a JSON number or a numeric string
pub fn as_decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Enforce the "a price is strictly positive" contract
pub fn positive(value: f64) -> Result<f64, ApiError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(ApiError::NonPositive(value))
    }
}
