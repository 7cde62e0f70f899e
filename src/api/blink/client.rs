use std::fmt;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use super::models::{GraphQlResponse, PaymentOutcome, RawWallet, WalletSnapshot};
use crate::api::http::{send_json, ApiError, PAYMENT_TIMEOUT, PRICE_TIMEOUT};
use crate::services::payment_service::LightningWallet;

const WALLETS_QUERY: &str = r#"
query Me {
  me {
    defaultAccount {
      wallets {
        id
        walletCurrency
        balance
      }
    }
  }
}
"#;

const LN_ADDRESS_PAYMENT_MUTATION: &str = r#"
mutation LnAddressPaymentSend($input: LnAddressPaymentSendInput!) {
  lnAddressPaymentSend(input: $input) {
    status
    errors {
      code
      message
      path
    }
  }
}
"#;

const LN_INVOICE_PAYMENT_MUTATION: &str = r#"
mutation LnInvoicePaymentSend($input: LnInvoicePaymentInput!) {
  lnInvoicePaymentSend(input: $input) {
    status
    errors {
      code
      message
      path
    }
  }
}
"#;

const LN_NO_AMOUNT_INVOICE_PAYMENT_MUTATION: &str = r#"
mutation LnNoAmountInvoicePaymentSend($input: LnNoAmountInvoicePaymentInput!) {
  lnNoAmountInvoicePaymentSend(input: $input) {
    status
    errors {
      code
      message
      path
    }
  }
}
"#;

/// Blink GraphQL client for wallet queries and Lightning payments
pub struct BlinkClient {
    http_client: HttpClient,
    api_key: String,
    url: String,
}

impl fmt::Debug for BlinkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlinkClient")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl BlinkClient {
    pub fn new(api_key: String, url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            url,
        }
    }

    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut key = HeaderValue::from_str(&self.api_key)
            .map_err(|e| ApiError::RequestError(format!("Failed to create API key header: {}", e)))?;
        key.set_sensitive(true);
        headers.insert("X-API-KEY", key);

        Ok(headers)
    }

    /// POST a query or mutation and decode the envelope
    async fn execute(
        &self,
        query: &str,
        variables: Value,
        timeout: std::time::Duration,
    ) -> Result<GraphQlResponse, ApiError> {
        let request = self
            .http_client
            .post(&self.url)
            .headers(self.create_headers()?)
            .timeout(timeout)
            .json(&json!({ "query": query, "variables": variables }));

        let body = send_json(request).await?;
        serde_json::from_value::<GraphQlResponse>(body)
            .map_err(|e| ApiError::DeserializationError(format!("Invalid GraphQL envelope: {}", e)))
    }

    async fn payment_mutation(
        &self,
        query: &str,
        operation: &str,
        input: Value,
    ) -> Result<PaymentOutcome, ApiError> {
        let response = self
            .execute(query, json!({ "input": input }), PAYMENT_TIMEOUT)
            .await?;
        let payload = response.operation(operation).map_err(|e| {
            error!("{} failed: {}", operation, e);
            e
        })?;

        serde_json::from_value::<PaymentOutcome>(payload.clone())
            .map_err(|e| ApiError::DeserializationError(format!("Invalid {} payload: {}", operation, e)))
    }
}

#[async_trait]
impl LightningWallet for BlinkClient {
    async fn wallets(&self) -> Result<Vec<WalletSnapshot>, ApiError> {
        let response = self.execute(WALLETS_QUERY, json!({}), PRICE_TIMEOUT).await?;
        let me = response.operation("me")?;
        let wallets = me
            .pointer("/defaultAccount/wallets")
            .cloned()
            .ok_or_else(|| ApiError::MissingField("data.me.defaultAccount.wallets".to_string()))?;

        let raw: Vec<RawWallet> = serde_json::from_value(wallets)
            .map_err(|e| ApiError::DeserializationError(format!("Invalid wallet list: {}", e)))?;
        debug!("Fetched {} wallets", raw.len());

        Ok(raw.into_iter().map(WalletSnapshot::from).collect())
    }

    async fn pay_address(
        &self,
        wallet_id: &str,
        address: &str,
        amount_sats: u64,
    ) -> Result<PaymentOutcome, ApiError> {
        info!("Sending Lightning payment to {} for {} sats", address, amount_sats);
        self.payment_mutation(
            LN_ADDRESS_PAYMENT_MUTATION,
            "lnAddressPaymentSend",
            json!({
                "walletId": wallet_id,
                "lnAddress": address,
                "amount": amount_sats.to_string(),
            }),
        )
        .await
    }

    async fn pay_invoice(
        &self,
        wallet_id: &str,
        payment_request: &str,
    ) -> Result<PaymentOutcome, ApiError> {
        info!("Paying Lightning invoice {}", abbreviate(payment_request));
        self.payment_mutation(
            LN_INVOICE_PAYMENT_MUTATION,
            "lnInvoicePaymentSend",
            json!({
                "walletId": wallet_id,
                "paymentRequest": payment_request,
            }),
        )
        .await
    }

    async fn pay_no_amount_invoice(
        &self,
        wallet_id: &str,
        payment_request: &str,
        amount_sats: u64,
    ) -> Result<PaymentOutcome, ApiError> {
        info!(
            "Paying no-amount Lightning invoice {} with {} sats",
            abbreviate(payment_request),
            amount_sats
        );
        self.payment_mutation(
            LN_NO_AMOUNT_INVOICE_PAYMENT_MUTATION,
            "lnNoAmountInvoicePaymentSend",
            json!({
                "walletId": wallet_id,
                "paymentRequest": payment_request,
                "amount": amount_sats,
            }),
        )
        .await
    }
}

/// First and last few characters of a long invoice, for log lines
fn abbreviate(payment_request: &str) -> String {
    let chars: Vec<char> = payment_request.chars().collect();
    if chars.len() <= 24 {
        return payment_request.to_string();
    }
    let head: String = chars[..16].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}…{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::blink::PaymentStatus;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> BlinkClient {
        BlinkClient::new("test-key".to_string(), format!("{}/graphql", server.uri()))
    }

    #[tokio::test]
    async fn test_wallets_are_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(header("X-API-KEY", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "me": { "defaultAccount": { "wallets": [
                    { "id": "usd-wallet", "walletCurrency": "USD", "balance": 12 },
                    { "id": "btc-wallet", "walletCurrency": "BTC", "balance": 5000 }
                ] } } }
            })))
            .mount(&server)
            .await;

        let wallets = client_for(&server).await.wallets().await.unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[1].wallet_id, "btc-wallet");
        assert_eq!(wallets[1].balance_sats, 5000);
    }

    #[tokio::test]
    async fn test_pay_address_sends_amount_as_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .and(body_partial_json(json!({
                "variables": { "input": { "walletId": "btc-wallet", "lnAddress": "user@example.com", "amount": "21" } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "lnAddressPaymentSend": { "status": "SUCCESS", "errors": [] } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client_for(&server)
            .await
            .pay_address("btc-wallet", "user@example.com", 21)
            .await
            .unwrap();
        assert_eq!(outcome.status, PaymentStatus::Success);
    }

    #[tokio::test]
    async fn test_top_level_errors_become_graphql_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "Variable \"$input\" got invalid value" }]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .pay_invoice("btc-wallet", "lnbc1u1pxyz")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::GraphQl(ref m) if m.contains("invalid value")));
    }

    #[tokio::test]
    async fn test_unauthorized_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/graphql"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.wallets().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = BlinkClient::new("very-secret".to_string(), "http://localhost".to_string());
        assert!(!format!("{:?}", client).contains("very-secret"));
    }

    #[test]
    fn test_abbreviate_long_invoice() {
        let invoice = "lnbc2500u1pvjluezpp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypq";
        let short = abbreviate(invoice);
        assert!(short.starts_with("lnbc2500u1pvjlue"));
        assert!(short.len() < invoice.len());
    }
}
