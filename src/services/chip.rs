//! Thin HTTP client for the Chip payment gateway.
//!
//! Transport and decoding failures collapse to `None`; a JSON error body from
//! the gateway is still `Some`, and the caller decides which fields it
//! requires. No retries here — callers own that decision.

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::observability::metrics::record_gateway_request;

pub const DEFAULT_BASE_URL: &str = "https://gate.chip-in.asia/api/v1/";
const CHECKOUT_BASE_URL: &str = "https://gate.chip-in.asia/p/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ChipClient {
    http: Client,
    base_url: String,
    brand_id: String,
    secret_key: String,
    payment_method_whitelist: Vec<String>,
}

impl ChipClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        brand_id: impl Into<String>,
        secret_key: impl Into<String>,
        payment_method_whitelist: Vec<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            brand_id: brand_id.into(),
            secret_key: secret_key.into(),
            payment_method_whitelist,
        }
    }

    pub fn brand_id(&self) -> &str {
        &self.brand_id
    }

    pub fn payment_method_whitelist(&self) -> &[String] {
        &self.payment_method_whitelist
    }

    /// Create a purchase. `None` signals any transport/auth/decoding error,
    /// never "no purchase".
    pub async fn create_purchase(&self, payload: &Value) -> Option<Value> {
        let url = format!("{}purchases/", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .timeout(REQUEST_TIMEOUT)
            .json(payload)
            .send()
            .await;

        let body = match response {
            Ok(resp) => resp.json::<Value>().await,
            Err(e) => {
                warn!("Chip create purchase request failed: {}", e);
                record_gateway_request("create_purchase", false);
                return None;
            }
        };

        match body {
            Ok(value) => {
                record_gateway_request("create_purchase", true);
                Some(value)
            }
            Err(e) => {
                warn!("Chip create purchase returned undecodable body: {}", e);
                record_gateway_request("create_purchase", false);
                None
            }
        }
    }

    /// Fetch purchase state by gateway purchase id.
    pub async fn get_purchase(&self, purchase_id: &str) -> Option<Value> {
        let url = format!("{}purchases/{}/", self.base_url, purchase_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await;

        let body = match response {
            Ok(resp) => resp.json::<Value>().await,
            Err(e) => {
                warn!(purchase_id, "Chip get purchase request failed: {}", e);
                record_gateway_request("get_purchase", false);
                return None;
            }
        };

        match body {
            Ok(value) => {
                record_gateway_request("get_purchase", true);
                Some(value)
            }
            Err(e) => {
                warn!(purchase_id, "Chip get purchase returned undecodable body: {}", e);
                record_gateway_request("get_purchase", false);
                None
            }
        }
    }

    /// Hosted checkout page for a purchase. URL template only, no network
    /// call.
    pub fn checkout_url(&self, purchase_id: &str) -> String {
        format!("{}{}/", CHECKOUT_BASE_URL, purchase_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_url_is_deterministic() {
        let client = ChipClient::new(
            Client::new(),
            DEFAULT_BASE_URL,
            "brand",
            "secret",
            vec!["fpx".to_string()],
        );
        assert_eq!(
            client.checkout_url("abc-123"),
            "https://gate.chip-in.asia/p/abc-123/"
        );
    }
}
