//! Stripe adapter.
//!
//! Creates a checkout session carrying our payment id as the client
//! reference, and verifies signed webhooks (`t=...,v1=...` HMAC-SHA256 over
//! `timestamp.body`, with replay tolerance and constant-time comparison).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;

use crate::domain::PaymentStatus;

use super::{CheckoutHandle, CheckoutRequest, GatewayError, GatewayResult, PaymentGateway};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Fully-resolved settings handed to the adapter at construction
#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub secret_key: String,
    pub webhook_secret: String,
    pub base_path: String,
}

impl StripeSettings {
    pub fn new(secret_key: String, webhook_secret: String) -> Self {
        StripeSettings {
            secret_key,
            webhook_secret,
            base_path: "https://api.stripe.com".to_string(),
        }
    }
}

pub struct StripeGateway {
    settings: StripeSettings,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    url: Option<String>,
    status: Option<String>,
    payment_status: Option<String>,
    client_reference_id: Option<String>,
}

impl StripeGateway {
    pub fn new(settings: StripeSettings) -> GatewayResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(StripeGateway {
            settings,
            http_client,
        })
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> GatewayResult<T> {
        let status = response.status();

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| GatewayError::Transport(format!("malformed response: {e}")));
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error response".to_string());

        if status.is_server_error() {
            Err(GatewayError::Transport(format!("status {status}: {body}")))
        } else {
            Err(GatewayError::Business(format!("status {status}: {body}")))
        }
    }

    async fn fetch_session(&self, session_id: &str) -> GatewayResult<CheckoutSession> {
        let url = format!(
            "{}/v1/checkout/sessions/{session_id}",
            self.settings.base_path
        );
        let response = self
            .http_client
            .get(&url)
            .basic_auth(&self.settings.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::handle_response(response).await
    }

    /// Session state to canonical status. Unknown values fall back to
    /// pending rather than being dropped.
    fn map_status(session_status: Option<&str>, payment_status: Option<&str>) -> PaymentStatus {
        if session_status == Some("expired") {
            return PaymentStatus::Cancelled;
        }
        match payment_status {
            Some("paid") | Some("no_payment_required") => PaymentStatus::Approved,
            Some("unpaid") => PaymentStatus::Pending,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Verify a `t=...,v1=...` signature header over `timestamp.raw_body`,
/// rejecting stale timestamps and comparing digests in constant time.
pub fn verify_webhook_signature(
    raw_body: &str,
    signature: &str,
    webhook_secret: &str,
    tolerance_secs: i64,
) -> bool {
    let mut timestamp = None;
    let mut received = None;
    for part in signature.split(',') {
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.strip_prefix("v1=") {
            received = Some(v);
        }
    }
    let (Some(timestamp), Some(received)) = (timestamp, received) else {
        return false;
    };

    let Ok(webhook_time) = timestamp.parse::<i64>() else {
        return false;
    };
    let Ok(elapsed) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return false;
    };
    if (elapsed.as_secs() as i64 - webhook_time).abs() > tolerance_secs {
        return false;
    }

    let signed_payload = format!("{timestamp}.{raw_body}");
    let Ok(mut mac) = HmacSha256::new_from_slice(webhook_secret.as_bytes()) else {
        return false;
    };
    mac.update(signed_payload.as_bytes());
    let expected = mac.finalize().into_bytes();

    let Ok(received_bytes) = hex::decode(received) else {
        return false;
    };
    if received_bytes.len() != expected.len() {
        return false;
    }

    let mut diff = 0u8;
    for (a, b) in received_bytes.iter().zip(expected.iter()) {
        diff |= a ^ b;
    }
    diff == 0
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment(&self, request: &CheckoutRequest) -> GatewayResult<CheckoutHandle> {
        let amount = request.amount_minor.to_string();
        let currency = request.currency.to_lowercase();
        let mut params: Vec<(&str, String)> = vec![
            ("mode", "payment".to_string()),
            ("client_reference_id", request.external_reference.clone()),
            ("customer_email", request.customer_email.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", currency),
            ("line_items[0][price_data][unit_amount]", amount),
            (
                "line_items[0][price_data][product_data][name]",
                request.description.clone(),
            ),
        ];
        if let Some(success_url) = &request.success_url {
            params.push(("success_url", success_url.clone()));
        }
        if let Some(failure_url) = &request.failure_url {
            params.push(("cancel_url", failure_url.clone()));
        }

        let url = format!("{}/v1/checkout/sessions", self.settings.base_path);
        let response = self
            .http_client
            .post(&url)
            .basic_auth(&self.settings.secret_key, None::<&str>)
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let session: CheckoutSession = Self::handle_response(response).await?;
        let checkout_url = session.url.ok_or_else(|| {
            GatewayError::Business("checkout session carries no url".to_string())
        })?;

        Ok(CheckoutHandle {
            checkout_url,
            qr_code: None,
        })
    }

    async fn get_payment_status(&self, transaction_id: &str) -> GatewayResult<PaymentStatus> {
        let session = self.fetch_session(transaction_id).await?;
        Ok(Self::map_status(
            session.status.as_deref(),
            session.payment_status.as_deref(),
        ))
    }

    async fn get_external_reference(&self, transaction_id: &str) -> GatewayResult<String> {
        let session = self.fetch_session(transaction_id).await?;
        session.client_reference_id.ok_or_else(|| {
            GatewayError::Business(format!(
                "session {transaction_id} carries no client reference"
            ))
        })
    }

    fn validate_webhook_secret(&self, secret: &str) -> bool {
        !secret.is_empty() && secret == self.settings.webhook_secret
    }

    fn validate_webhook(
        &self,
        raw_body: &str,
        secret: Option<&str>,
        signature: Option<&str>,
    ) -> bool {
        match signature {
            Some(signature) => verify_webhook_signature(
                raw_body,
                signature,
                &self.settings.webhook_secret,
                SIGNATURE_TOLERANCE_SECS,
            ),
            None => secret.map(|s| self.validate_webhook_secret(s)).unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(raw_body: &str, secret: &str, timestamp: u64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{raw_body}").as_bytes());
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = r#"{"transaction_id":"cs_123"}"#;
        let signature = sign(body, "whsec_test", now());
        assert!(verify_webhook_signature(body, &signature, "whsec_test", 300));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign(r#"{"transaction_id":"cs_123"}"#, "whsec_test", now());
        assert!(!verify_webhook_signature(
            r#"{"transaction_id":"cs_999"}"#,
            &signature,
            "whsec_test",
            300
        ));
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = r#"{"transaction_id":"cs_123"}"#;
        let signature = sign(body, "whsec_test", 1_000_000);
        assert!(!verify_webhook_signature(body, &signature, "whsec_test", 300));
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(!verify_webhook_signature("{}", "v1=deadbeef", "whsec_test", 300));
        assert!(!verify_webhook_signature("{}", "t=notanumber,v1=zz", "whsec_test", 300));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            StripeGateway::map_status(Some("complete"), Some("paid")),
            PaymentStatus::Approved
        );
        assert_eq!(
            StripeGateway::map_status(Some("open"), Some("unpaid")),
            PaymentStatus::Pending
        );
        assert_eq!(
            StripeGateway::map_status(Some("expired"), Some("unpaid")),
            PaymentStatus::Cancelled
        );
        // unmapped values land on pending, never dropped
        assert_eq!(
            StripeGateway::map_status(Some("open"), Some("mystery")),
            PaymentStatus::Pending
        );
    }
}
