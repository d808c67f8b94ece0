//! Mercado Pago adapter.
//!
//! Creates a checkout preference and reads payments back by transaction id.
//! Webhook callbacks carry a plain shared secret.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::PaymentStatus;

use super::{CheckoutHandle, CheckoutRequest, GatewayError, GatewayResult, PaymentGateway};
use async_trait::async_trait;

/// Fully-resolved settings handed to the adapter at construction. Nothing
/// here is read from the environment by the adapter itself.
#[derive(Debug, Clone)]
pub struct MercadoPagoSettings {
    pub access_token: String,
    pub webhook_secret: String,
    pub base_path: String,
}

impl MercadoPagoSettings {
    pub fn new(access_token: String, webhook_secret: String) -> Self {
        MercadoPagoSettings {
            access_token,
            webhook_secret,
            base_path: "https://api.mercadopago.com".to_string(),
        }
    }
}

pub struct MercadoPagoGateway {
    settings: MercadoPagoSettings,
    http_client: Client,
}

#[derive(Debug, Serialize)]
struct PreferenceItem {
    title: String,
    quantity: u32,
    currency_id: String,
    unit_price: f64,
}

#[derive(Debug, Serialize)]
struct BackUrls {
    #[serde(skip_serializing_if = "Option::is_none")]
    success: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pending: Option<String>,
}

#[derive(Debug, Serialize)]
struct PreferenceRequest {
    external_reference: String,
    items: Vec<PreferenceItem>,
    back_urls: BackUrls,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    init_point: String,
}

#[derive(Debug, Deserialize)]
struct ProviderPayment {
    status: String,
    external_reference: Option<String>,
}

impl MercadoPagoGateway {
    pub fn new(settings: MercadoPagoSettings) -> GatewayResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Ok(MercadoPagoGateway {
            settings,
            http_client,
        })
    }

    async fn post_json<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> GatewayResult<T> {
        let url = format!("{}{}", self.settings.base_path, path);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.settings.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::handle_response(response).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let url = format!("{}{}", self.settings.base_path, path);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.settings.access_token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        Self::handle_response(response).await
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

    async fn fetch_payment(&self, transaction_id: &str) -> GatewayResult<ProviderPayment> {
        self.get_json(&format!("/v1/payments/{transaction_id}")).await
    }

    /// Mercado Pago status vocabulary to canonical status. Unknown values
    /// fall back to pending rather than being dropped.
    fn map_status(provider_status: &str) -> PaymentStatus {
        match provider_status {
            "approved" => PaymentStatus::Approved,
            "rejected" => PaymentStatus::Failed,
            "cancelled" => PaymentStatus::Cancelled,
            "refunded" | "charged_back" => PaymentStatus::Refunded,
            "pending" | "in_process" | "in_mediation" | "authorized" => PaymentStatus::Pending,
            _ => PaymentStatus::Pending,
        }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoGateway {
    async fn create_payment(&self, request: &CheckoutRequest) -> GatewayResult<CheckoutHandle> {
        let preference = PreferenceRequest {
            external_reference: request.external_reference.clone(),
            items: vec![PreferenceItem {
                title: request.description.clone(),
                quantity: 1,
                currency_id: request.currency.clone(),
                unit_price: request.amount_minor as f64 / 100.0,
            }],
            back_urls: BackUrls {
                success: request.success_url.clone(),
                failure: request.failure_url.clone(),
                pending: request.pending_url.clone(),
            },
            notification_url: request.webhook_url.clone(),
        };

        let response: PreferenceResponse =
            self.post_json("/checkout/preferences", &preference).await?;

        Ok(CheckoutHandle {
            checkout_url: response.init_point,
            qr_code: None,
        })
    }

    async fn get_payment_status(&self, transaction_id: &str) -> GatewayResult<PaymentStatus> {
        let payment = self.fetch_payment(transaction_id).await?;
        Ok(Self::map_status(&payment.status))
    }

    async fn get_external_reference(&self, transaction_id: &str) -> GatewayResult<String> {
        let payment = self.fetch_payment(transaction_id).await?;
        payment.external_reference.ok_or_else(|| {
            GatewayError::Business(format!(
                "payment {transaction_id} carries no external reference"
            ))
        })
    }

    fn validate_webhook_secret(&self, secret: &str) -> bool {
        !secret.is_empty() && secret == self.settings.webhook_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            MercadoPagoGateway::map_status("approved"),
            PaymentStatus::Approved
        );
        assert_eq!(
            MercadoPagoGateway::map_status("rejected"),
            PaymentStatus::Failed
        );
        assert_eq!(
            MercadoPagoGateway::map_status("cancelled"),
            PaymentStatus::Cancelled
        );
        assert_eq!(
            MercadoPagoGateway::map_status("refunded"),
            PaymentStatus::Refunded
        );
        assert_eq!(
            MercadoPagoGateway::map_status("in_process"),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_unknown_status_defaults_to_pending() {
        assert_eq!(
            MercadoPagoGateway::map_status("some_future_status"),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_webhook_secret_validation() {
        let gateway = MercadoPagoGateway::new(MercadoPagoSettings::new(
            "token".to_string(),
            "whsec_1".to_string(),
        ))
        .unwrap();

        assert!(gateway.validate_webhook_secret("whsec_1"));
        assert!(!gateway.validate_webhook_secret("wrong"));
        assert!(!gateway.validate_webhook_secret(""));
    }
}
