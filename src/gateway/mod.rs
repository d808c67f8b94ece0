//! Payment gateway boundary.
//!
//! Every provider integration implements [`PaymentGateway`]; the rest of
//! the service only sees canonical request/response types and the
//! transport/business error split. Provider status vocabularies never leak
//! past an adapter.

pub mod factory;
pub mod mercado_pago;
pub mod mock;
pub mod retry;
pub mod stripe;

use async_trait::async_trait;

use crate::domain::{PaymentProvider, PaymentStatus};

/// Canonical checkout request handed to an adapter. The external reference
/// is the internal payment id: the only key that is stable before and
/// after the provider assigns its own transaction id.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub external_reference: String,
    pub amount_minor: i64,
    pub currency: String,
    pub description: String,
    pub customer_name: String,
    pub customer_email: String,
    pub success_url: Option<String>,
    pub failure_url: Option<String>,
    pub pending_url: Option<String>,
    pub webhook_url: Option<String>,
}

/// What a successful checkout creation hands back
#[derive(Debug, Clone)]
pub struct CheckoutHandle {
    pub checkout_url: String,
    pub qr_code: Option<String>,
}

/// Gateway failures. Transport failures are retryable; business rejections
/// are final and must not be retried.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway transport failure: {0}")]
    Transport(String),

    #[error("gateway rejected the request: {0}")]
    Business(String),

    #[error("payment provider '{0}' is not configured")]
    UnsupportedProvider(&'static str),
}

impl GatewayError {
    /// Whether the retry wrapper may try this call again
    pub fn is_transient(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }

    pub fn unsupported(provider: PaymentProvider) -> Self {
        GatewayError::UnsupportedProvider(provider.as_str())
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Uniform capability set over an external payment provider
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a checkout at the provider and return the handle the
    /// customer completes payment through
    async fn create_payment(&self, request: &CheckoutRequest) -> GatewayResult<CheckoutHandle>;

    /// Canonical status of a provider transaction
    async fn get_payment_status(&self, transaction_id: &str) -> GatewayResult<PaymentStatus>;

    /// The external reference recorded at creation time (our payment id)
    async fn get_external_reference(&self, transaction_id: &str) -> GatewayResult<String>;

    /// Check a shared webhook secret delivered in the callback payload
    fn validate_webhook_secret(&self, secret: &str) -> bool;

    /// Validate an inbound webhook against the raw request. Adapters with a
    /// signature scheme override this; the default accepts a matching
    /// shared secret.
    fn validate_webhook(
        &self,
        raw_body: &str,
        secret: Option<&str>,
        signature: Option<&str>,
    ) -> bool {
        let _ = (raw_body, signature);
        secret.map(|s| self.validate_webhook_secret(s)).unwrap_or(false)
    }
}
