//! Deterministic in-process gateway for development and tests.
//!
//! Simulates the full provider round trip: checkout creation assigns a
//! transaction id and records the external reference, and `settle` flips a
//! transaction's status so a webhook can be driven against it. Failure
//! triggers are encoded in the customer email local part:
//! `decline@...` rejects the checkout, `timeout@...` fails transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::PaymentStatus;

use super::{CheckoutHandle, CheckoutRequest, GatewayError, GatewayResult, PaymentGateway};

#[derive(Debug, Clone)]
struct MockTransaction {
    external_reference: String,
    status: PaymentStatus,
}

#[derive(Clone)]
pub struct MockGateway {
    webhook_secret: String,
    transactions: Arc<Mutex<HashMap<String, MockTransaction>>>,
}

impl MockGateway {
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        MockGateway {
            webhook_secret: webhook_secret.into(),
            transactions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Flip a recorded transaction's status, simulating the provider-side
    /// outcome a webhook later reports
    pub fn settle(&self, transaction_id: &str, status: PaymentStatus) {
        let mut transactions = self.transactions.lock().expect("mock mutex poisoned");
        if let Some(tx) = transactions.get_mut(transaction_id) {
            tx.status = status;
        }
    }

    /// Transaction id recorded for an external reference, newest wins
    pub fn transaction_for_reference(&self, external_reference: &str) -> Option<String> {
        let transactions = self.transactions.lock().expect("mock mutex poisoned");
        transactions
            .iter()
            .find(|(_, tx)| tx.external_reference == external_reference)
            .map(|(id, _)| id.clone())
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment(&self, request: &CheckoutRequest) -> GatewayResult<CheckoutHandle> {
        if request.customer_email.starts_with("decline@") {
            return Err(GatewayError::Business(
                "payment declined by processor: insufficient funds".to_string(),
            ));
        }
        if request.customer_email.starts_with("timeout@") {
            return Err(GatewayError::Transport(
                "simulated provider timeout".to_string(),
            ));
        }

        let transaction_id = format!("mock_tx_{}", Uuid::new_v4().simple());
        self.transactions
            .lock()
            .expect("mock mutex poisoned")
            .insert(
                transaction_id.clone(),
                MockTransaction {
                    external_reference: request.external_reference.clone(),
                    status: PaymentStatus::Pending,
                },
            );

        Ok(CheckoutHandle {
            checkout_url: format!("https://checkout.mock.local/{transaction_id}"),
            qr_code: Some(format!("mockqr://{transaction_id}")),
        })
    }

    async fn get_payment_status(&self, transaction_id: &str) -> GatewayResult<PaymentStatus> {
        let transactions = self.transactions.lock().expect("mock mutex poisoned");
        transactions
            .get(transaction_id)
            .map(|tx| tx.status)
            .ok_or_else(|| {
                GatewayError::Business(format!("unknown transaction {transaction_id}"))
            })
    }

    async fn get_external_reference(&self, transaction_id: &str) -> GatewayResult<String> {
        let transactions = self.transactions.lock().expect("mock mutex poisoned");
        transactions
            .get(transaction_id)
            .map(|tx| tx.external_reference.clone())
            .ok_or_else(|| {
                GatewayError::Business(format!("unknown transaction {transaction_id}"))
            })
    }

    fn validate_webhook_secret(&self, secret: &str) -> bool {
        !secret.is_empty() && secret == self.webhook_secret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str) -> CheckoutRequest {
        CheckoutRequest {
            external_reference: Uuid::new_v4().to_string(),
            amount_minor: 2990,
            currency: "BRL".to_string(),
            description: "Starter plan".to_string(),
            customer_name: "Test".to_string(),
            customer_email: email.to_string(),
            success_url: None,
            failure_url: None,
            pending_url: None,
            webhook_url: None,
        }
    }

    #[tokio::test]
    async fn test_checkout_records_transaction() {
        let gateway = MockGateway::new("secret");
        let req = request("buyer@example.com");

        let handle = gateway.create_payment(&req).await.unwrap();
        assert!(handle.checkout_url.starts_with("https://checkout.mock.local/"));

        let tx = gateway
            .transaction_for_reference(&req.external_reference)
            .unwrap();
        assert_eq!(
            gateway.get_payment_status(&tx).await.unwrap(),
            PaymentStatus::Pending
        );
        assert_eq!(
            gateway.get_external_reference(&tx).await.unwrap(),
            req.external_reference
        );
    }

    #[tokio::test]
    async fn test_decline_trigger() {
        let gateway = MockGateway::new("secret");
        let err = gateway
            .create_payment(&request("decline@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Business(_)));
    }

    #[tokio::test]
    async fn test_settle_flips_status() {
        let gateway = MockGateway::new("secret");
        let req = request("buyer@example.com");
        gateway.create_payment(&req).await.unwrap();

        let tx = gateway
            .transaction_for_reference(&req.external_reference)
            .unwrap();
        gateway.settle(&tx, PaymentStatus::Approved);
        assert_eq!(
            gateway.get_payment_status(&tx).await.unwrap(),
            PaymentStatus::Approved
        );
    }
}
