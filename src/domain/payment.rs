//! Payment aggregate.
//!
//! One attempt to collect funds for an order through an external gateway.
//! Status only moves through the mutators below; a rejected transition
//! leaves the payment untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DomainError, DomainResult};

/// Lifecycle status of a payment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Failed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "approved" => Some(PaymentStatus::Approved),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

/// External payment provider handling a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentProvider {
    MercadoPago,
    Stripe,
    Mock,
}

impl PaymentProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentProvider::MercadoPago => "mercado_pago",
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::Mock => "mock",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mercado_pago" => Some(PaymentProvider::MercadoPago),
            "stripe" => Some(PaymentProvider::Stripe),
            "mock" => Some(PaymentProvider::Mock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Payment {
    id: Uuid,
    order_id: Uuid,
    amount_minor: i64,
    status: PaymentStatus,
    provider: PaymentProvider,
    transaction_id: Option<String>,
    checkout_url: Option<String>,
    qr_code: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    approved_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Create a pending payment for an order. Amounts are minor currency
    /// units and must be positive.
    pub fn new(order_id: Uuid, amount_minor: i64, provider: PaymentProvider) -> DomainResult<Self> {
        if order_id.is_nil() {
            return Err(DomainError::Validation(
                "payment requires an order id".to_string(),
            ));
        }
        if amount_minor <= 0 {
            return Err(DomainError::Validation(format!(
                "payment amount must be positive, got {amount_minor}"
            )));
        }

        Ok(Payment {
            id: Uuid::new_v4(),
            order_id,
            amount_minor,
            status: PaymentStatus::Pending,
            provider,
            transaction_id: None,
            checkout_url: None,
            qr_code: None,
            failure_reason: None,
            created_at: Utc::now(),
            approved_at: None,
        })
    }

    /// Rehydrate a payment from persisted state
    pub(crate) fn restore(
        id: Uuid,
        order_id: Uuid,
        amount_minor: i64,
        status: PaymentStatus,
        provider: PaymentProvider,
        transaction_id: Option<String>,
        checkout_url: Option<String>,
        qr_code: Option<String>,
        failure_reason: Option<String>,
        created_at: DateTime<Utc>,
        approved_at: Option<DateTime<Utc>>,
    ) -> Self {
        Payment {
            id,
            order_id,
            amount_minor,
            status,
            provider,
            transaction_id,
            checkout_url,
            qr_code,
            failure_reason,
            created_at,
            approved_at,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn order_id(&self) -> Uuid {
        self.order_id
    }

    pub fn amount_minor(&self) -> i64 {
        self.amount_minor
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn provider(&self) -> PaymentProvider {
        self.provider
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn checkout_url(&self) -> Option<&str> {
        self.checkout_url.as_deref()
    }

    pub fn qr_code(&self) -> Option<&str> {
        self.qr_code.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn approved_at(&self) -> Option<DateTime<Utc>> {
        self.approved_at
    }

    /// Record the checkout URL handed back by the gateway
    pub fn set_checkout_url(&mut self, checkout_url: &str) -> DomainResult<()> {
        if checkout_url.trim().is_empty() {
            return Err(DomainError::Validation(
                "checkout url must not be empty".to_string(),
            ));
        }
        self.checkout_url = Some(checkout_url.to_string());
        Ok(())
    }

    /// Record the instant-payment QR handle, when the provider returns one
    pub fn set_qr_code(&mut self, qr_code: &str) -> DomainResult<()> {
        if qr_code.trim().is_empty() {
            return Err(DomainError::Validation(
                "qr code must not be empty".to_string(),
            ));
        }
        self.qr_code = Some(qr_code.to_string());
        Ok(())
    }

    /// Approve the payment with the provider's own transaction id
    pub fn approve(&mut self, transaction_id: &str) -> DomainResult<()> {
        if transaction_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "transaction id must not be empty".to_string(),
            ));
        }

        self.status = PaymentStatus::Approved;
        self.transaction_id = Some(transaction_id.to_string());
        self.approved_at = Some(Utc::now());
        Ok(())
    }

    /// Mark the payment failed. Approved payments cannot fail.
    pub fn fail(&mut self, reason: &str) -> DomainResult<()> {
        if self.status == PaymentStatus::Approved {
            return Err(self.invalid("fail"));
        }

        self.status = PaymentStatus::Failed;
        self.failure_reason = Some(if reason.trim().is_empty() {
            "unknown failure".to_string()
        } else {
            reason.to_string()
        });
        Ok(())
    }

    /// Cancel the payment. Approved payments cannot be cancelled.
    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status == PaymentStatus::Approved {
            return Err(self.invalid("cancel"));
        }

        self.status = PaymentStatus::Cancelled;
        Ok(())
    }

    /// Refund an approved payment
    pub fn refund(&mut self) -> DomainResult<()> {
        if self.status != PaymentStatus::Approved {
            return Err(self.invalid("refund"));
        }

        self.status = PaymentStatus::Refunded;
        Ok(())
    }

    fn invalid(&self, action: &'static str) -> DomainError {
        DomainError::InvalidTransition {
            entity: "payment",
            action,
            status: self.status.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_payment() -> Payment {
        Payment::new(Uuid::new_v4(), 2990, PaymentProvider::MercadoPago).unwrap()
    }

    #[test]
    fn test_new_payment_starts_pending() {
        let payment = pending_payment();
        assert_eq!(payment.status(), PaymentStatus::Pending);
        assert!(payment.transaction_id().is_none());
        assert!(payment.approved_at().is_none());
    }

    #[test]
    fn test_new_payment_rejects_non_positive_amount() {
        assert!(Payment::new(Uuid::new_v4(), 0, PaymentProvider::Mock).is_err());
        assert!(Payment::new(Uuid::new_v4(), -100, PaymentProvider::Mock).is_err());
    }

    #[test]
    fn test_approve_sets_transaction_and_timestamp() {
        let mut payment = pending_payment();
        payment.approve("mp_12345").unwrap();

        assert_eq!(payment.status(), PaymentStatus::Approved);
        assert_eq!(payment.transaction_id(), Some("mp_12345"));
        assert!(payment.approved_at().is_some());
    }

    #[test]
    fn test_approve_rejects_empty_transaction_id() {
        let mut payment = pending_payment();
        assert!(payment.approve("  ").is_err());
        assert_eq!(payment.status(), PaymentStatus::Pending);
    }

    #[test]
    fn test_fail_rejected_after_approval() {
        let mut payment = pending_payment();
        payment.approve("mp_1").unwrap();

        let err = payment.fail("late rejection").unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(payment.status(), PaymentStatus::Approved);
        assert!(payment.failure_reason().is_none());
    }

    #[test]
    fn test_cancel_rejected_after_approval() {
        let mut payment = pending_payment();
        payment.approve("mp_1").unwrap();
        assert!(payment.cancel().is_err());
        assert_eq!(payment.status(), PaymentStatus::Approved);
    }

    #[test]
    fn test_fail_records_reason_with_default() {
        let mut payment = pending_payment();
        payment.fail("").unwrap();
        assert_eq!(payment.status(), PaymentStatus::Failed);
        assert_eq!(payment.failure_reason(), Some("unknown failure"));
    }

    #[test]
    fn test_refund_requires_approval() {
        let mut payment = pending_payment();
        assert!(payment.refund().is_err());

        payment.approve("mp_1").unwrap();
        payment.refund().unwrap();
        assert_eq!(payment.status(), PaymentStatus::Refunded);
    }
}
