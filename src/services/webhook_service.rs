//! Webhook reconciliation.
//!
//! A provider webhook only guarantees a transaction id. The reconciler
//! asks the gateway for the transaction's status and external reference,
//! resolves the reference back to the internal payment, gates on payments
//! that already reached an outcome, applies the transition pair, and
//! persists payment then order. Duplicate and concurrent deliveries are
//! absorbed by the pending-only conditional update.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{DomainError, Order, Payment, PaymentProvider, PaymentStatus};
use crate::gateway::factory::GatewayFactory;
use crate::gateway::retry::RetryPolicy;
use crate::store::{OrderStore, PaymentStore, StoreError};

/// Errors surfaced by reconciliation
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The webhook could not be tied back to an internal payment:
    /// gateway lookups failed or the external reference is malformed
    #[error("could not correlate webhook to a payment: {0}")]
    Correlation(String),

    /// The reference resolved to a payment this service does not know.
    /// Legitimate for foreign or stale webhooks; loggable, not fatal.
    #[error("payment {0} not found")]
    UnknownPayment(Uuid),

    /// The payment exists but its order does not, which breaks the
    /// ownership invariant and is worth alerting on
    #[error("order {0} not found for payment {1}")]
    UnknownOrder(Uuid, Uuid),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for reconciliation
pub type WebhookResult<T> = Result<T, WebhookError>;

/// What a reconciliation run did
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The webhook outcome was applied to the payment and its order
    Applied { payment: Payment, order: Order },
    /// The payment had already reached an outcome; nothing was changed
    AlreadyProcessed,
}

pub struct WebhookReconciler {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentStore>,
    gateways: Arc<GatewayFactory>,
    retry: RetryPolicy,
}

impl WebhookReconciler {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentStore>,
        gateways: Arc<GatewayFactory>,
        retry: RetryPolicy,
    ) -> Self {
        WebhookReconciler {
            orders,
            payments,
            gateways,
            retry,
        }
    }

    pub async fn reconcile(
        &self,
        provider: PaymentProvider,
        transaction_id: &str,
    ) -> WebhookResult<ReconcileOutcome> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return Err(WebhookError::Correlation(
                "empty transaction id".to_string(),
            ));
        }

        let gateway = self
            .gateways
            .resolve(provider)
            .map_err(|e| WebhookError::Correlation(e.to_string()))?;

        let provider_status = self
            .retry
            .run("get_payment_status", || {
                gateway.get_payment_status(transaction_id)
            })
            .await
            .map_err(|e| WebhookError::Correlation(e.to_string()))?;

        let reference = self
            .retry
            .run("get_external_reference", || {
                gateway.get_external_reference(transaction_id)
            })
            .await
            .map_err(|e| WebhookError::Correlation(e.to_string()))?;

        let payment_id = Uuid::parse_str(reference.trim()).map_err(|_| {
            WebhookError::Correlation(format!(
                "external reference '{reference}' is not a payment id"
            ))
        })?;

        let Some(mut payment) = self.payments.get_by_id(payment_id).await? else {
            return Err(WebhookError::UnknownPayment(payment_id));
        };

        // Idempotency gate: a payment that already reached an outcome means
        // this delivery is a duplicate.
        if payment.status() != PaymentStatus::Pending {
            tracing::info!(
                payment_id = %payment_id,
                transaction_id,
                status = payment.status().as_str(),
                "payment already reconciled, skipping duplicate webhook"
            );
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        let Some(mut order) = self.orders.get_by_id(payment.order_id()).await? else {
            return Err(WebhookError::UnknownOrder(payment.order_id(), payment_id));
        };

        match provider_status {
            PaymentStatus::Approved => {
                payment.approve(transaction_id)?;
                order.activate()?;
            }
            other => {
                payment.fail(&format!("provider reported status '{}'", other.as_str()))?;
                order.mark_payment_failed()?;
            }
        }

        // Pending-only write: the loser of a concurrent duplicate delivery
        // observes false here and reports the duplicate path.
        if !self.payments.update_if_pending(&payment).await? {
            tracing::info!(
                payment_id = %payment_id,
                transaction_id,
                "concurrent delivery already applied this webhook"
            );
            return Ok(ReconcileOutcome::AlreadyProcessed);
        }
        self.orders.update(&order).await?;

        tracing::info!(
            payment_id = %payment_id,
            order_id = %order.id(),
            transaction_id,
            payment_status = payment.status().as_str(),
            order_status = order.status().as_str(),
            "webhook reconciled"
        );

        Ok(ReconcileOutcome::Applied { payment, order })
    }
}
