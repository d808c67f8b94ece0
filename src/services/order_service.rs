//! Order orchestration: checkout initiation, queries, cancellation.
//!
//! The checkout flow persists the pending order and payment before any
//! external call, so a crash mid-checkout leaves a retryable record of
//! intent instead of losing the purchase. Every gateway failure path
//! resolves the persisted payment to failed before returning.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::config::Config;
use crate::domain::{DomainError, Order, Payment, PaymentProvider};
use crate::gateway::factory::GatewayFactory;
use crate::gateway::retry::RetryPolicy;
use crate::gateway::{CheckoutRequest, GatewayError};
use crate::store::{DirectoryStore, OrderStore, PaymentStore, StoreError};

/// Errors surfaced by order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("checkout failed: {0}")]
    Gateway(GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for order operations
pub type OrderResult<T> = Result<T, OrderError>;

/// Checkout parameters resolved once at startup
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub default_provider: PaymentProvider,
    pub currency: String,
    pub request_timeout: Duration,
    pub success_url: Option<String>,
    pub failure_url: Option<String>,
    pub pending_url: Option<String>,
    pub webhook_url: Option<String>,
}

impl CheckoutSettings {
    pub fn from_config(config: &Config) -> Self {
        CheckoutSettings {
            default_provider: config.default_provider,
            currency: config.currency.clone(),
            request_timeout: config.checkout_timeout,
            success_url: config.success_url.clone(),
            failure_url: config.failure_url.clone(),
            pending_url: config.pending_url.clone(),
            webhook_url: config.webhook_url.clone(),
        }
    }
}

/// A freshly initiated checkout: the pending order plus the payment
/// carrying the checkout URL
#[derive(Debug)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub payment: Payment,
}

pub struct OrderService {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentStore>,
    directory: Arc<dyn DirectoryStore>,
    gateways: Arc<GatewayFactory>,
    retry: RetryPolicy,
    settings: CheckoutSettings,
}

impl OrderService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentStore>,
        directory: Arc<dyn DirectoryStore>,
        gateways: Arc<GatewayFactory>,
        retry: RetryPolicy,
        settings: CheckoutSettings,
    ) -> Self {
        OrderService {
            orders,
            payments,
            directory,
            gateways,
            retry,
            settings,
        }
    }

    /// Create an order with its payment and initiate checkout at the
    /// configured provider.
    pub async fn create_order(&self, client_id: Uuid, plan_id: Uuid) -> OrderResult<CheckoutOutcome> {
        let client = self
            .directory
            .get_client(client_id)
            .await?
            .ok_or(OrderError::NotFound("client"))?;
        let plan = self
            .directory
            .get_plan(plan_id)
            .await?
            .ok_or(OrderError::NotFound("plan"))?;

        if !plan.active {
            return Err(OrderError::Validation(format!(
                "plan {} is no longer available",
                plan.id
            )));
        }

        let provider = self.settings.default_provider;
        let gateway = self
            .gateways
            .resolve(provider)
            .map_err(OrderError::Gateway)?;

        let mut order = Order::new(&client, &plan);
        let mut payment = Payment::new(order.id(), plan.price_minor, provider)?;

        // Persist intent before touching the network: a crash between here
        // and the gateway response leaves a pending row that can be failed
        // or retried, not a lost purchase.
        self.orders.add(&order).await?;
        self.payments.add(&payment).await?;

        tracing::info!(
            order_id = %order.id(),
            payment_id = %payment.id(),
            client_id = %client_id,
            plan_id = %plan_id,
            provider = provider.as_str(),
            "order created, initiating checkout"
        );

        // The external reference is our payment id: the only identifier
        // that exists on both sides before the provider assigns its own.
        let request = CheckoutRequest {
            external_reference: payment.id().to_string(),
            amount_minor: payment.amount_minor(),
            currency: self.settings.currency.clone(),
            description: plan.description.clone(),
            customer_name: client.name.clone(),
            customer_email: client.email.clone(),
            success_url: self.settings.success_url.clone(),
            failure_url: self.settings.failure_url.clone(),
            pending_url: self.settings.pending_url.clone(),
            webhook_url: self.settings.webhook_url.clone(),
        };

        let call = self.retry.run("create_payment", || gateway.create_payment(&request));
        let outcome = match tokio::time::timeout(self.settings.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Transport(format!(
                "checkout timed out after {}s",
                self.settings.request_timeout.as_secs()
            ))),
        };

        match outcome {
            Ok(handle) => {
                payment.set_checkout_url(&handle.checkout_url)?;
                if let Some(qr_code) = &handle.qr_code {
                    payment.set_qr_code(qr_code)?;
                }
                self.payments.update(&payment).await?;
                order.attach_payment(payment.clone())?;

                tracing::info!(
                    order_id = %order.id(),
                    payment_id = %payment.id(),
                    "checkout created"
                );
                Ok(CheckoutOutcome { order, payment })
            }
            Err(err) => {
                self.resolve_checkout_failure(&mut order, &mut payment, &err.to_string())
                    .await?;
                Err(OrderError::Gateway(err))
            }
        }
    }

    /// Settle the already-persisted pending rows into their failed states.
    /// Runs on every failure path out of the gateway call, including the
    /// request deadline.
    async fn resolve_checkout_failure(
        &self,
        order: &mut Order,
        payment: &mut Payment,
        reason: &str,
    ) -> OrderResult<()> {
        payment.fail(reason)?;
        order.mark_payment_failed()?;
        self.payments.update(payment).await?;
        self.orders.update(order).await?;

        tracing::warn!(
            order_id = %order.id(),
            payment_id = %payment.id(),
            reason,
            "checkout failed, order marked payment_failed"
        );
        Ok(())
    }

    pub async fn get_order(&self, id: Uuid) -> OrderResult<Order> {
        self.orders
            .get_by_id(id)
            .await?
            .ok_or(OrderError::NotFound("order"))
    }

    /// Order history for a client, newest first
    pub async fn orders_for_client(&self, client_id: Uuid) -> OrderResult<Vec<Order>> {
        Ok(self.orders.list_by_client(client_id).await?)
    }

    /// The client's current active order, if one is inside its billing window
    pub async fn active_order_for_client(&self, client_id: Uuid) -> OrderResult<Order> {
        let now = Utc::now();
        self.orders
            .list_by_client(client_id)
            .await?
            .into_iter()
            .find(|order| order.is_active_and_valid(now))
            .ok_or(OrderError::NotFound("active order"))
    }

    /// Cancel an order and any of its payments still awaiting an outcome.
    /// Cancelling twice is a no-op.
    pub async fn cancel_order(&self, id: Uuid) -> OrderResult<Order> {
        let mut order = self.get_order(id).await?;
        order.cancel();
        self.orders.update(&order).await?;

        for payment in order.payments() {
            if payment.status() == crate::domain::PaymentStatus::Pending {
                let mut payment = payment.clone();
                payment.cancel()?;
                self.payments.update(&payment).await?;
            }
        }

        tracing::info!(order_id = %order.id(), "order cancelled");
        self.get_order(id).await
    }

    pub async fn get_payment(&self, id: Uuid) -> OrderResult<Payment> {
        self.payments
            .get_by_id(id)
            .await?
            .ok_or(OrderError::NotFound("payment"))
    }

    /// Payment history for a client, newest first
    pub async fn payments_for_client(&self, client_id: Uuid) -> OrderResult<Vec<Payment>> {
        Ok(self.payments.list_by_client(client_id).await?)
    }
}
