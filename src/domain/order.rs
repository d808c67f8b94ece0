//! Order aggregate.
//!
//! A customer's subscription purchase binding a client to a plan for one
//! billing period. Owns its payments; the attached payments must belong to
//! this order. Status only moves through the mutators below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::directory::{ClientRecord, PlanRecord};
use super::payment::{Payment, PaymentStatus};
use super::{DomainError, DomainResult};

/// Lifecycle status of an order. Expiry is derived from `end_date` and is
/// never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Active,
    Cancelled,
    PaymentFailed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Active => "active",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::PaymentFailed => "payment_failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "active" => Some(OrderStatus::Active),
            "cancelled" => Some(OrderStatus::Cancelled),
            "payment_failed" => Some(OrderStatus::PaymentFailed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Order {
    id: Uuid,
    client_id: Uuid,
    plan_id: Uuid,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: OrderStatus,
    payments: Vec<Payment>,
}

impl Order {
    /// Create a pending order for a client on a plan. The end date is fixed
    /// here from the plan's billing period and never recomputed.
    pub fn new(client: &ClientRecord, plan: &PlanRecord) -> Self {
        let start_date = Utc::now();
        Order {
            id: Uuid::new_v4(),
            client_id: client.id,
            plan_id: plan.id,
            start_date,
            end_date: plan.billing_period.end_date_from(start_date),
            status: OrderStatus::Pending,
            payments: Vec::new(),
        }
    }

    /// Rehydrate an order from persisted state
    pub(crate) fn restore(
        id: Uuid,
        client_id: Uuid,
        plan_id: Uuid,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        status: OrderStatus,
        payments: Vec<Payment>,
    ) -> Self {
        Order {
            id,
            client_id,
            plan_id,
            start_date,
            end_date,
            status,
            payments,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    /// Attach a payment to this order, rejecting payments created for a
    /// different order.
    pub fn attach_payment(&mut self, payment: Payment) -> DomainResult<()> {
        if payment.order_id() != self.id {
            return Err(DomainError::Validation(format!(
                "payment {} belongs to order {}, not {}",
                payment.id(),
                payment.order_id(),
                self.id
            )));
        }

        self.payments.push(payment);
        Ok(())
    }

    /// Most recently created payment, if any
    pub fn last_payment(&self) -> Option<&Payment> {
        self.payments.iter().max_by_key(|p| p.created_at())
    }

    /// All approved payments for this order
    pub fn approved_payments(&self) -> Vec<&Payment> {
        self.payments
            .iter()
            .filter(|p| p.status() == PaymentStatus::Approved)
            .collect()
    }

    /// Activate the order after payment approval. Cancelled and failed
    /// orders cannot be activated.
    pub fn activate(&mut self) -> DomainResult<()> {
        match self.status {
            OrderStatus::Cancelled | OrderStatus::PaymentFailed => Err(self.invalid("activate")),
            _ => {
                self.status = OrderStatus::Active;
                Ok(())
            }
        }
    }

    /// Cancel the order. Cancelling an already-cancelled order is a no-op.
    pub fn cancel(&mut self) {
        if self.status == OrderStatus::Cancelled {
            return;
        }
        self.status = OrderStatus::Cancelled;
    }

    /// Record a payment failure. An order that is already active cannot be
    /// retroactively failed.
    pub fn mark_payment_failed(&mut self) -> DomainResult<()> {
        if self.status == OrderStatus::Active {
            return Err(self.invalid("mark payment failed"));
        }

        self.status = OrderStatus::PaymentFailed;
        Ok(())
    }

    /// Whether the billing window has elapsed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end_date
    }

    /// Active and still inside the billing window
    pub fn is_active_and_valid(&self, now: DateTime<Utc>) -> bool {
        self.status == OrderStatus::Active && !self.is_expired(now)
    }

    fn invalid(&self, action: &'static str) -> DomainError {
        DomainError::InvalidTransition {
            entity: "order",
            action,
            status: self.status.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::BillingPeriod;
    use crate::domain::payment::PaymentProvider;
    use chrono::Duration;

    fn client() -> ClientRecord {
        ClientRecord {
            id: Uuid::new_v4(),
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
        }
    }

    fn plan(period: BillingPeriod) -> PlanRecord {
        PlanRecord {
            id: Uuid::new_v4(),
            name: "Starter".to_string(),
            description: "Starter plan".to_string(),
            price_minor: 2990,
            billing_period: period,
            active: true,
        }
    }

    #[test]
    fn test_new_order_is_pending_with_derived_end_date() {
        let order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(
            order.end_date(),
            BillingPeriod::Monthly.end_date_from(order.start_date())
        );
        assert!(order.payments().is_empty());
    }

    #[test]
    fn test_attach_payment_rejects_foreign_payment() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        let foreign = Payment::new(Uuid::new_v4(), 2990, PaymentProvider::Mock).unwrap();

        assert!(order.attach_payment(foreign).is_err());
        assert!(order.payments().is_empty());

        let own = Payment::new(order.id(), 2990, PaymentProvider::Mock).unwrap();
        order.attach_payment(own).unwrap();
        assert_eq!(order.payments().len(), 1);
    }

    #[test]
    fn test_activate_from_pending() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        order.activate().unwrap();
        assert_eq!(order.status(), OrderStatus::Active);
    }

    #[test]
    fn test_activate_rejected_when_cancelled() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        order.cancel();

        let err = order.activate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition { .. }));
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_activate_rejected_when_payment_failed() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        order.mark_payment_failed().unwrap();

        assert!(order.activate().is_err());
        assert_eq!(order.status(), OrderStatus::PaymentFailed);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        order.cancel();
        order.cancel();
        assert_eq!(order.status(), OrderStatus::Cancelled);
    }

    #[test]
    fn test_mark_payment_failed_rejected_when_active() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        order.activate().unwrap();

        assert!(order.mark_payment_failed().is_err());
        assert_eq!(order.status(), OrderStatus::Active);
    }

    #[test]
    fn test_expiry_is_derived_from_end_date() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        order.activate().unwrap();

        let inside = order.end_date() - Duration::days(1);
        let past = order.end_date() + Duration::days(1);

        assert!(order.is_active_and_valid(inside));
        assert!(!order.is_expired(inside));
        assert!(order.is_expired(past));
        assert!(!order.is_active_and_valid(past));
        // status untouched by expiry
        assert_eq!(order.status(), OrderStatus::Active);
    }

    #[test]
    fn test_last_payment_picks_most_recent() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        let first = Payment::new(order.id(), 2990, PaymentProvider::Mock).unwrap();
        let second = Payment::new(order.id(), 2990, PaymentProvider::Mock).unwrap();
        let second_id = second.id();

        order.attach_payment(first).unwrap();
        order.attach_payment(second).unwrap();

        // max_by_key returns the last element on ties, so attach order breaks
        // equal-timestamp races in favour of the newest payment
        assert_eq!(order.last_payment().unwrap().id(), second_id);
    }

    #[test]
    fn test_approved_payments_filters_by_status() {
        let mut order = Order::new(&client(), &plan(BillingPeriod::Monthly));
        let mut approved = Payment::new(order.id(), 2990, PaymentProvider::Mock).unwrap();
        approved.approve("tx_1").unwrap();
        let approved_id = approved.id();
        let mut failed = Payment::new(order.id(), 2990, PaymentProvider::Mock).unwrap();
        failed.fail("declined").unwrap();

        order.attach_payment(approved).unwrap();
        order.attach_payment(failed).unwrap();

        let approved = order.approved_payments();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id(), approved_id);
    }
}
