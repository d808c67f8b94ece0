//! In-memory store for development and tests.
//!
//! Mirrors the Postgres implementation's semantics, including the
//! conditional pending update, behind a single mutex. Seed clients and
//! plans with the insert helpers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ClientRecord, Order, Payment, PaymentStatus, PlanRecord};

use super::{DirectoryStore, OrderStore, PaymentStore, StoreResult};

#[derive(Default)]
struct Inner {
    orders: HashMap<Uuid, Order>,
    payments: HashMap<Uuid, Payment>,
    clients: HashMap<Uuid, ClientRecord>,
    plans: HashMap<Uuid, PlanRecord>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_client(&self, client: ClientRecord) {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .clients
            .insert(client.id, client);
    }

    pub fn insert_plan(&self, plan: PlanRecord) {
        self.inner
            .lock()
            .expect("store mutex poisoned")
            .plans
            .insert(plan.id, plan);
    }

    fn compose_order(inner: &Inner, order: &Order) -> Order {
        let mut payments: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| p.order_id() == order.id())
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at());

        Order::restore(
            order.id(),
            order.client_id(),
            order.plan_id(),
            order.start_date(),
            order.end_date(),
            order.status(),
            payments,
        )
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn add(&self, order: &Order) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.orders.insert(order.id(), order.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .orders
            .get(&id)
            .map(|order| Self::compose_order(&inner, order)))
    }

    async fn list_by_client(&self, client_id: Uuid) -> StoreResult<Vec<Order>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.client_id() == client_id)
            .map(|order| Self::compose_order(&inner, order))
            .collect();
        orders.sort_by(|a, b| b.start_date().cmp(&a.start_date()));
        Ok(orders)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn add(&self, payment: &Payment) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.payments.insert(payment.id(), payment.clone());
        Ok(())
    }

    async fn update(&self, payment: &Payment) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        inner.payments.insert(payment.id(), payment.clone());
        Ok(())
    }

    async fn update_if_pending(&self, payment: &Payment) -> StoreResult<bool> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let still_pending = inner
            .payments
            .get(&payment.id())
            .map(|stored| stored.status() == PaymentStatus::Pending)
            .unwrap_or(false);

        if still_pending {
            inner.payments.insert(payment.id(), payment.clone());
        }
        Ok(still_pending)
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Payment>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.payments.get(&id).cloned())
    }

    async fn list_by_client(&self, client_id: Uuid) -> StoreResult<Vec<Payment>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut payments: Vec<Payment> = inner
            .payments
            .values()
            .filter(|p| {
                inner
                    .orders
                    .get(&p.order_id())
                    .map(|o| o.client_id() == client_id)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(payments)
    }
}

#[async_trait]
impl DirectoryStore for InMemoryStore {
    async fn get_client(&self, id: Uuid) -> StoreResult<Option<ClientRecord>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.clients.get(&id).cloned())
    }

    async fn get_plan(&self, id: Uuid) -> StoreResult<Option<PlanRecord>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner.plans.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PaymentProvider;

    #[tokio::test]
    async fn test_update_if_pending_applies_once() {
        let store = InMemoryStore::new();
        let order_id = Uuid::new_v4();
        let mut payment = Payment::new(order_id, 2990, PaymentProvider::Mock).unwrap();
        PaymentStore::add(&store, &payment).await.unwrap();

        payment.approve("tx_1").unwrap();
        assert!(store.update_if_pending(&payment).await.unwrap());

        // second writer loses the race
        let mut duplicate = PaymentStore::get_by_id(&store, payment.id()).await.unwrap().unwrap();
        assert_eq!(duplicate.status(), PaymentStatus::Approved);
        duplicate.fail("duplicate").unwrap_err();
        assert!(!store.update_if_pending(&payment).await.unwrap());
    }

    #[tokio::test]
    async fn test_order_read_composes_payments() {
        let store = InMemoryStore::new();
        let client = ClientRecord {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "t@example.com".to_string(),
        };
        let plan = PlanRecord {
            id: Uuid::new_v4(),
            name: "Starter".to_string(),
            description: "Starter".to_string(),
            price_minor: 2990,
            billing_period: crate::domain::BillingPeriod::Monthly,
            active: true,
        };

        let order = Order::new(&client, &plan);
        OrderStore::add(&store, &order).await.unwrap();

        let payment = Payment::new(order.id(), 2990, PaymentProvider::Mock).unwrap();
        PaymentStore::add(&store, &payment).await.unwrap();

        let loaded = OrderStore::get_by_id(&store, order.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.payments().len(), 1);
        assert_eq!(loaded.payments()[0].id(), payment.id());
    }
}
