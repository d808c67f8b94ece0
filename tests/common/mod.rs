//! Shared harness for integration tests: in-memory store, mock gateway,
//! and the two services wired the way main wires them.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use orders_rs::domain::{BillingPeriod, ClientRecord, PaymentProvider, PaymentStatus, PlanRecord};
use orders_rs::gateway::factory::GatewayFactory;
use orders_rs::gateway::mock::MockGateway;
use orders_rs::gateway::retry::RetryPolicy;
use orders_rs::gateway::{CheckoutHandle, CheckoutRequest, GatewayResult, PaymentGateway};
use orders_rs::services::order_service::{CheckoutSettings, OrderService};
use orders_rs::services::webhook_service::WebhookReconciler;
use orders_rs::store::InMemoryStore;

pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

pub struct TestApp {
    pub store: InMemoryStore,
    pub gateway: Arc<MockGateway>,
    pub orders: OrderService,
    pub reconciler: WebhookReconciler,
    pub client: ClientRecord,
    pub plan: PlanRecord,
}

pub fn monthly_plan() -> PlanRecord {
    PlanRecord {
        id: Uuid::new_v4(),
        name: "Starter".to_string(),
        description: "Starter monthly plan".to_string(),
        price_minor: 2990,
        billing_period: BillingPeriod::Monthly,
        active: true,
    }
}

pub fn client_with_email(email: &str) -> ClientRecord {
    ClientRecord {
        id: Uuid::new_v4(),
        name: "Ana Souza".to_string(),
        email: email.to_string(),
    }
}

fn checkout_settings() -> CheckoutSettings {
    CheckoutSettings {
        default_provider: PaymentProvider::Mock,
        currency: "BRL".to_string(),
        request_timeout: Duration::from_secs(5),
        success_url: Some("https://app.example.com/checkout/success".to_string()),
        failure_url: Some("https://app.example.com/checkout/failure".to_string()),
        pending_url: None,
        webhook_url: Some("https://app.example.com/api/payments/webhook/approval".to_string()),
    }
}

pub fn spawn_app_with_email(email: &str) -> TestApp {
    let store = InMemoryStore::new();
    let client = client_with_email(email);
    let plan = monthly_plan();
    store.insert_client(client.clone());
    store.insert_plan(plan.clone());

    let gateway = Arc::new(MockGateway::new(WEBHOOK_SECRET));
    let gateways = Arc::new(
        GatewayFactory::new().with_adapter(PaymentProvider::Mock, gateway.clone()),
    );

    let orders = OrderService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gateways.clone(),
        RetryPolicy::immediate(),
        checkout_settings(),
    );
    let reconciler = WebhookReconciler::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gateways,
        RetryPolicy::immediate(),
    );

    TestApp {
        store,
        gateway,
        orders,
        reconciler,
        client,
        plan,
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with_email("ana@example.com")
}

impl TestApp {
    /// The provider transaction id the mock assigned to a payment's checkout
    pub fn transaction_for_payment(&self, payment_id: Uuid) -> String {
        self.gateway
            .transaction_for_reference(&payment_id.to_string())
            .expect("checkout should have recorded a transaction")
    }

    /// Flip the provider-side outcome, then hand back the transaction id a
    /// webhook would carry
    pub fn settle_payment(&self, payment_id: Uuid, status: PaymentStatus) -> String {
        let transaction_id = self.transaction_for_payment(payment_id);
        self.gateway.settle(&transaction_id, status);
        transaction_id
    }
}

/// Gateway stub returning canned answers, for driving the reconciler into
/// its correlation edge cases
pub struct ScriptedGateway {
    pub status: PaymentStatus,
    pub external_reference: String,
}

#[async_trait::async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_payment(&self, _request: &CheckoutRequest) -> GatewayResult<CheckoutHandle> {
        Ok(CheckoutHandle {
            checkout_url: "https://checkout.scripted.local/session".to_string(),
            qr_code: None,
        })
    }

    async fn get_payment_status(&self, _transaction_id: &str) -> GatewayResult<PaymentStatus> {
        Ok(self.status)
    }

    async fn get_external_reference(&self, _transaction_id: &str) -> GatewayResult<String> {
        Ok(self.external_reference.clone())
    }

    fn validate_webhook_secret(&self, secret: &str) -> bool {
        secret == WEBHOOK_SECRET
    }
}
