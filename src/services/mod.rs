pub mod order_service;
pub mod webhook_service;

pub use order_service::{CheckoutOutcome, CheckoutSettings, OrderError, OrderService};
pub use webhook_service::{ReconcileOutcome, WebhookError, WebhookReconciler};
