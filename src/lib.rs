pub mod config;
pub mod domain;
pub mod gateway;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

pub use domain::{Order, OrderStatus, Payment, PaymentProvider, PaymentStatus};
pub use gateway::factory::GatewayFactory;
pub use gateway::retry::RetryPolicy;
pub use gateway::{CheckoutHandle, CheckoutRequest, PaymentGateway};
pub use services::order_service::OrderService;
pub use services::webhook_service::WebhookReconciler;
pub use store::{DirectoryStore, OrderStore, PaymentStore};
