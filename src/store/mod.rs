//! Persistence boundary.
//!
//! Orders and payments are persisted independently and composed on read;
//! clients and plans are owned elsewhere and exposed read-only. Production
//! runs on Postgres, dev and tests on the in-memory store, selected by
//! configuration the same way the platform swaps its event bus backends.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ClientRecord, Order, Payment, PlanRecord};

/// Errors surfaced by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid stored value for {column}: {value}")]
    InvalidColumn { column: &'static str, value: String },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a new order. Attached payments are persisted through the
    /// payment store, not here.
    async fn add(&self, order: &Order) -> StoreResult<()>;

    /// Overwrite the mutable fields of an existing order
    async fn update(&self, order: &Order) -> StoreResult<()>;

    /// Fetch an order with its payments composed in creation order
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Order>>;

    /// All orders for a client, newest first, payments composed
    async fn list_by_client(&self, client_id: Uuid) -> StoreResult<Vec<Order>>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn add(&self, payment: &Payment) -> StoreResult<()>;

    /// Overwrite the mutable fields of an existing payment
    async fn update(&self, payment: &Payment) -> StoreResult<()>;

    /// Conditional update that only lands while the stored row is still
    /// pending. Returns false when a concurrent writer got there first;
    /// this is the duplicate-webhook guard.
    async fn update_if_pending(&self, payment: &Payment) -> StoreResult<bool>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Payment>>;

    /// Payment history for a client, resolved through order ownership,
    /// newest first
    async fn list_by_client(&self, client_id: Uuid) -> StoreResult<Vec<Payment>>;
}

/// Read-side lookup of clients and plans owned by other services
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn get_client(&self, id: Uuid) -> StoreResult<Option<ClientRecord>>;
    async fn get_plan(&self, id: Uuid) -> StoreResult<Option<PlanRecord>>;
}
