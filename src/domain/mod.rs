pub mod directory;
pub mod order;
pub mod payment;

pub use directory::{BillingPeriod, ClientRecord, PlanRecord};
pub use order::{Order, OrderStatus};
pub use payment::{Payment, PaymentProvider, PaymentStatus};

/// Errors raised by aggregate mutators. A rejected mutation leaves the
/// aggregate unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    #[error("cannot {action} {entity} in status {status}")]
    InvalidTransition {
        entity: &'static str,
        action: &'static str,
        status: &'static str,
    },

    #[error("{0}")]
    Validation(String),
}

/// Result type for aggregate mutations
pub type DomainResult<T> = Result<T, DomainError>;
