//! HTTP surface.

pub mod orders;
pub mod payments;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use uuid::Uuid;

use crate::domain::{DomainError, PaymentProvider};
use crate::gateway::factory::GatewayFactory;
use crate::gateway::GatewayError;
use crate::models::ErrorResponse;
use crate::services::{OrderError, OrderService, WebhookReconciler};

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<OrderService>,
    pub reconciler: Arc<WebhookReconciler>,
    pub gateways: Arc<GatewayFactory>,
    pub default_provider: PaymentProvider,
}

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(orders::router(state.clone()))
        .merge(payments::router(state))
}

/// Error wrapper translating service failures into HTTP responses
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        ApiError {
            status,
            error,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse::new(self.error, self.message));
        (self.status, body).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::Validation(_) => Self::new(StatusCode::BAD_REQUEST, "invalid_request", message),
            OrderError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, "not_found", message),
            OrderError::Domain(DomainError::Validation(_)) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
            }
            OrderError::Domain(DomainError::InvalidTransition { .. }) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_transition", message)
            }
            OrderError::Gateway(GatewayError::Transport(_)) => {
                Self::new(StatusCode::BAD_GATEWAY, "gateway_unavailable", message)
            }
            OrderError::Gateway(GatewayError::Business(_)) => {
                Self::new(StatusCode::BAD_REQUEST, "gateway_rejected", message)
            }
            OrderError::Gateway(GatewayError::UnsupportedProvider(_)) => {
                Self::new(StatusCode::BAD_REQUEST, "unsupported_provider", message)
            }
            OrderError::Store(_) => {
                tracing::error!(error = %message, "store failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "database_error", message)
            }
        }
    }
}

/// Parse a path/body identifier, rejecting malformed values with a
/// caller-fixable 400
pub(crate) fn parse_id(value: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| ApiError::bad_request(format!("invalid {what} id: '{value}'")))
}
