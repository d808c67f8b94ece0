//! HTTP request and response DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Order, OrderStatus, Payment, PaymentProvider, PaymentStatus};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub client_id: String,
    pub plan_id: String,
}

/// Returned by a successful checkout initiation
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: Uuid,
    pub payment_id: Uuid,
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    pub amount_minor: i64,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_minor: i64,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        PaymentResponse {
            id: payment.id(),
            order_id: payment.order_id(),
            amount_minor: payment.amount_minor(),
            status: payment.status(),
            provider: payment.provider(),
            transaction_id: payment.transaction_id().map(str::to_string),
            checkout_url: payment.checkout_url().map(str::to_string),
            qr_code: payment.qr_code().map(str::to_string),
            failure_reason: payment.failure_reason().map(str::to_string),
            created_at: payment.created_at(),
            approved_at: payment.approved_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub client_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub expired: bool,
    pub payments: Vec<PaymentResponse>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        OrderResponse {
            id: order.id(),
            client_id: order.client_id(),
            plan_id: order.plan_id(),
            start_date: order.start_date(),
            end_date: order.end_date(),
            status: order.status(),
            expired: order.is_expired(chrono::Utc::now()),
            payments: order.payments().iter().map(PaymentResponse::from).collect(),
        }
    }
}

/// Logical webhook payload: only the transaction id is guaranteed; the
/// reported status is advisory and re-read from the gateway.
#[derive(Debug, Deserialize)]
pub struct WebhookCallback {
    pub transaction_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub provider: Option<PaymentProvider>,
}

/// Webhook acknowledgement body. `result` is one of applied, duplicate,
/// ignored.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorResponse {
            error: error.into(),
            message: message.into(),
        }
    }
}
