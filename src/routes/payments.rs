//! Payment endpoints: checkout, provider webhooks, queries.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::{
    CheckoutResponse, CreateOrderRequest, PaymentResponse, WebhookAck, WebhookCallback,
};
use crate::services::webhook_service::{ReconcileOutcome, WebhookError};

use super::{parse_id, ApiError, AppState};

/// Header carrying a provider's webhook signature, for adapters that sign
/// the raw body instead of shipping a shared secret in the payload
const SIGNATURE_HEADER: &str = "x-webhook-signature";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/payments/checkout", post(checkout))
        .route("/api/payments/webhook/approval", post(webhook_approval))
        .route("/api/payments/webhook/failure", post(webhook_failure))
        .route("/api/payments/{id}", get(get_payment))
        .route("/api/payments/client/{client_id}", get(client_payments))
        .with_state(state)
}

/// POST /api/payments/checkout - initiate a checkout for a client on a plan
async fn checkout(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let client_id = parse_id(&request.client_id, "client")?;
    let plan_id = parse_id(&request.plan_id, "plan")?;

    let outcome = state.orders.create_order(client_id, plan_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_id: outcome.order.id(),
            payment_id: outcome.payment.id(),
            checkout_url: outcome.payment.checkout_url().map(str::to_string),
            qr_code: outcome.payment.qr_code().map(str::to_string),
            amount_minor: outcome.payment.amount_minor(),
            order_status: outcome.order.status(),
            payment_status: outcome.payment.status(),
        }),
    ))
}

/// POST /api/payments/webhook/approval
async fn webhook_approval(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<WebhookAck>), ApiError> {
    handle_webhook(state, headers, body, "approval").await
}

/// POST /api/payments/webhook/failure
async fn webhook_failure(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<(StatusCode, Json<WebhookAck>), ApiError> {
    handle_webhook(state, headers, body, "failure").await
}

/// Shared webhook path. Both endpoints reconcile from the gateway-reported
/// status, so a mis-routed delivery still lands on the right outcome.
///
/// Acknowledgement policy: once the payload is structurally valid and
/// authenticated, respond 2xx even when reconciliation fails for a
/// non-retryable reason, so the provider does not retry-storm us over
/// webhooks we will never be able to apply.
async fn handle_webhook(
    state: AppState,
    headers: HeaderMap,
    body: String,
    kind: &'static str,
) -> Result<(StatusCode, Json<WebhookAck>), ApiError> {
    let callback: WebhookCallback = serde_json::from_str(&body)
        .map_err(|e| ApiError::bad_request(format!("malformed webhook payload: {e}")))?;

    if callback.transaction_id.trim().is_empty() {
        return Err(ApiError::bad_request("transaction_id is required"));
    }

    let provider = callback.provider.unwrap_or(state.default_provider);
    let gateway = state
        .gateways
        .resolve(provider)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if !gateway.validate_webhook(&body, callback.secret.as_deref(), signature) {
        tracing::warn!(
            kind,
            provider = provider.as_str(),
            transaction_id = %callback.transaction_id,
            "webhook failed secret validation"
        );
        return Err(ApiError::new(
            StatusCode::UNAUTHORIZED,
            "invalid_webhook_secret",
            "webhook secret validation failed",
        ));
    }

    tracing::info!(
        kind,
        provider = provider.as_str(),
        transaction_id = %callback.transaction_id,
        reported_status = callback.status.as_deref().unwrap_or("-"),
        "processing payment webhook"
    );

    match state
        .reconciler
        .reconcile(provider, &callback.transaction_id)
        .await
    {
        Ok(ReconcileOutcome::Applied { .. }) => Ok((
            StatusCode::OK,
            Json(WebhookAck {
                result: "applied",
                detail: None,
            }),
        )),
        Ok(ReconcileOutcome::AlreadyProcessed) => Ok((
            StatusCode::OK,
            Json(WebhookAck {
                result: "duplicate",
                detail: None,
            }),
        )),
        // A store failure is worth a provider retry; everything else is
        // final for this delivery and gets acknowledged.
        Err(WebhookError::Store(err)) => {
            tracing::error!(kind, error = %err, "store failure during reconciliation");
            Err(ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "database_error",
                err.to_string(),
            ))
        }
        Err(err) => {
            tracing::warn!(
                kind,
                transaction_id = %callback.transaction_id,
                error = %err,
                "webhook acknowledged without effect"
            );
            Ok((
                StatusCode::OK,
                Json(WebhookAck {
                    result: "ignored",
                    detail: Some(err.to_string()),
                }),
            ))
        }
    }
}

/// GET /api/payments/{id}
async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let id = parse_id(&id, "payment")?;
    let payment = state.orders.get_payment(id).await?;
    Ok(Json(PaymentResponse::from(&payment)))
}

/// GET /api/payments/client/{client_id} - payment history, newest first
async fn client_payments(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let client_id = parse_id(&client_id, "client")?;
    let payments = state.orders.payments_for_client(client_id).await?;
    Ok(Json(payments.iter().map(PaymentResponse::from).collect()))
}
