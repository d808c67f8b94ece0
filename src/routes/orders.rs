//! Order endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::models::{CheckoutResponse, CreateOrderRequest, OrderResponse};

use super::{parse_id, ApiError, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/orders", post(create_order))
        .route("/api/orders/{id}", get(get_order).delete(cancel_order))
        .route("/api/orders/client/{client_id}", get(client_orders))
        .route("/api/orders/client/{client_id}/active", get(client_active_order))
        .with_state(state)
}

/// POST /api/orders - create an order and initiate checkout
async fn create_order(
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

/// GET /api/orders/{id}
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_id(&id, "order")?;
    let order = state.orders.get_order(id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// DELETE /api/orders/{id} - cancel; repeating the call is a no-op
async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = parse_id(&id, "order")?;
    let order = state.orders.cancel_order(id).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// GET /api/orders/client/{client_id} - order history, newest first
async fn client_orders(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let client_id = parse_id(&client_id, "client")?;
    let orders = state.orders.orders_for_client(client_id).await?;

    if orders.is_empty() {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "no orders for this client",
        ));
    }

    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /api/orders/client/{client_id}/active - current valid subscription
async fn client_active_order(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let client_id = parse_id(&client_id, "client")?;
    let order = state.orders.active_order_for_client(client_id).await?;
    Ok(Json(OrderResponse::from(&order)))
}
