use crate::error::AppError;
use crate::models::order::OrderSubmission;
use crate::models::OrderResponse;
use crate::services::fanout;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

pub async fn submit_order(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<OrderResponse>, AppError> {
    let Json(raw) = payload.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge
        } else {
            AppError::BadRequest(format!("Invalid request body: {}", e.body_text()))
        }
    })?;

    let order = OrderSubmission::validate(&raw, state.requires_email())?;
    let order_id = uuid::Uuid::new_v4().to_string();

    tracing::info!(
        order_id = %order_id,
        name = %order.name,
        phone = %order.phone,
        "New order received"
    );

    if state.notifiers.is_empty() {
        tracing::warn!(order_id = %order_id, "No notification channel configured, order reaches nobody");
    }

    let report = fanout::dispatch(&order, &state.notifiers).await;
    let (attempted, delivered) = (report.attempted(), report.delivered());
    report.decide(state.delivery_policy())?;

    tracing::info!(order_id = %order_id, attempted, delivered, "Order accepted");

    Ok(Json(OrderResponse {
        success: true,
        message: "Your order has been received! We will contact you shortly.".into(),
        order_id,
    }))
}
