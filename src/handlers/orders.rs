use super::common::{created_response, success_response, validate_input, Operator};
use crate::{errors::ServiceError, handlers::AppState, models::CreatePartOrderRequest};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, patch, post},
    Router,
};
use tracing::info;

/// Creates the router for supplier order endpoints
pub fn orders_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order))
        .route("/recent", get(recent_orders))
        .route("/:id/fulfill", patch(fulfill_order))
}

async fn place_order(
    State(state): State<AppState>,
    operator: Operator,
    Json(payload): Json<CreatePartOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let order = state.store.place_order(payload).await?;
    info!(order_id = order.id, part_id = order.part_id, %operator, "Order placed via API");
    Ok(created_response(order))
}

async fn recent_orders(State(state): State<AppState>) -> impl IntoResponse {
    success_response(state.store.recent_orders().await)
}

/// Marks the order received and adds its quantity to free stock
async fn fulfill_order(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let part = state.store.fulfill_order(id).await?;
    info!(order_id = id, part_id = part.id, %operator, "Order fulfilled via API");
    Ok(success_response(part))
}
