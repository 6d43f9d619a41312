use super::common::{created_response, success_response, validate_input, Operator};
use crate::{
    errors::ServiceError,
    handlers::AppState,
    models::{
        CreatePartRequest, DeletePartsRequest, MergePartsRequest, MessageResponse,
        UpdatePartRequest,
    },
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;

/// Creates the router for part endpoints
pub fn parts_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_parts).post(create_part).delete(delete_parts))
        .route("/merge", post(merge_parts))
        .route("/:id", get(get_part).put(update_part))
        .route("/:id/alias", get(get_part_alias).post(link_part_alias))
        .route("/:id/orders", get(list_part_orders))
}

async fn list_parts(State(state): State<AppState>) -> impl IntoResponse {
    success_response(state.store.list_parts().await)
}

async fn create_part(
    State(state): State<AppState>,
    Json(payload): Json<CreatePartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(created_response(state.store.create_part(payload).await?))
}

async fn get_part(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.store.get_part(id).await?))
}

async fn update_part(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let part = state.store.update_part(id, payload).await?;
    info!(part_id = id, quantity = part.quantity, %operator, "Part updated via API");
    Ok(success_response(part))
}

/// Deletes parts with no stock left and no BOM lines
async fn delete_parts(
    State(state): State<AppState>,
    operator: Operator,
    Json(payload): Json<DeletePartsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let deleted = state.store.delete_parts(payload).await?;
    info!(deleted, %operator, "Parts deleted via API");
    Ok(success_response(MessageResponse::new(format!(
        "{} parts deleted",
        deleted
    ))))
}

async fn list_part_orders(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.store.part_orders(id).await?))
}

/// Returns the part's alias group or `null`
async fn get_part_alias(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.store.part_alias(id).await?))
}

/// Finds or creates the group named after the part and links the part to it
async fn link_part_alias(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let group = state.store.link_part_to_own_alias(id).await?;
    info!(part_id = id, alias_id = group.id, %operator, "Alias enabled via API");
    Ok(success_response(group))
}

async fn merge_parts(
    State(state): State<AppState>,
    operator: Operator,
    Json(payload): Json<MergePartsRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let group = state.store.merge_parts(payload).await?;
    info!(
        source_part_id = payload.source_part_id,
        target_part_id = payload.target_part_id,
        alias_id = group.id,
        %operator,
        "Parts merged via API"
    );
    Ok(success_response(group))
}
