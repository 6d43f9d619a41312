use super::common::{
    created_response, no_content_response, success_response, validate_input, Operator,
};
use crate::{
    errors::ServiceError,
    handlers::AppState,
    models::{
        AddBomItemRequest, AmountRequest, CreateAssemblyRequest, ReplacePartRequest,
        SwapQuantityRequest, SwapResponse, UpdateAssemblyRequest, UpdateBomItemRequest,
    },
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use tracing::info;

/// Creates the router for assembly and BOM endpoints
pub fn assemblies_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assemblies))
        .route("/create", post(create_assembly))
        .route("/low_stock", get(low_stock_assemblies))
        .route("/:id", delete(delete_assembly))
        .route("/:id/detail", get(get_assembly_detail))
        .route("/:id/edit", put(update_assembly))
        .route("/:id/bom", post(add_bom_item))
        .route("/:id/bom/swap-quantity", post(swap_quantity))
        .route(
            "/:id/bom/:part_id",
            put(update_bom_item).delete(delete_bom_item),
        )
        .route("/:id/bom/:part_id/allocate", put(allocate))
        .route("/:id/bom/:part_id/deallocate", put(deallocate))
        .route("/:id/bom/:part_id/swap", put(replace_bom_part))
}

async fn list_assemblies(State(state): State<AppState>) -> impl IntoResponse {
    success_response(state.store.list_assemblies().await)
}

async fn create_assembly(
    State(state): State<AppState>,
    operator: Operator,
    Json(payload): Json<CreateAssemblyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let assembly = state.store.create_assembly(payload).await?;
    info!(assembly_id = assembly.id, %operator, "Assembly created via API");
    Ok(created_response(assembly))
}

async fn low_stock_assemblies(State(state): State<AppState>) -> impl IntoResponse {
    success_response(state.store.low_stock_assemblies().await)
}

async fn delete_assembly(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.store.delete_assembly(id).await?;
    info!(assembly_id = id, %operator, "Assembly deleted via API");
    Ok(no_content_response())
}

async fn get_assembly_detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.store.assembly_detail(id).await?))
}

async fn update_assembly(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAssemblyRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(success_response(state.store.update_assembly(id, payload).await?))
}

async fn add_bom_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AddBomItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(created_response(state.store.add_bom_item(id, payload).await?))
}

async fn update_bom_item(
    State(state): State<AppState>,
    Path((id, part_id)): Path<(i64, i64)>,
    Json(payload): Json<UpdateBomItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(success_response(
        state.store.update_bom_item(id, part_id, payload).await?,
    ))
}

async fn delete_bom_item(
    State(state): State<AppState>,
    operator: Operator,
    Path((id, part_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ServiceError> {
    state.store.delete_bom_item(id, part_id).await?;
    info!(assembly_id = id, part_id, %operator, "BOM line removed via API");
    Ok(no_content_response())
}

async fn allocate(
    State(state): State<AppState>,
    operator: Operator,
    Path((id, part_id)): Path<(i64, i64)>,
    Json(payload): Json<AmountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state.store.allocate(id, part_id, payload.amount).await?;
    info!(assembly_id = id, part_id, amount = payload.amount, %operator, "Allocation applied");
    Ok(success_response(line))
}

async fn deallocate(
    State(state): State<AppState>,
    operator: Operator,
    Path((id, part_id)): Path<(i64, i64)>,
    Json(payload): Json<AmountRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let line = state.store.deallocate(id, part_id, payload.amount).await?;
    info!(assembly_id = id, part_id, amount = payload.amount, %operator, "Deallocation applied");
    Ok(success_response(line))
}

async fn swap_quantity(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<i64>,
    Json(payload): Json<SwapQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let plan = state.store.swap_quantity(id, payload).await?;
    info!(
        assembly_id = id,
        source_part_id = payload.source_part_id,
        target_part_id = payload.target_part_id,
        swap_quantity = payload.swap_quantity,
        %operator,
        "Swap applied"
    );
    Ok(success_response(SwapResponse {
        message: "Swap completed".to_string(),
        returned_to_stock: plan.returned_to_stock,
        target_created: plan.target_created,
    }))
}

async fn replace_bom_part(
    State(state): State<AppState>,
    Path((id, part_id)): Path<(i64, i64)>,
    Json(payload): Json<ReplacePartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .store
            .replace_bom_part(id, part_id, payload.new_part_id)
            .await?,
    ))
}
