use super::common::{
    created_response, no_content_response, success_response, validate_input, Operator,
};
use crate::{
    errors::ServiceError,
    handlers::AppState,
    models::{AddLinkRequest, AliasNameRequest, AliasSearchQuery},
    store::LinkOutcome,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use tracing::info;

/// Creates the router for alias group endpoints
pub fn aliases_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_alias))
        .route("/search", get(search_aliases))
        .route("/links/:link_id", delete(delete_link))
        .route("/links/part/:part_id", delete(delete_part_link))
        .route("/:id", put(rename_alias).delete(delete_alias))
        .route("/:id/links", get(list_links).post(add_link))
}

async fn create_alias(
    State(state): State<AppState>,
    Json(payload): Json<AliasNameRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(created_response(
        state.store.create_alias(&payload.alias_name).await?,
    ))
}

async fn search_aliases(
    State(state): State<AppState>,
    Query(query): Query<AliasSearchQuery>,
) -> impl IntoResponse {
    success_response(state.store.search_aliases(&query).await)
}

async fn rename_alias(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AliasNameRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    validate_input(&payload)?;
    Ok(success_response(
        state.store.rename_alias(id, &payload.alias_name).await?,
    ))
}

async fn delete_alias(
    State(state): State<AppState>,
    operator: Operator,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.store.delete_alias(id).await?;
    info!(alias_id = id, %operator, "Alias deleted via API");
    Ok(no_content_response())
}

async fn list_links(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.store.alias_links(id).await?))
}

/// 201 for a new link, 200 when the part was already in this group
async fn add_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<AddLinkRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(match state.store.add_alias_link(id, payload.part_id).await? {
        LinkOutcome::Created(link) => created_response(link),
        LinkOutcome::AlreadyLinked(link) => success_response(link),
    })
}

async fn delete_link(
    State(state): State<AppState>,
    Path(link_id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.store.delete_alias_link(link_id).await?;
    Ok(no_content_response())
}

async fn delete_part_link(
    State(state): State<AppState>,
    operator: Operator,
    Path(part_id): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    state.store.delete_part_alias_link(part_id).await?;
    info!(part_id, %operator, "Alias disabled via API");
    Ok(no_content_response())
}
