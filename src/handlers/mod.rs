pub mod aliases;
pub mod assemblies;
pub mod common;
pub mod health;
pub mod orders;
pub mod parts;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

use axum::Router;

/// All REST routes, without middleware. See [`crate::build_router`] for the layered app.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/api/assemblies", assemblies::assemblies_routes())
        .nest("/api/parts", parts::parts_routes())
        .nest("/api/aliases", aliases::aliases_routes())
        .nest("/api/part_orders", orders::orders_routes())
        .nest("/health", health::health_routes())
}
