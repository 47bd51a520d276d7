//! API Routes
//!
//! Configures the Axum router with all cache endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, pop_handler, set_handler, set_many_handler,
    sweep_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tables/:table_id/records", put(set_handler))
        .route("/tables/:table_id/batch", put(set_many_handler))
        .route(
            "/tables/:table_id/records/:key",
            get(get_handler).delete(delete_handler),
        )
        .route("/tables/:table_id/records/:key/pop", post(pop_handler))
        .route("/tables/:table_id/sweep", post(sweep_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
