use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/users", post(handlers::create_user))
        .route(
            "/users/:id",
            get(handlers::get_user).patch(handlers::patch_user),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
