mod errors;
mod handlers;
mod middleware;
mod state;

use axum::{Router, middleware as axum_middleware, routing::get, routing::post};

pub use state::HttpState;

pub fn router(state: HttpState) -> Router<()> {
    let api = Router::new()
        .route("/sync/checksums", get(handlers::checksums))
        .route("/sync/submit", post(handlers::submit))
        .route_layer(axum_middleware::from_fn(middleware::require_bearer));

    Router::new().nest("/api", api).with_state(state)
}
