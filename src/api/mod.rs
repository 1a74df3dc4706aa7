use axum::Router;
use axum::routing::{get, post};

pub mod handlers;
pub mod responses;

pub use handlers::ApiContext;

pub fn router(context: ApiContext) -> Router {
    Router::new()
        .route("/api/location", post(handlers::post_location))
        .route("/api/eta/{bus_line}", get(handlers::get_latest_eta))
        .route("/api/destinations", get(handlers::get_destinations))
        .route("/api/health", get(handlers::get_health))
        .with_state(context)
}
