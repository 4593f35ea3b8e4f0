use std::sync::Arc;

use axum::routing::post;
use axum::Router;

use crate::AppState;

pub mod handlers;

/// Build the approval API router. All routes are relative; the caller
/// mounts this on the root router and attaches the shared state.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ticket", post(handlers::post_ticket))
        .route("/events", post(handlers::post_event))
        .route("/polls", post(handlers::post_poll))
}
