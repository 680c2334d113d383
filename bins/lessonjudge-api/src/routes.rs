use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::{auth, handlers, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    // Grading needs an authenticated caller; health and metrics do not
    let graded = Router::new()
        .route("/run", post(handlers::run_code))
        .route_layer(middleware::from_fn(auth::require_bearer));

    Router::new()
        .merge(graded)
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics))
}
