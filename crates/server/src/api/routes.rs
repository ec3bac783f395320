use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/config", get(handlers::get_config))
        .route("/tasks", get(handlers::list_tasks))
        .route("/tasks/{task}/trigger", post(handlers::trigger_task))
        .route("/tasks/{task}", put(handlers::update_task))
        .route("/downloads", get(handlers::list_downloads))
        .route("/downloads/{id}", delete(handlers::cancel_download))
        .route("/library/wanted", get(handlers::wanted))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            handlers::api_key_middleware,
        ))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
}
