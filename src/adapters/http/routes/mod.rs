pub mod monitoring;

use axum::{Json, Router, middleware, routing::get};

use crate::adapters::http::{app_state::AppState, middleware::require_ops_token};

pub fn router(app_state: AppState) -> Router<AppState> {
    Router::new()
        .merge(
            monitoring::router()
                .route_layer(middleware::from_fn_with_state(app_state, require_ops_token)),
        )
        .route("/health", get(health))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
