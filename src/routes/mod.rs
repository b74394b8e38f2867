pub mod admin;
pub mod public;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new().merge(public::router()).merge(admin::router());

    Router::new()
        .route("/", get(index))
        .nest("/api", api)
        .fallback(endpoint_not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    Json(json!({ "status": "success", "message": "welcome to the folio API" }))
}

async fn endpoint_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "status": "error", "message": "endpoint not found" })),
    )
}
