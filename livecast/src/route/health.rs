use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppState>) -> Json<api::response::Health> {
    Json(api::response::Health {
        status: "ok".to_string(),
        devices: state.control.device_count().await,
        streams: state.manager.len().await,
    })
}
