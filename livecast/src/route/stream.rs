use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use http::StatusCode;

use crate::error::AppError;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/api/streams", get(index))
        .route("/api/streams/:id", delete(destroy))
        .route("/api/streams/sweep", post(sweep))
}

async fn index(
    State(state): State<AppState>,
) -> crate::result::Result<Json<Vec<api::response::Stream>>> {
    Ok(Json(state.manager.list().await))
}

async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> crate::result::Result<Response<String>> {
    if state.manager.remove(&id).await {
        Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body("".to_string())?)
    } else {
        Err(AppError::stream_not_found(format!("stream {id} not found")))
    }
}

async fn sweep(
    State(state): State<AppState>,
    body: Option<Json<api::request::Sweep>>,
) -> crate::result::Result<Json<api::response::SweepResult>> {
    // The body is optional; a bare POST sweeps at the configured age.
    let hours = body
        .and_then(|Json(req)| req.max_age_hours)
        .unwrap_or(state.config.janitor.max_age_hours);
    let removed = state.manager.sweep((hours * 3600) as i64).await;
    Ok(Json(api::response::SweepResult { removed }))
}
