use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::AppError;
use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new().route("/api/devices", get(index))
}

async fn index(
    State(state): State<AppState>,
) -> crate::result::Result<Json<api::response::DeviceList>> {
    let devices = state
        .control
        .list_devices()
        .await
        .map_err(AppError::from)?;
    Ok(Json(api::response::DeviceList { devices }))
}
