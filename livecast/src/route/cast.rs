use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::route::AppState;

pub fn route() -> Router<AppState> {
    Router::new().route("/api/cast/:device", post(cast))
}

async fn cast(
    State(state): State<AppState>,
    Path(device): Path<String>,
    Json(req): Json<api::request::CastPlay>,
) -> crate::result::Result<Json<api::response::CastResult>> {
    let outcome = state.caster.cast_to(&device, &req.url).await?;
    Ok(Json(outcome))
}
