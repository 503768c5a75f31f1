use std::future::Future;
use std::sync::Arc;

use axum::extract::Request;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_http::validate_request::ValidateRequestHeaderLayer;
use tracing::{error, info_span, Level};

use auth::ManyValidate;

use crate::cast::caster::Caster;
use crate::cast::catt::CattClient;
use crate::cast::ControlClient;
use crate::config::Config;
use crate::route::AppState;
use crate::stream::manager::Manager;

pub mod cast;
pub mod config;

mod error;
mod origin;
mod probe;
mod result;
mod route;
mod stream;
mod tick;
mod transcode;

/// Serves the webhook API with the production `catt` control client.
pub async fn serve<F>(cfg: Config, listener: TcpListener, signal: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let control = Arc::new(CattClient::new(&cfg.cast));
    serve_with(cfg, listener, signal, control).await
}

/// Same as [`serve`] with an injected control client, so tests can script the
/// device side.
pub async fn serve_with<F>(
    cfg: Config,
    listener: TcpListener,
    signal: F,
    control: Arc<dyn ControlClient>,
) where
    F: Future<Output = ()> + Send + 'static,
{
    let manager = Manager::new(cfg.storage.root.clone());
    let caster = Arc::new(Caster::new(cfg.clone(), manager.clone(), control.clone()));
    let app_state = AppState {
        config: cfg.clone(),
        manager,
        caster,
        control,
    };

    let auth_layer = ValidateRequestHeaderLayer::custom(ManyValidate::new(cfg.auth.to_tokens()));
    let app = Router::new()
        .merge(
            route::cast::route()
                .merge(route::stream::route())
                .merge(route::device::route())
                .layer(auth_layer),
        )
        .merge(route::health::route())
        .with_state(app_state.clone())
        .layer(if cfg.http.cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        })
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let span = info_span!(
                        "http_request",
                        uri = ?request.uri(),
                        method = ?request.method(),
                        span_id = tracing::field::Empty,
                    );
                    span.record(
                        "span_id",
                        span.id().unwrap_or(tracing::Id::from_u64(42)).into_u64(),
                    );
                    span
                })
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO))
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(Level::INFO)),
        );

    tokio::spawn(tick::expire_check(app_state));
    axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .await
        .unwrap_or_else(|e| error!("Application error: {e}"));
}
