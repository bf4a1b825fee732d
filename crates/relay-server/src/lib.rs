//! HTTP surface of the command relay.
//!
//! Controllers enqueue commands and read history; the agent drains the
//! queue and posts results back. Every response is JSON, failures carry
//! `{"success": false, "error": ...}`.

mod routes;

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use relay_command_store::CommandStore;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct RelayState {
    store: Arc<CommandStore>,
}

impl RelayState {
    pub fn new(store: Arc<CommandStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CommandStore> {
        &self.store
    }
}

pub fn build_router(state: RelayState) -> Router {
    with_layers(routes().with_state(state))
}

fn routes() -> Router<RelayState> {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "success": true })) }))
        .nest("/api", routes::router())
}

fn with_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(cors::Any)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail, "relay handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Internal server error" })),
    )
        .into_response()
}

/// Serve the relay on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: RelayState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "relay server listening");
    }
    axum::serve(listener, build_router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}
