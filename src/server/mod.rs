//! HTTP surface: `/run`, `/read`, `/files` and `/health`

mod error;
mod routes;

pub use error::ErrorBody;

use crate::command::Dispatcher;
use crate::core::error::Result;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

pub fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/run", post(routes::run_task))
        .route("/read", get(routes::read_path))
        .route("/files", get(routes::list_files))
        .route("/health", get(routes::health))
        .fallback(routes::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { dispatcher })
}

pub async fn serve(dispatcher: Arc<Dispatcher>, bind: SocketAddr) -> Result<()> {
    let app = build_router(dispatcher);
    info!("Starting task server on {}", bind);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
