//! Axum-based HTTP server exposing the metrics for scraping

use crate::error::Result;
use crate::logging::get_logger;
use crate::metrics::ChargerMetrics;
use crate::poller::PollStatus;
use axum::response::Redirect;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub metrics: Arc<ChargerMetrics>,
    pub status_rx: watch::Receiver<PollStatus>,
}

pub(crate) async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

pub(crate) async fn status(State(state): State<AppState>) -> Json<PollStatus> {
    let snapshot = state.status_rx.borrow().clone();
    Json(snapshot)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/metrics") }))
        .route("/metrics", get(metrics))
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Bind the metrics listener; an invalid host falls back to all interfaces
pub async fn bind(host: &str, port: u16) -> Result<TcpListener> {
    let logger = get_logger("web");

    let addr: SocketAddr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!(
                "Invalid host '{}'; falling back to 0.0.0.0",
                host
            ));
            ([0, 0, 0, 0], port).into()
        }
    };

    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Metrics endpoint listening at http://{}:{}/metrics",
        local_addr.ip(),
        local_addr.port()
    ));
    Ok(listener)
}

pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .map_err(|e| crate::error::AmtronError::web(e.to_string()))
}
