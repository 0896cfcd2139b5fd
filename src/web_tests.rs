#![cfg(test)]

use super::web::*;
use crate::metrics::ChargerMetrics;
use crate::parsers::{PhaseValues, Readings};
use crate::poller::PollStatus;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use std::sync::Arc;
use tokio::sync::watch;
use tower::ServiceExt;

fn test_state() -> (AppState, watch::Sender<PollStatus>) {
    let metrics = Arc::new(ChargerMetrics::new().unwrap());
    let (status_tx, status_rx) = watch::channel(PollStatus::default());
    (AppState { metrics, status_rx }, status_tx)
}

async fn get(state: AppState, uri: &str) -> axum::response::Response {
    build_router(state)
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn health_ok() {
    let (state, _tx) = test_state();
    let response = get(state, "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "ok");
}

#[tokio::test]
async fn metrics_serves_exposition_text() {
    let (state, _tx) = test_state();
    state.metrics.publish(&Readings {
        env_temperature: 19.0,
        offered_amperage: 16.0,
        charging_amperage: PhaseValues::splat(0.0),
        error_state: 0,
        type2_status: 1.0,
        load_contactor_cycles: 10,
        type2_plug_cycles: 20,
        ocpp_voltage: PhaseValues::splat(230.0),
        ocpp_frequency: 50.0,
        fallbacks: Vec::new(),
    });

    let response = get(state, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("env_temperature 19"));
    assert!(body.contains("ocpp_voltage{phase=\"L3\"} 230"));
}

#[tokio::test]
async fn status_reflects_latest_snapshot() {
    let (state, tx) = test_state();
    tx.send_modify(|s| {
        s.total_cycles = 7;
        s.last_error = Some("HTTP error".to_string());
    });

    let response = get(state, "/api/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["total_cycles"], 7);
    assert_eq!(json["last_error"], "HTTP error");
}

#[tokio::test]
async fn root_redirects_to_metrics() {
    let (state, _tx) = test_state();
    let response = get(state, "/").await;
    assert!(response.status().is_redirection());
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/metrics"
    );
}
