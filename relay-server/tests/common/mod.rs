//! Mock upstream completions server for relay tests

#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use relay_server::{LlmService, RelayConfig};
use serde_json::Value;
use tokio::net::TcpListener;

pub const TEST_API_KEY: &str = "gsk_test_key";

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
    received: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Mock completions endpoint that answers every call with a canned status and
/// body, recording what it received.
pub struct MockUpstream {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<RecordedRequest>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockUpstream {
    pub async fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self::start(status, body.into(), None).await
    }

    /// Like `new`, but holds every response for `delay` first.
    pub async fn with_delay(status: StatusCode, body: impl Into<String>, delay: Duration) -> Self {
        Self::start(status, body.into(), Some(delay)).await
    }

    async fn start(status: StatusCode, body: String, delay: Option<Duration>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));

        let state = MockState {
            status,
            body,
            delay,
            received: received.clone(),
        };

        let app = Router::new()
            .route("/openai/v1/chat/completions", post(mock_completions))
            .layer(DefaultBodyLimit::disable())
            .with_state(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            received,
            _handle: handle,
        }
    }

    pub fn completions_url(&self) -> String {
        format!("http://{}/openai/v1/chat/completions", self.addr)
    }

    pub fn received(&self) -> Vec<RecordedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn mock_completions(
    State(state): State<MockState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body_json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.received.lock().unwrap().push(RecordedRequest {
        headers,
        body: body_json,
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }

    (
        state.status,
        [(axum::http::header::CONTENT_TYPE, "application/json")],
        state.body,
    )
        .into_response()
}

pub fn config_for(upstream_url: String) -> RelayConfig {
    RelayConfig {
        api_key: TEST_API_KEY.to_string(),
        upstream_url,
        ..RelayConfig::default()
    }
}

pub fn relay_app(config: &RelayConfig) -> Router {
    relay_server::app(Arc::new(LlmService::new(config).unwrap()))
}

/// A URL on which nothing is listening.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/openai/v1/chat/completions", addr)
}
