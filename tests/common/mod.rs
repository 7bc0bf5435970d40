//! Mock Loki server for integration tests

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone, Debug)]
pub struct ReceivedPush {
    pub content_type: Option<String>,
    pub body: serde_json::Value,
}

#[derive(Clone)]
struct MockState {
    pushes: Arc<Mutex<Vec<ReceivedPush>>>,
    ready_status: Arc<AtomicU16>,
    push_status: Arc<AtomicU16>,
    ready_hits: Arc<AtomicUsize>,
}

pub struct MockLoki {
    pub addr: SocketAddr,
    state: MockState,
}

impl MockLoki {
    /// Start a mock Loki on a random port, ready and accepting pushes
    pub async fn start() -> Self {
        let state = MockState {
            pushes: Arc::new(Mutex::new(Vec::new())),
            ready_status: Arc::new(AtomicU16::new(200)),
            push_status: Arc::new(AtomicU16::new(204)),
            ready_hits: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/ready", get(ready))
            .route("/loki/api/v1/push", post(push))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_ready_status(&self, status: u16) {
        self.state.ready_status.store(status, Ordering::SeqCst);
    }

    pub fn set_push_status(&self, status: u16) {
        self.state.push_status.store(status, Ordering::SeqCst);
    }

    pub fn ready_hits(&self) -> usize {
        self.state.ready_hits.load(Ordering::SeqCst)
    }

    pub fn pushes(&self) -> Vec<ReceivedPush> {
        self.state.pushes.lock().unwrap().clone()
    }

    /// Poll until at least `count` pushes arrived or the timeout elapses
    pub async fn wait_for_pushes(&self, count: usize, timeout: Duration) -> Vec<ReceivedPush> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let pushes = self.pushes();
            if pushes.len() >= count || tokio::time::Instant::now() >= deadline {
                return pushes;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

async fn ready(State(state): State<MockState>) -> StatusCode {
    state.ready_hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::from_u16(state.ready_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn push(State(state): State<MockState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let status = StatusCode::from_u16(state.push_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if status.is_success() {
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        state
            .pushes
            .lock()
            .unwrap()
            .push(ReceivedPush { content_type, body });
    }

    status
}

/// An address nothing listens on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
