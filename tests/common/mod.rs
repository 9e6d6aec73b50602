//! Stub downstream services served by a real axum listener on 127.0.0.1:0
#![allow(dead_code)]

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use relayway::{
    config::ExecutorConfig,
    runtime::{CallExecutor, ExecutionEngine, HttpTransport},
};
use serde_json::{json, Value};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::net::TcpListener;

/// Per-path call counter shared with the stub handlers
#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<Mutex<HashMap<&'static str, usize>>>);

impl Calls {
    fn hit(&self, path: &'static str) {
        *self.0.lock().unwrap().entry(path).or_default() += 1;
    }

    pub fn count(&self, path: &str) -> usize {
        self.0.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.lock().unwrap().values().sum()
    }
}

pub struct Services {
    pub base: String,
    pub calls: Calls,
}

impl Services {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

async fn constant(State(calls): State<Calls>) -> Json<Value> {
    calls.hit("/a");
    Json(json!({ "v": 1 }))
}

async fn echo(State(calls): State<Calls>, Json(body): Json<Value>) -> Json<Value> {
    calls.hit("/echo");
    Json(body)
}

async fn backup(State(calls): State<Calls>, Json(body): Json<Value>) -> Json<Value> {
    calls.hit("/backup");
    Json(json!({ "backup": true, "input": body }))
}

async fn fail(State(calls): State<Calls>) -> StatusCode {
    calls.hit("/fail");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn slow(State(calls): State<Calls>) -> Json<Value> {
    calls.hit("/slow");
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "late": true }))
}

/// Start the stub services and return their base URL
pub async fn spawn_services() -> Services {
    let calls = Calls::default();
    let app = Router::new()
        .route("/a", post(constant))
        .route("/echo", post(echo))
        .route("/backup", post(backup))
        .route("/fail", post(fail))
        .route("/slow", post(slow))
        .with_state(calls.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Services {
        base: format!("http://{}", addr),
        calls,
    }
}

/// Engine over the real HTTP transport
pub fn engine(config: ExecutorConfig) -> ExecutionEngine {
    let executor = Arc::new(CallExecutor::new(
        Arc::new(HttpTransport::new()),
        config.call_timeout(),
    ));
    ExecutionEngine::new(executor, &config)
}

pub fn short_timeouts() -> ExecutorConfig {
    ExecutorConfig {
        call_timeout_ms: 300,
        ..ExecutorConfig::default()
    }
}
