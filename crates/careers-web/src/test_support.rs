//! Router fixtures shared by the handler tests.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use careers_service::{CareerService, ServiceConfig};
use careers_storage::{load_catalog_fixture, seed_catalog, MemoryStore};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use crate::{app, AppState};

/// App state over an in-memory store loaded with the catalog fixture.
pub(crate) async fn seeded_state() -> AppState {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/catalog.yaml");
    let fixture = load_catalog_fixture(&path).await.unwrap();
    let store = Arc::new(MemoryStore::new());
    seed_catalog(store.as_ref(), &fixture).await.unwrap();
    AppState::new(CareerService::new(store, ServiceConfig::default()))
}

/// Sends one request through a fresh router; non-JSON bodies read back as `Null`.
pub(crate) async fn call(
    state: &AppState,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let resp = app(state.clone()).oneshot(request).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
