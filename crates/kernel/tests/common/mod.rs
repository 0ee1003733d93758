#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Builds the real router over the in-memory store with scriptable doubles
//! for the path registry and the message publisher, so tests exercise the
//! actual coordinator and handlers without external services.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use content_store_kernel::arbiter::{PathArbiter, ReservationOutcome};
use content_store_kernel::metrics::Metrics;
use content_store_kernel::presenter::UrlBuilder;
use content_store_kernel::queue::{MessagePublisher, PublishEvent};
use content_store_kernel::routes;
use content_store_kernel::state::AppState;
use content_store_kernel::store::{ContentStore, MemoryContentStore};

/// Path registry double that always answers with a fixed outcome and
/// records every call.
pub struct ScriptedArbiter {
    outcome: ReservationOutcome,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedArbiter {
    pub fn new(outcome: ReservationOutcome) -> Self {
        Self {
            outcome,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reserving() -> Self {
        Self::new(ReservationOutcome::Reserved)
    }

    /// `(base_path, publishing_app)` pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PathArbiter for ScriptedArbiter {
    async fn reserve(&self, base_path: &str, publishing_app: &str) -> ReservationOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((base_path.to_string(), publishing_app.to_string()));
        self.outcome.clone()
    }
}

/// Publisher double that records every event.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<PublishEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<PublishEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn send(&self, event: PublishEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Publisher double that behaves like a broker refusing every confirm:
/// the failure is absorbed, counted, and the event is retained as the
/// observability record.
pub struct NackingPublisher {
    metrics: Arc<Metrics>,
    events: Mutex<Vec<PublishEvent>>,
    failures: AtomicUsize,
}

impl NackingPublisher {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            events: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<PublishEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagePublisher for NackingPublisher {
    async fn send(&self, event: PublishEvent) {
        self.failures.fetch_add(1, Ordering::SeqCst);
        self.metrics.publish_failures.inc();
        self.events.lock().unwrap().push(event);
    }
}

/// A fully wired application over in-memory components.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryContentStore>,
    pub arbiter: Arc<ScriptedArbiter>,
    pub publisher: Arc<RecordingPublisher>,
    pub metrics: Arc<Metrics>,
}

impl TestApp {
    /// App whose registry always reserves.
    pub fn new() -> Self {
        Self::with_reservation(ReservationOutcome::Reserved)
    }

    /// App whose registry always answers with `outcome`.
    pub fn with_reservation(outcome: ReservationOutcome) -> Self {
        let store = Arc::new(MemoryContentStore::new());
        let arbiter = Arc::new(ScriptedArbiter::new(outcome));
        let publisher = Arc::new(RecordingPublisher::default());
        let metrics = Arc::new(Metrics::new());

        let router = build_router(
            Arc::clone(&arbiter) as Arc<dyn PathArbiter>,
            Arc::clone(&store) as Arc<dyn ContentStore>,
            Arc::clone(&publisher) as Arc<dyn MessagePublisher>,
            Arc::clone(&metrics),
        );

        Self {
            router,
            store,
            arbiter,
            publisher,
            metrics,
        }
    }
}

/// Wire the real routers and state around the given components.
pub fn build_router(
    arbiter: Arc<dyn PathArbiter>,
    store: Arc<dyn ContentStore>,
    publisher: Arc<dyn MessagePublisher>,
    metrics: Arc<Metrics>,
) -> Router {
    let state = AppState::with_components(
        arbiter,
        store,
        publisher,
        metrics,
        UrlBuilder::new("http://content-store.test"),
        900,
    );

    Router::new()
        .merge(routes::content_item::router())
        .merge(routes::health::router())
        .merge(routes::metrics::router())
        .with_state(state)
}

/// Send a PUT with a JSON body.
pub async fn put_json(router: &Router, uri: &str, body: &serde_json::Value) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Send a PUT with a raw (possibly malformed) body.
pub async fn put_raw(router: &Router, uri: &str, body: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Send a GET.
pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A valid update payload.
pub fn valid_payload() -> serde_json::Value {
    serde_json::json!({
        "title": "VAT rates",
        "format": "answer",
        "update_type": "major",
        "publishing_app": "publisher",
        "details": { "body": "Something about VAT" },
    })
}
