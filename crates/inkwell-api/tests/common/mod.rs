//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use inkwell_core::actor::Actor;
use inkwell_core::clock::Clock;
use inkwell_core::rng::DeterministicRng;
use inkwell_identity::application::ports::NotificationDispatcher;
use inkwell_identity::domain::code::VerificationPolicy;
use inkwell_identity::domain::otp::Channel;
use inkwell_store::pg_actor_directory::PgActorDirectory;
use inkwell_store::pg_event_repository::PgEventRepository;
use inkwell_store::pg_otp_store::PgOtpStore;
use inkwell_test_support::{FixedClock, SequenceRng};
use sqlx::PgPool;
use tower::ServiceExt;

use inkwell_api::routes;
use inkwell_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// A dispatcher that keeps every delivered code for inspection.
#[derive(Debug, Default)]
pub struct Outbox {
    sent: Mutex<Vec<(Channel, String, String)>>,
}

impl Outbox {
    /// The most recent code delivered to `identifier`.
    pub fn last_code_for(&self, identifier: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(_, to, _)| to == identifier)
            .map(|(_, _, code)| code.clone())
    }

    /// Number of deliveries so far.
    pub fn len(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationDispatcher for Outbox {
    async fn send(&self, channel: Channel, identifier: &str, code: &str) -> bool {
        self.sent
            .lock()
            .unwrap()
            .push((channel, identifier.to_owned(), code.to_owned()));
        true
    }
}

/// Build the full app router with real `PostgreSQL` adapters and a
/// deterministic Clock/RNG. Uses the same route structure as `main.rs`.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, SequenceRng::new(vec![]), Arc::new(Outbox::default()), None)
}

/// Build the full app router with a custom RNG, outbox, and master code.
pub fn build_test_app_with(
    pool: PgPool,
    rng: SequenceRng,
    outbox: Arc<Outbox>,
    master_code: Option<&str>,
) -> Router {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(rng));
    let app_state = AppState::new(
        fixed_clock(),
        rng,
        Arc::new(PgEventRepository::new(pool.clone())),
        Arc::new(PgOtpStore::new(pool.clone())),
        Arc::new(PgActorDirectory::new(pool)),
        outbox,
        VerificationPolicy::new(master_code.map(str::to_owned)),
    );
    routes::app(app_state)
}

/// Registers actors in the directory.
pub async fn seed_actors(pool: &PgPool, actors: &[Actor]) {
    let directory = PgActorDirectory::new(pool.clone());
    for actor in actors {
        directory.upsert(*actor).await.unwrap();
    }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
