//! Routes for the Identity Verification bounded context.

use axum::extract::State;
use axum::{Json, Router, routing::post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use inkwell_identity::application::command_handlers;
use inkwell_identity::domain::commands;
use inkwell_identity::domain::otp::{Channel, Purpose};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /request-code.
#[derive(Debug, Deserialize)]
pub struct RequestCodeRequest {
    /// Email address or phone number.
    pub identifier: String,
    /// Delivery channel.
    pub channel: Channel,
    /// Why the code is needed.
    pub purpose: Purpose,
}

/// Response body for POST /request-code. Never carries the code.
#[derive(Debug, Serialize)]
pub struct RequestCodeResponse {
    /// The issued record.
    pub otp_id: Uuid,
    /// When the code stops verifying.
    pub expires_at: DateTime<Utc>,
}

/// Request body for POST /verify-code.
#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    /// Email address or phone number.
    pub identifier: String,
    /// Channel the code was requested for.
    pub channel: Channel,
    /// The submitted code.
    pub code: String,
}

/// Response body for POST /verify-code.
#[derive(Debug, Serialize)]
pub struct VerifyCodeResponse {
    /// Always `true`; failures are error responses.
    pub verified: bool,
    /// Normalized identifier that was verified.
    pub identifier: String,
    /// Channel that was verified.
    pub channel: Channel,
}

/// POST /request-code
#[instrument(skip(state, request), fields(channel = %request.channel))]
async fn request_code(
    State(state): State<AppState>,
    Json(request): Json<RequestCodeRequest>,
) -> Result<Json<RequestCodeResponse>, ApiError> {
    let command = commands::RequestCode {
        correlation_id: Uuid::new_v4(),
        identifier: request.identifier,
        channel: request.channel,
        purpose: request.purpose,
    };

    info!(correlation_id = %command.correlation_id, "handling request_code command");

    let issued = command_handlers::handle_request_code(
        &command,
        &state.policy,
        state.clock.as_ref(),
        &*state.rng,
        &*state.otp_store,
        &*state.dispatcher,
    )
    .await?;

    Ok(Json(RequestCodeResponse {
        otp_id: issued.otp_id,
        expires_at: issued.expires_at,
    }))
}

/// POST /verify-code
#[instrument(skip(state, request), fields(channel = %request.channel))]
async fn verify_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<VerifyCodeResponse>, ApiError> {
    let command = commands::VerifyCode {
        correlation_id: Uuid::new_v4(),
        identifier: request.identifier,
        channel: request.channel,
        code: request.code,
    };

    info!(correlation_id = %command.correlation_id, "handling verify_code command");

    let verification = command_handlers::handle_verify_code(
        &command,
        &state.policy,
        state.clock.as_ref(),
        &*state.otp_store,
    )
    .await?;

    Ok(Json(VerifyCodeResponse {
        verified: true,
        identifier: verification.identifier,
        channel: verification.channel,
    }))
}

/// Returns the router for the identity context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/request-code", post(request_code))
        .route("/verify-code", post(verify_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::TimeZone;
    use inkwell_core::clock::Clock;
    use inkwell_core::rng::DeterministicRng;
    use inkwell_identity::application::ports::{NotificationDispatcher, OtpStore};
    use inkwell_identity::domain::code::VerificationPolicy;
    use inkwell_identity::memory::InMemoryOtpStore;
    use inkwell_test_support::{
        EmptyEventRepository, FixedClock, InMemoryActorDirectory, SequenceRng,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    /// Records what would have been delivered.
    #[derive(Debug, Default)]
    struct CapturingDispatcher {
        sent: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationDispatcher for CapturingDispatcher {
        async fn send(&self, _channel: Channel, _identifier: &str, code: &str) -> bool {
            self.sent.lock().unwrap().push(code.to_owned());
            !self.fail
        }
    }

    fn app_state(
        store: Arc<InMemoryOtpStore>,
        dispatcher: Arc<CapturingDispatcher>,
        master_code: Option<&str>,
    ) -> AppState {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
        ));
        let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(SequenceRng::new(
            vec![482_913, 17, 654_321, 5, 99_999, 310_442, 8, 777_001],
        )));
        AppState::new(
            clock,
            rng,
            Arc::new(EmptyEventRepository),
            store as Arc<dyn OtpStore>,
            Arc::new(InMemoryActorDirectory::default()),
            dispatcher,
            VerificationPolicy::new(master_code.map(str::to_owned)),
        )
    }

    fn post(uri: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_of(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_request_then_verify_code() {
        // Arrange
        let store = Arc::new(InMemoryOtpStore::new());
        let dispatcher = Arc::new(CapturingDispatcher::default());
        let state = app_state(store, dispatcher.clone(), None);

        // Act
        let response = router()
            .with_state(state.clone())
            .oneshot(post(
                "/request-code",
                &serde_json::json!({
                    "identifier": "Ada@Example.com",
                    "channel": "email",
                    "purpose": "login"
                }),
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert!(json.get("code").is_none());
        Uuid::parse_str(json["otp_id"].as_str().unwrap()).unwrap();

        let code = dispatcher.sent.lock().unwrap()[0].clone();
        assert_eq!(code, "482913");

        let response = router()
            .with_state(state)
            .oneshot(post(
                "/verify-code",
                &serde_json::json!({
                    "identifier": "ada@example.com",
                    "channel": "email",
                    "code": code
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_of(response).await;
        assert_eq!(json["verified"], true);
        assert_eq!(json["identifier"], "ada@example.com");
    }

    #[tokio::test]
    async fn test_wrong_code_returns_401() {
        // Arrange
        let store = Arc::new(InMemoryOtpStore::new());
        let dispatcher = Arc::new(CapturingDispatcher::default());
        let state = app_state(store, dispatcher, None);
        router()
            .with_state(state.clone())
            .oneshot(post(
                "/request-code",
                &serde_json::json!({
                    "identifier": "+44 7700 900123",
                    "channel": "mobile",
                    "purpose": "signup"
                }),
            ))
            .await
            .unwrap();

        // Act
        let response = router()
            .with_state(state)
            .oneshot(post(
                "/verify-code",
                &serde_json::json!({
                    "identifier": "+447700900123",
                    "channel": "mobile",
                    "code": "000000"
                }),
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_of(response).await["error"], "invalid_code");
    }

    #[tokio::test]
    async fn test_sixth_request_returns_429() {
        // Arrange
        let store = Arc::new(InMemoryOtpStore::new());
        let dispatcher = Arc::new(CapturingDispatcher::default());
        let state = app_state(store, dispatcher.clone(), None);
        let body = serde_json::json!({
            "identifier": "ada@example.com",
            "channel": "email",
            "purpose": "login"
        });
        for _ in 0..5 {
            let response = router()
                .with_state(state.clone())
                .oneshot(post("/request-code", &body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        // Act
        let response = router()
            .with_state(state)
            .oneshot(post("/request-code", &body))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_of(response).await["error"], "rate_limited");
        assert_eq!(dispatcher.sent.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_dispatch_failure_returns_502() {
        let store = Arc::new(InMemoryOtpStore::new());
        let dispatcher = Arc::new(CapturingDispatcher {
            sent: Mutex::new(Vec::new()),
            fail: true,
        });
        let state = app_state(store.clone(), dispatcher, None);

        let response = router()
            .with_state(state)
            .oneshot(post(
                "/request-code",
                &serde_json::json!({
                    "identifier": "ada@example.com",
                    "channel": "email",
                    "purpose": "verification"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(store.records().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_identifier_returns_400() {
        let state = app_state(
            Arc::new(InMemoryOtpStore::new()),
            Arc::new(CapturingDispatcher::default()),
            None,
        );

        let response = router()
            .with_state(state)
            .oneshot(post(
                "/request-code",
                &serde_json::json!({
                    "identifier": "not-an-email",
                    "channel": "email",
                    "purpose": "login"
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_channel_returns_422() {
        let state = app_state(
            Arc::new(InMemoryOtpStore::new()),
            Arc::new(CapturingDispatcher::default()),
            None,
        );

        let response = router()
            .with_state(state)
            .oneshot(post(
                "/request-code",
                &serde_json::json!({
                    "identifier": "ada@example.com",
                    "channel": "pigeon",
                    "purpose": "login"
                }),
            ))
            .await
            .unwrap();

        // Axum returns 422 for deserialization failures.
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_master_code_verifies_without_delivery() {
        // Arrange
        let dispatcher = Arc::new(CapturingDispatcher::default());
        let state = app_state(
            Arc::new(InMemoryOtpStore::new()),
            dispatcher.clone(),
            Some("000000"),
        );

        // Act
        let response = router()
            .with_state(state)
            .oneshot(post(
                "/verify-code",
                &serde_json::json!({
                    "identifier": "ada@example.com",
                    "channel": "email",
                    "code": " 000000 "
                }),
            ))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert!(dispatcher.sent.lock().unwrap().is_empty());
    }
}
