// GitHub webhook HTTP route
//
// Orchestration per request: validate -> build envelope -> deliver ->
// respond. Validation failures short-circuit with a JSON error body;
// delivery failures are logged and absorbed so the sender still gets 200.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use hookbridge_core::{build_event, verify_signature, CaptureContext, ValidationError};

use crate::config::Config;
use crate::forwarder::EventSink;

/// GitHub's event-type marker header
pub const EVENT_HEADER: &str = "x-github-event";

/// GitHub's signature header (HMAC-SHA256 over the raw body)
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// App state for the webhook route
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub capture: Arc<CaptureContext>,
    pub sink: Arc<dyn EventSink>,
}

impl AppState {
    pub fn new(config: Arc<Config>, capture: CaptureContext, sink: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            capture: Arc::new(capture),
            sink,
        }
    }
}

/// Acknowledgement body for accepted deliveries
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub received: bool,
}

/// JSON error body for rejected deliveries
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create the webhook routes. Only POST is routed; other methods on the
/// path get a JSON 405 from the method fallback.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/github-webhook",
            post(receive_webhook).fallback(method_not_allowed),
        )
        .with_state(state)
}

/// Non-POST methods on the webhook path. Every failure response carries a
/// JSON error body, including this one.
async fn method_not_allowed() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorResponse {
            error: "method not allowed".to_string(),
        }),
    )
}

/// POST /github-webhook - normalize one delivery and hand it to the sink
pub async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, (StatusCode, Json<ErrorResponse>)> {
    let event_subtype = headers
        .get(EVENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| reject(&headers, &body, ValidationError::MissingEventMarker))?;

    // Signature covers the exact raw bytes, so verification happens
    // before any parsing
    if let Some(secret) = &state.config.webhook_secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        verify_signature(secret, &body, signature)
            .map_err(|e| reject(&headers, &body, e))?;
    }

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| reject(&headers, &body, ValidationError::invalid_body(e.to_string())))?;

    // Build and deliver inside an unwind boundary so an unexpected fault
    // is logged with the request context instead of escaping the handler
    let outcome = AssertUnwindSafe(async {
        let event = build_event(&event_subtype, &payload, &state.capture);
        let delivery = state.sink.deliver(&event).await;
        (event, delivery)
    })
    .catch_unwind()
    .await;

    let (event, delivery) = match outcome {
        Ok(pair) => pair,
        Err(panic) => return Err(internal_fault(&headers, &body, panic)),
    };

    // Delivery is best-effort: a failed forward never fails the inbound
    // response, it only shows up in the logs
    match delivery {
        Ok(()) => {
            tracing::info!(
                event_id = %event.event_id,
                correlation_id = %event.correlation_id,
                subtype = %event.event_subtype,
                repository = %event.payload.repository,
                mode = state.sink.mode(),
                "webhook processed"
            );
        }
        Err(e) => {
            tracing::error!(
                event_id = %event.event_id,
                correlation_id = %event.correlation_id,
                subtype = %event.event_subtype,
                mode = state.sink.mode(),
                "event delivery failed: {e}"
            );
        }
    }

    Ok(Json(WebhookAck {
        success: true,
        received: true,
    }))
}

/// Map a validation failure to its status code, logging the full request
/// context for diagnosis
fn reject(
    headers: &HeaderMap,
    body: &Bytes,
    error: ValidationError,
) -> (StatusCode, Json<ErrorResponse>) {
    let status = match error {
        ValidationError::MissingEventMarker | ValidationError::InvalidBody(_) => {
            StatusCode::BAD_REQUEST
        }
        ValidationError::MissingSignature | ValidationError::SignatureMismatch => {
            StatusCode::FORBIDDEN
        }
    };

    tracing::warn!(
        status = status.as_u16(),
        headers = ?headers,
        body = %String::from_utf8_lossy(body),
        "webhook rejected: {error}"
    );

    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

/// Map an unexpected fault to a 500, logging the full request context
/// (headers, body) for diagnosis
fn internal_fault(
    headers: &HeaderMap,
    body: &Bytes,
    panic: Box<dyn std::any::Any + Send>,
) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(
        headers = ?headers,
        body = %String::from_utf8_lossy(body),
        "webhook handler fault: {}",
        panic_detail(panic.as_ref())
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal server error".to_string(),
        }),
    )
}

/// Best-effort panic payload rendering
pub(crate) fn panic_detail(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forwarder::{LogSink, SinkError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use hookbridge_core::{sign, StructuredEvent};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Sink that counts deliveries and optionally fails every one
    struct RecordingSink {
        deliveries: AtomicUsize,
        fail: bool,
    }

    impl RecordingSink {
        fn new(fail: bool) -> Self {
            Self {
                deliveries: AtomicUsize::new(0),
                fail,
            }
        }

        fn delivery_count(&self) -> usize {
            self.deliveries.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn deliver(&self, _event: &StructuredEvent) -> Result<(), SinkError> {
            self.deliveries.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SinkError::Status(503))
            } else {
                Ok(())
            }
        }

        fn mode(&self) -> &'static str {
            "recording"
        }
    }

    fn test_state(secret: Option<&str>, sink: Arc<dyn EventSink>) -> AppState {
        AppState::new(
            Arc::new(Config {
                port: 0,
                webhook_secret: secret.map(str::to_string),
                forward_url: None,
            }),
            CaptureContext::default(),
            sink,
        )
    }

    fn webhook_request(event: Option<&str>, signature: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/github-webhook")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(event) = event {
            builder = builder.header(EVENT_HEADER, event);
        }
        if let Some(signature) = signature {
            builder = builder.header(SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_missing_event_header_is_400_and_nothing_delivered() {
        let sink = Arc::new(RecordingSink::new(false));
        let app = routes(test_state(None, sink.clone()));

        let response = app
            .oneshot(webhook_request(None, None, "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "missing event marker");
        assert_eq!(sink.delivery_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_with_json_error_body() {
        let app = routes(test_state(None, Arc::new(LogSink)));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/github-webhook")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "method not allowed");
    }

    #[tokio::test]
    async fn test_accepted_delivery_returns_success_body() {
        let sink = Arc::new(RecordingSink::new(false));
        let app = routes(test_state(None, sink.clone()));

        let payload = json!({"repository": {"full_name": "octo/demo"}}).to_string();
        let response = app
            .oneshot(webhook_request(Some("push"), None, &payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["received"], true);
        assert_eq!(sink.delivery_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_object_payload_is_accepted() {
        let app = routes(test_state(None, Arc::new(LogSink)));

        let response = app
            .oneshot(webhook_request(Some("ping"), None, "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invalid_json_body_is_400() {
        let app = routes(test_state(None, Arc::new(LogSink)));

        let response = app
            .oneshot(webhook_request(Some("push"), None, "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().starts_with("invalid JSON body"));
    }

    #[tokio::test]
    async fn test_valid_signature_is_accepted() {
        let secret = "s3cret";
        let sink = Arc::new(RecordingSink::new(false));
        let app = routes(test_state(Some(secret), sink.clone()));

        let body = json!({"action": "opened"}).to_string();
        let signature = sign(secret, body.as_bytes());

        let response = app
            .oneshot(webhook_request(Some("issues"), Some(&signature), &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(sink.delivery_count(), 1);
    }

    #[tokio::test]
    async fn test_tampered_body_with_stale_signature_is_403() {
        let secret = "s3cret";
        let sink = Arc::new(RecordingSink::new(false));
        let app = routes(test_state(Some(secret), sink.clone()));

        let body = json!({"action": "opened"}).to_string();
        let signature = sign(secret, body.as_bytes());
        let tampered = json!({"action": "closed"}).to_string();

        let response = app
            .oneshot(webhook_request(Some("issues"), Some(&signature), &tampered))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], "signature mismatch");
        assert_eq!(sink.delivery_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_signature_with_secret_is_403() {
        let app = routes(test_state(Some("s3cret"), Arc::new(LogSink)));

        let response = app
            .oneshot(webhook_request(Some("push"), None, "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"], "missing signature");
    }

    #[tokio::test]
    async fn test_signature_ignored_when_no_secret_configured() {
        let app = routes(test_state(None, Arc::new(LogSink)));

        let response = app
            .oneshot(webhook_request(
                Some("push"),
                Some("sha256=0000000000000000000000000000000000000000000000000000000000000000"),
                "{}",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    /// Sink that panics mid-delivery, standing in for any unexpected
    /// internal fault after validation
    struct PanickingSink;

    #[async_trait]
    impl EventSink for PanickingSink {
        async fn deliver(&self, _event: &StructuredEvent) -> Result<(), SinkError> {
            panic!("delivery exploded");
        }

        fn mode(&self) -> &'static str {
            "panicking"
        }
    }

    #[tokio::test]
    async fn test_internal_fault_becomes_json_500() {
        let app = routes(test_state(None, Arc::new(PanickingSink)));

        let response = app
            .oneshot(webhook_request(Some("push"), None, "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn test_delivery_failure_still_returns_200() {
        let sink = Arc::new(RecordingSink::new(true));
        let app = routes(test_state(None, sink.clone()));

        let response = app
            .oneshot(webhook_request(Some("push"), None, "{}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(sink.delivery_count(), 1);
    }
}
