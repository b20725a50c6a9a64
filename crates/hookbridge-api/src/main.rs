// Hookbridge API server
// Decision: Delivery mode comes from config (FORWARD_URL unset = log-only), both modes coexist
// Decision: Unexpected handler faults are caught at the service boundary and become JSON 500s

mod config;
mod forwarder;
mod webhook;

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hookbridge_core::CaptureContext;

use crate::config::Config;
use crate::forwarder::{EventSink, HttpForwarder, LogSink};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    delivery_mode: &'static str,
    signature_verification: bool,
}

/// State for health endpoint
#[derive(Clone)]
struct HealthState {
    delivery_mode: &'static str,
    signature_verification: bool,
}

async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        delivery_mode: state.delivery_mode,
        signature_verification: state.signature_verification,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hookbridge_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("hookbridge-api starting...");

    let config = Config::from_env();

    if config.signature_required() {
        tracing::info!("Webhook signature verification enabled");
    } else {
        tracing::warn!(
            "GITHUB_WEBHOOK_SECRET not set. Signature verification disabled - \
             any sender can post to this endpoint."
        );
    }

    // Select the delivery sink from configuration
    let sink: Arc<dyn EventSink> = match &config.forward_url {
        Some(url) => {
            tracing::info!(destination = %url, "Forwarding structured events downstream");
            Arc::new(
                HttpForwarder::new(url.clone()).context("Failed to build forwarding client")?,
            )
        }
        None => {
            tracing::info!("FORWARD_URL not set, running in log-only mode");
            Arc::new(LogSink)
        }
    };

    let health_state = HealthState {
        delivery_mode: sink.mode(),
        signature_verification: config.signature_required(),
    };

    let capture = capture_context();
    let port = config.port;
    let state = webhook::AppState::new(Arc::new(config), capture, sink);

    let app = Router::new()
        .route("/health", get(health).with_state(health_state))
        .merge(webhook::routes(state))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Capture-time host information shared by every built event
fn capture_context() -> CaptureContext {
    let workspace_path = std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut environment = Map::new();
    if let Ok(hostname) = std::env::var("HOSTNAME") {
        environment.insert("hostname".to_string(), Value::String(hostname));
    }
    environment.insert(
        "service_version".to_string(),
        Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );

    CaptureContext {
        workspace_path,
        environment,
    }
}

/// Outermost fault boundary: an unexpected panic anywhere in the service
/// becomes a JSON 500 instead of tearing down the connection. The webhook
/// handler carries its own unwind boundary with full request context; this
/// layer is the safety net for everything outside it.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = webhook::panic_detail(err.as_ref());

    tracing::error!("request handler panicked: {detail}");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "internal server error"})),
    )
        .into_response()
}
