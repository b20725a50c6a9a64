// Event delivery sinks
//
// Two delivery modes behind one trait: LogSink writes the structured event
// to the log (the original log-only behavior), HttpForwarder POSTs it to
// the configured collector with a bounded timeout. Exactly one delivery
// attempt per event, no retry, no queue; the caller absorbs failures.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use hookbridge_core::StructuredEvent;

/// Outbound request timeout. The only cancellation mechanism for delivery.
const FORWARD_TIMEOUT: Duration = Duration::from_secs(5);

/// Header echoing the event subtype on forwarded requests
pub const EVENT_SUBTYPE_HEADER: &str = "x-webhook-event";

/// Delivery failures. Never surfaced to the inbound sender.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Connection, DNS, or timeout failure
    #[error("forward request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The collector answered outside the 2xx range
    #[error("destination returned status {0}")]
    Status(u16),

    /// Event could not be serialized
    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for structured events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Attempt exactly one delivery of the event
    async fn deliver(&self, event: &StructuredEvent) -> Result<(), SinkError>;

    /// Human-readable mode name, reported by /health
    fn mode(&self) -> &'static str;
}

/// Log-only sink: serializes the event and writes it to the log instead
/// of a downstream collector
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn deliver(&self, event: &StructuredEvent) -> Result<(), SinkError> {
        let rendered = serde_json::to_string_pretty(event)?;
        tracing::info!(
            event_id = %event.event_id,
            subtype = %event.event_subtype,
            "structured event (log-only mode):\n{rendered}"
        );
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "log-only"
    }
}

/// HTTP forwarder: one POST per event to the configured collector
pub struct HttpForwarder {
    client: Client,
    destination: String,
}

impl HttpForwarder {
    /// Create a forwarder for the given destination URL
    pub fn new(destination: String) -> Result<Self, SinkError> {
        let client = Client::builder().timeout(FORWARD_TIMEOUT).build()?;
        Ok(Self {
            client,
            destination,
        })
    }
}

#[async_trait]
impl EventSink for HttpForwarder {
    async fn deliver(&self, event: &StructuredEvent) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.destination)
            .header(EVENT_SUBTYPE_HEADER, &event.event_subtype)
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }

        tracing::debug!(
            event_id = %event.event_id,
            destination = %self.destination,
            status = status.as_u16(),
            "structured event forwarded"
        );
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "forward"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbridge_core::{build_event, CaptureContext};
    use serde_json::json;

    fn sample_event() -> StructuredEvent {
        build_event("push", &json!({}), &CaptureContext::default())
    }

    #[tokio::test]
    async fn test_log_sink_always_succeeds() {
        let sink = LogSink;
        assert!(sink.deliver(&sample_event()).await.is_ok());
        assert_eq!(sink.mode(), "log-only");
    }

    #[tokio::test]
    async fn test_http_forwarder_unreachable_destination_errors() {
        // Reserved TEST-NET-1 address, nothing listens there
        let sink = HttpForwarder::new("http://192.0.2.1:9/collect".to_string()).unwrap();
        let result = sink.deliver(&sample_event()).await;

        assert!(matches!(result, Err(SinkError::Http(_))));
        assert_eq!(sink.mode(), "forward");
    }
}
