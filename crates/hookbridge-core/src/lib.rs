// Webhook Normalization Core
//
// This crate turns a raw GitHub webhook delivery into a Structured Event,
// the normalized envelope that downstream collectors consume.
//
// Key design decisions:
// - The inbound payload is an open schema; extraction uses safe navigation
//   over serde_json::Value so an absent parent object never faults
// - Field resolution is first-match-wins across pull request, issue, and
//   head commit sources, with empty-string/null defaults
// - Signature verification is HMAC-SHA256 over the exact raw body bytes,
//   compared in constant time
// - No I/O here: the API crate owns transport, delivery, and configuration

pub mod envelope;
pub mod error;
pub mod event;
pub mod signature;

// Re-exports for convenience
pub use envelope::{build_event, CaptureContext};
pub use error::ValidationError;
pub use event::{EventContext, EventMetadata, EventPayload, StructuredEvent};
pub use signature::{sign, verify_signature};
