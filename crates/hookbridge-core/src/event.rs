// Structured Event model
//
// The normalized envelope produced from one inbound webhook delivery.
// One event per request, no persistence; identifiers are fresh UUIDs so
// two identical deliveries yield two distinct events by design.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Producer schema identifier, constant for every event this service emits.
pub const EVENT_TYPE: &str = "github_webhook";

/// Event source identifier, constant.
pub const EVENT_SOURCE: &str = "github";

/// Fixed priority. Placeholder for a future rules engine; emitted as-is
/// regardless of event content.
pub const DEFAULT_PRIORITY: i64 = 5;

/// Fixed confidence score, same placeholder status as [`DEFAULT_PRIORITY`].
pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// The single trigger rule name reported until real rule matching exists.
pub const TRIGGER_RULE_GITHUB_EVENT_MATCH: &str = "github_event_match";

/// Normalized envelope for one webhook delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredEvent {
    /// Unique identifier for this event, generated at capture time
    pub event_id: Uuid,
    /// Independent identifier for downstream tracing
    pub correlation_id: Uuid,
    /// Producer schema identifier (always "github_webhook")
    pub event_type: String,
    /// Event source (always "github")
    pub event_source: String,
    /// Source-declared event kind, copied from the X-GitHub-Event header
    /// (e.g. "push", "pull_request", "issues")
    pub event_subtype: String,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    pub priority: i64,
    pub context: EventContext,
    pub payload: EventPayload,
    pub metadata: EventMetadata,
}

/// Execution context at capture time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventContext {
    /// Working directory of the capturing process
    pub workspace_path: String,
    /// Best-effort project name, taken from `repository.name` when present
    pub current_project: String,
    /// Open-ended environment info (host name, service version, ...)
    #[serde(default)]
    pub environment: Map<String, Value>,
}

/// Normalized business fields extracted from the webhook payload.
///
/// Text fields default to the empty string when no source provides them;
/// the numeric fields stay `null` instead, since "issue number 0" and
/// "no issue" are different statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    /// Repository full name (`owner/name`)
    pub repository: String,
    /// Login of the user that triggered the delivery
    pub sender: String,
    /// Git ref (push events)
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Head commit id (push events)
    pub commit_id: String,
    pub issue_number: Option<i64>,
    pub pull_request_number: Option<i64>,
    /// First match of: pull request title, issue title, head commit message
    pub title: String,
    /// First match of: pull request body, issue body
    pub body: String,
    /// Label names in source order, from the pull request or the issue
    pub labels: Vec<String>,
    /// Action verb ("opened", "closed", ...)
    pub action: String,
    /// Raw `changes` object from edit-type events
    #[serde(default)]
    pub changes: Map<String, Value>,
    /// Canonical URL: pull request, else issue, else repository
    pub url: String,
}

/// Processing metadata attached to every event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Names of the trigger rules that matched (currently always the
    /// single static rule)
    pub trigger_rules: Vec<String>,
    /// Fixed confidence score
    pub confidence: f64,
    /// Capture time at serialization
    pub processed_at: DateTime<Utc>,
}
