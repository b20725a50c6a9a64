// Envelope Builder
//
// Pure mapping from the loosely-typed webhook payload to a StructuredEvent.
// The only non-determinism is identifier generation and capture timestamps.
//
// Every extraction tolerates an entirely absent parent object: a payload
// with no repository, pull_request, issue, or head_commit still builds a
// fully defaulted event. "First match wins" fields skip empty strings but
// a present-and-empty labels array does stop the chain (it is a value, not
// an absence).

use chrono::Utc;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::event::{
    EventContext, EventMetadata, EventPayload, StructuredEvent, DEFAULT_CONFIDENCE,
    DEFAULT_PRIORITY, EVENT_SOURCE, EVENT_TYPE, TRIGGER_RULE_GITHUB_EVENT_MATCH,
};

/// Capture-time host information, assembled once at startup by the caller
/// so the builder itself stays a pure function of its arguments.
#[derive(Debug, Clone, Default)]
pub struct CaptureContext {
    /// Working directory of the capturing process
    pub workspace_path: String,
    /// Open-ended environment info (host name, service version, ...)
    pub environment: Map<String, Value>,
}

/// Build a [`StructuredEvent`] from a validated webhook delivery.
///
/// `event_subtype` is the value of the event-type header; `payload` is the
/// parsed request body. Two calls with identical input produce events that
/// differ only in `event_id`, `correlation_id`, and timestamps.
pub fn build_event(event_subtype: &str, payload: &Value, capture: &CaptureContext) -> StructuredEvent {
    let now = Utc::now();

    let current_project = str_at(payload, &["repository", "name"]);

    let title = first_str(payload, &[
        ["pull_request", "title"],
        ["issue", "title"],
        ["head_commit", "message"],
    ]);
    let body = first_str(payload, &[["pull_request", "body"], ["issue", "body"]]);
    let url = first_str(payload, &[
        ["pull_request", "html_url"],
        ["issue", "html_url"],
        ["repository", "html_url"],
    ]);

    let labels = get_at(payload, &["pull_request", "labels"])
        .filter(|v| v.is_array())
        .or_else(|| get_at(payload, &["issue", "labels"]).filter(|v| v.is_array()))
        .map(label_names)
        .unwrap_or_default();

    let changes = get_at(payload, &["changes"])
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    StructuredEvent {
        event_id: Uuid::new_v4(),
        correlation_id: Uuid::new_v4(),
        event_type: EVENT_TYPE.to_string(),
        event_source: EVENT_SOURCE.to_string(),
        event_subtype: event_subtype.to_string(),
        timestamp: now,
        priority: DEFAULT_PRIORITY,
        context: EventContext {
            workspace_path: capture.workspace_path.clone(),
            current_project,
            environment: capture.environment.clone(),
        },
        payload: EventPayload {
            repository: str_at(payload, &["repository", "full_name"]),
            sender: str_at(payload, &["sender", "login"]),
            git_ref: str_at(payload, &["ref"]),
            commit_id: str_at(payload, &["head_commit", "id"]),
            issue_number: int_at(payload, &["issue", "number"]),
            pull_request_number: int_at(payload, &["pull_request", "number"]),
            title,
            body,
            labels,
            action: str_at(payload, &["action"]),
            changes,
            url,
        },
        metadata: EventMetadata {
            trigger_rules: vec![TRIGGER_RULE_GITHUB_EVENT_MATCH.to_string()],
            confidence: DEFAULT_CONFIDENCE,
            processed_at: now,
        },
    }
}

/// Safe navigation: descend `path` through nested objects, None on any
/// missing or non-object step.
fn get_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// String at `path`, empty string when absent or not a string.
fn str_at(value: &Value, path: &[&str]) -> String {
    get_at(value, path)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Integer at `path`, None when absent or not an integer.
fn int_at(value: &Value, path: &[&str]) -> Option<i64> {
    get_at(value, path).and_then(Value::as_i64)
}

/// First non-empty string across candidate paths, else empty string.
fn first_str(value: &Value, paths: &[[&str; 2]]) -> String {
    paths
        .iter()
        .filter_map(|path| get_at(value, path))
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Reduce an array of label objects to their `name` fields, source order
/// preserved. Entries without a string `name` are skipped.
fn label_names(labels: &Value) -> Vec<String> {
    labels
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|label| label.get("name"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
