// Validation error types
//
// These cover the client-input failure modes of a webhook delivery. The
// API crate maps them onto HTTP status codes (400 for a missing marker or
// unparseable body, 403 for signature failures).

use thiserror::Error;

/// Reasons an inbound webhook request is rejected before building an event
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// No event-type header on the request
    #[error("missing event marker")]
    MissingEventMarker,

    /// A secret is configured but the request carried no signature header
    #[error("missing signature")]
    MissingSignature,

    /// The signature header did not match the body digest
    #[error("signature mismatch")]
    SignatureMismatch,

    /// The request body was not valid JSON
    #[error("invalid JSON body: {0}")]
    InvalidBody(String),
}

impl ValidationError {
    /// Create an invalid-body error from a parse failure
    pub fn invalid_body(msg: impl Into<String>) -> Self {
        ValidationError::InvalidBody(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::MissingEventMarker.to_string(),
            "missing event marker"
        );
        assert_eq!(
            ValidationError::SignatureMismatch.to_string(),
            "signature mismatch"
        );
        assert_eq!(
            ValidationError::invalid_body("expected value at line 1").to_string(),
            "invalid JSON body: expected value at line 1"
        );
    }
}
