// Webhook signature verification
//
// GitHub signs deliveries with HMAC-SHA256 over the raw body bytes and
// sends the lowercase-hex digest as `X-Hub-Signature-256: sha256=<hex>`.
// Verification must run over the exact bytes received, never over a
// re-serialized body. Comparison is constant-time via Mac::verify_slice.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ValidationError;

type HmacSha256 = Hmac<Sha256>;

/// Header value prefix for SHA-256 signatures
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify the webhook signature header against the raw request body.
///
/// `signature` is the full header value including the `sha256=` prefix;
/// `None` means the header was absent. With a secret configured the header
/// is required and must match; this function is not called at all when no
/// secret is configured (documented weak mode, verification skipped).
pub fn verify_signature(
    secret: &str,
    raw_body: &[u8],
    signature: Option<&str>,
) -> Result<(), ValidationError> {
    let signature = signature.ok_or(ValidationError::MissingSignature)?;

    let hex_digest = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or(ValidationError::SignatureMismatch)?;

    let received = hex::decode(hex_digest).map_err(|_| ValidationError::SignatureMismatch)?;

    // HMAC accepts keys of any length, so new_from_slice cannot fail here
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ValidationError::SignatureMismatch)?;
    mac.update(raw_body);

    // verify_slice is constant-time; no early exit proportional to a
    // matching prefix
    mac.verify_slice(&received)
        .map_err(|_| ValidationError::SignatureMismatch)
}

/// Compute the signature header value for a body, `sha256=` prefix
/// included. Used by tests and by senders that need to sign payloads.
pub fn sign(secret: &str, raw_body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(raw_body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}
