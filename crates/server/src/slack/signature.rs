//! Slack request signature verification.
//!
//! <https://api.slack.com/authentication/verifying-requests-from-slack>
//!
//! The signing secret belongs to the application that owns the matched
//! template or actions block, so verification happens after routing lookup.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use super::error::SlackError;

/// Header carrying the `v0=` signature.
pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";

/// Header carrying the request timestamp (unix seconds).
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";

/// Maximum accepted clock skew, in seconds.
const MAX_SKEW_SECS: u64 = 300;

/// Verify a Slack webhook signature against the current time.
///
/// # Arguments
///
/// * `signing_secret` - The application's signing secret
/// * `timestamp` - The `X-Slack-Request-Timestamp` header value
/// * `body` - The raw request body
/// * `signature` - The `X-Slack-Signature` header value
///
/// # Errors
///
/// Returns `SlackError::InvalidSignature` if the timestamp is malformed or
/// stale, or the signature does not match.
pub fn verify_signature(
    signing_secret: &SecretString,
    timestamp: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), SlackError> {
    let now_secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_err(|e| SlackError::InvalidSignature(e.to_string()))?
        .as_secs();

    let now = i64::try_from(now_secs)
        .map_err(|_| SlackError::InvalidSignature("System time overflow".to_string()))?;

    verify_signature_at(signing_secret, timestamp, body, signature, now)
}

/// Verify a signature as of `now` (unix seconds).
fn verify_signature_at(
    signing_secret: &SecretString,
    timestamp: &str,
    body: &[u8],
    signature: &str,
    now: i64,
) -> Result<(), SlackError> {
    // Replay protection
    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SlackError::InvalidSignature("Invalid timestamp".to_string()))?;

    if now.abs_diff(ts) > MAX_SKEW_SECS {
        return Err(SlackError::InvalidSignature(
            "Request timestamp too old".to_string(),
        ));
    }

    let expected = compute_signature(signing_secret, timestamp, body)?;

    if !constant_time_compare(&expected, signature) {
        return Err(SlackError::InvalidSignature(
            "Signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Compute the `v0=` signature of a request body.
///
/// # Errors
///
/// Returns `SlackError::InvalidSignature` if the HMAC cannot be keyed.
pub fn compute_signature(
    signing_secret: &SecretString,
    timestamp: &str,
    body: &[u8],
) -> Result<String, SlackError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(signing_secret.expose_secret().as_bytes())
        .map_err(|e| SlackError::InvalidSignature(e.to_string()))?;

    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);

    Ok(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
