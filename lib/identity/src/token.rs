//! Identity token payload extraction.
//!
//! Signature validation is the provider's business: the token arrives over
//! the back channel straight from the token endpoint. Here the payload is
//! only decoded so it can be stored in the session and shown back to the
//! user.

use base64::Engine;
use gatekeeper_core::{IdentityPayload, Result};

use crate::error::AuthenticationError;

/// Decodes the payload segment of a compact JWT.
///
/// # Errors
///
/// Returns `MalformedIdentityToken` if the token does not have three
/// segments, the payload is not base64url, or it is not a JSON object.
pub fn decode_identity_payload(token: &str) -> Result<IdentityPayload, AuthenticationError> {
    // JWT is base64url(header).base64url(payload).signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(malformed("expected three segments").into());
    }

    // Some providers pad the segments
    let segment = parts[1].trim_end_matches('=');
    let payload_bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| malformed(format!("payload is not base64url: {e}")))?;

    let payload: serde_json::Value = serde_json::from_slice(&payload_bytes)
        .map_err(|e| malformed(format!("payload is not JSON: {e}")))?;

    if !payload.is_object() {
        return Err(malformed("payload is not a JSON object").into());
    }

    Ok(IdentityPayload::new(payload))
}

fn malformed(reason: impl Into<String>) -> AuthenticationError {
    AuthenticationError::MalformedIdentityToken {
        reason: reason.into(),
    }
}
