//! Inbound bank callback verification. The HTTP layer must capture the
//! raw request body before deserializing it — the HMAC is computed over
//! the exact bytes received, never a reserialized form.

use chrono::Utc;
use gateway_common::signature;

use crate::error::WebhookError;

/// Verifies `X-Bank-Signature` over `raw_body` and rejects timestamps more
/// than 300s away from now in either direction. `timestamp` is the value
/// already parsed out of the (still-raw) body by the caller.
pub fn verify_callback(secret: &[u8], raw_body: &str, signature_hex: &str, timestamp: i64) -> Result<(), WebhookError> {
    if !signature::within_skew(timestamp, Utc::now().timestamp()) {
        return Err(WebhookError::StaleTimestamp);
    }
    if !signature::verify(secret, timestamp, raw_body, signature_hex) {
        return Err(WebhookError::InvalidSignature);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_signature_within_skew() {
        let now = Utc::now().timestamp();
        let body = r#"{"transaction_id":"x"}"#;
        let sig = signature::sign(b"secret", now, body);
        assert!(verify_callback(b"secret", body, &sig, now).is_ok());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let now = Utc::now().timestamp();
        let stale = now - 301;
        let body = "{}";
        let sig = signature::sign(b"secret", stale, body);
        assert!(matches!(
            verify_callback(b"secret", body, &sig, stale),
            Err(WebhookError::StaleTimestamp)
        ));
    }

    #[test]
    fn rejects_tampered_signature() {
        let now = Utc::now().timestamp();
        let body = "{}";
        let mut sig = signature::sign(b"secret", now, body);
        sig.replace_range(0..1, if sig.starts_with('a') { "b" } else { "a" });
        assert!(matches!(
            verify_callback(b"secret", body, &sig, now),
            Err(WebhookError::InvalidSignature)
        ));
    }
}
