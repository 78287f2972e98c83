//! HMAC-SHA256 signing and verification shared by inbound bank callback
//! verification and outbound webhook delivery. Both sides sign the same
//! payload shape: `"{timestamp}.{raw_body}"`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const MAX_TIMESTAMP_SKEW_SECONDS: i64 = 300;

pub fn sign(secret: &[u8], timestamp: i64, body: &str) -> String {
    let payload = format!("{}.{}", timestamp, body);
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts a key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification via `Mac::verify_slice`; never short-circuits
/// on the first mismatched byte.
pub fn verify(secret: &[u8], timestamp: i64, body: &str, signature_hex: &str) -> bool {
    let Ok(expected_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let payload = format!("{}.{}", timestamp, body);
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts a key of any size");
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected_bytes).is_ok()
}

/// Rejects timestamps further than `MAX_TIMESTAMP_SKEW_SECONDS` from `now`,
/// in either direction, guarding against replay of old callbacks.
pub fn within_skew(timestamp: i64, now: i64) -> bool {
    (now - timestamp).abs() <= MAX_TIMESTAMP_SKEW_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let secret = b"shared-secret";
        let sig = sign(secret, 1_700_000_000, r#"{"ok":true}"#);
        assert!(verify(secret, 1_700_000_000, r#"{"ok":true}"#, &sig));
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let secret = b"shared-secret";
        let sig = sign(secret, 1_700_000_000, r#"{"ok":true}"#);
        assert!(!verify(secret, 1_700_000_000, r#"{"ok":false}"#, &sig));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let sig = sign(b"secret-a", 1_700_000_000, "body");
        assert!(!verify(b"secret-b", 1_700_000_000, "body", &sig));
    }

    #[test]
    fn skew_window_is_inclusive_both_directions() {
        assert!(within_skew(1000, 1000 + MAX_TIMESTAMP_SKEW_SECONDS));
        assert!(!within_skew(1000, 1000 + MAX_TIMESTAMP_SKEW_SECONDS + 1));
        assert!(within_skew(1000, 1000 - MAX_TIMESTAMP_SKEW_SECONDS));
    }
}
