//! HMAC-SHA256 signatures for callbacks from external services.
//!
//! The sender signs the raw request body with the shared secret and sends
//! `X-Signature: sha256=<hex>`. Verification is constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-signature";
const PREFIX: &str = "sha256=";

/// Signature header value for `body`.
///
/// ```
/// use magazine_ai::signature::{sign, verify};
///
/// let header = sign("secret", b"{\"ok\":true}");
/// assert!(header.starts_with("sha256="));
/// assert!(verify("secret", b"{\"ok\":true}", &header));
/// assert!(!verify("other", b"{\"ok\":true}", &header));
/// ```
pub fn sign(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("{PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Check a signature header against `body`. An empty secret never verifies.
pub fn verify(secret: &str, body: &[u8], header: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Some(hex_sig) = header.trim().strip_prefix(PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tampered_body_fails() {
        let header = sign("s3cret", b"{\"status\":\"completed\"}");
        assert!(!verify("s3cret", b"{\"status\":\"failed\"}", &header));
    }

    #[test]
    fn malformed_headers_fail() {
        let body = b"{}";
        let good = sign("s3cret", body);
        assert!(!verify("s3cret", body, ""));
        assert!(!verify("s3cret", body, good.trim_start_matches(PREFIX)));
        assert!(!verify("s3cret", body, "sha256=zz"));
        assert!(!verify("", body, &sign("", body)));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2
        let header = sign("Jefe", b"what do ya want for nothing?");
        assert_eq!(
            header,
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
