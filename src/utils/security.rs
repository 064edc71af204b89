//! Security Utilities
//!
//! Password hashing, webhook signatures, upload file names and response headers.

use bcrypt::{hash, verify, DEFAULT_COST};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Default bcrypt cost for password hashing
pub const DEFAULT_BCRYPT_COST: u32 = DEFAULT_COST;

/// Prefix used in the `X-Import-Signature` header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Hash a password with custom bcrypt cost
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

/// Create a secure hash of sensitive data for storage
pub fn hash_sensitive_data(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Signs a payload with HMAC-SHA256, returning `sha256=<hex>`
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a `sha256=<hex>` signature header against the payload
pub fn verify_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    let Some(provided) = signature.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(provided) = hex::decode(provided) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&provided).is_ok()
}

/// Reduces an uploaded file name to a safe single path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.chars().take(120).collect()
    }
}

/// Security headers for HTTP responses
pub struct SecurityHeaders;

impl SecurityHeaders {
    /// Standard security headers (lowercase names)
    pub fn standard() -> Vec<(&'static str, &'static str)> {
        vec![
            ("x-content-type-options", "nosniff"),
            ("x-frame-options", "DENY"),
            ("referrer-policy", "strict-origin-when-cross-origin"),
            (
                "strict-transport-security",
                "max-age=31536000; includeSubDomains",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let password = "Coach2024";
        let hash = hash_password_with_cost(password, 4).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_hash_sensitive_data() {
        let hash1 = hash_sensitive_data("refresh-token");
        let hash2 = hash_sensitive_data("refresh-token");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"job_id":"abc","status":"completed"}"#;
        let signature = sign_payload("shared-secret", body);

        assert!(signature.starts_with("sha256="));
        assert!(verify_signature("shared-secret", body, &signature));
    }

    #[test]
    fn test_signature_rejects_tampering() {
        let body = br#"{"job_id":"abc"}"#;
        let signature = sign_payload("shared-secret", body);

        assert!(!verify_signature("other-secret", body, &signature));
        assert!(!verify_signature("shared-secret", br#"{"job_id":"abd"}"#, &signature));
        assert!(!verify_signature("shared-secret", body, "sha256=not-hex"));
        assert!(!verify_signature(
            "shared-secret",
            body,
            signature.trim_start_matches("sha256=")
        ));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("results.png"), "results.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\scans\\Meet Sheet.JPG"), "Meet_Sheet.JPG");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[test]
    fn test_security_headers() {
        let headers = SecurityHeaders::standard();
        assert!(headers.iter().any(|(name, _)| *name == "x-frame-options"));
    }
}
