use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

// =============================================================================
// Passwords
// =============================================================================

/// Hash a password with bcrypt at the configured cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

/// Check a password against a stored bcrypt hash
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(e) => {
            tracing::error!("Stored password hash could not be verified: {}", e);
            false
        }
    }
}

// =============================================================================
// Session & Share Tokens
// =============================================================================

/// Generate a fresh session token (64 hex characters, 244 random bits)
pub fn generate_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Generate a share token (32 hex characters)
pub fn generate_share_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Peppered hash of a session token, the only form that is stored
///
/// A leaked sessions table cannot be replayed without the server secret.
///
/// # Algorithm
/// `stored_key = SHA256(token + secret)` as hex
pub fn hash_token(token: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

// =============================================================================
// Signed Assertions
// =============================================================================

/// Verify HMAC-SHA256 signature
///
/// # Arguments
/// * `data` - The data that was signed
/// * `signature` - The hex-encoded HMAC signature
/// * `secret` - The shared secret key (from environment)
pub fn verify_hmac(data: &str, signature: &str, secret: &str) -> bool {
    // Create HMAC instance with secret key
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            tracing::error!("Failed to create HMAC instance");
            return false;
        }
    };

    mac.update(data.as_bytes());

    // Decode hex signature
    let sig_bytes = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::warn!("Invalid hex signature format");
            return false;
        }
    };

    // Constant-time comparison
    mac.verify_slice(&sig_bytes).is_ok()
}

/// Compare a presented secret with the configured one in constant time
///
/// Both sides go through HMAC keyed by the expected value, so lengths and
/// contents leak nothing through timing.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let Ok(mut expected_mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    expected_mac.update(expected.as_bytes());
    let expected_tag = expected_mac.finalize().into_bytes();

    let Ok(mut provided_mac) = HmacSha256::new_from_slice(expected.as_bytes()) else {
        return false;
    };
    provided_mac.update(provided.as_bytes());
    provided_mac.verify_slice(&expected_tag).is_ok()
}

/// Validate timestamp is within acceptable range
///
/// Prevents replay of old assertions by ensuring the request is recent.
///
/// # Arguments
/// * `timestamp` - Unix timestamp in seconds from the client
/// * `max_age_secs` - Maximum age allowed in seconds
pub fn validate_timestamp(timestamp: i64, max_age_secs: i64) -> bool {
    let now = chrono::Utc::now().timestamp();
    let age_seconds = now.abs_diff(timestamp);

    if age_seconds > max_age_secs.unsigned_abs() {
        tracing::warn!(
            "Timestamp too old: {} seconds (max: {})",
            age_seconds,
            max_age_secs
        );
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Password Tests
    // =========================================================================

    #[test]
    fn test_password_round_trip() {
        let hash = hash_password("hunter22", 4).unwrap();

        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn test_verify_password_malformed_hash() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    // =========================================================================
    // Token Tests
    // =========================================================================

    #[test]
    fn test_generate_token_format() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_generate_share_token_format() {
        let token = generate_share_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_token_depends_on_secret() {
        let token = "same-token";

        let a = hash_token(token, "secret-a");
        let b = hash_token(token, "secret-b");

        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(a, hash_token(token, "secret-a"));
    }

    // =========================================================================
    // HMAC Tests
    // =========================================================================

    #[test]
    fn test_verify_hmac_valid() {
        let secret = "test-secret-key";
        let data = "github:42:octocat::1733788800";

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(data.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(verify_hmac(data, &signature, secret));
    }

    #[test]
    fn test_verify_hmac_invalid_signature() {
        let wrong_signature = "0".repeat(64);
        assert!(!verify_hmac("test data", &wrong_signature, "test-secret-key"));
        assert!(!verify_hmac("test data", "not hex", "test-secret-key"));
    }

    #[test]
    fn test_verify_hmac_wrong_secret() {
        let data = "test data";
        let mut mac = HmacSha256::new_from_slice(b"test-secret-key").unwrap();
        mac.update(data.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        assert!(!verify_hmac(data, &signature, "wrong-secret"));
    }

    #[test]
    fn test_validate_timestamp() {
        let now = chrono::Utc::now().timestamp();
        assert!(validate_timestamp(now, 300));
        assert!(validate_timestamp(now - 100, 300));
        assert!(!validate_timestamp(now - 400, 300));
        assert!(!validate_timestamp(now + 400, 300));
    }

    #[test]
    fn test_validate_timestamp_extremes() {
        assert!(!validate_timestamp(i64::MIN, 300));
        assert!(!validate_timestamp(i64::MAX, 300));
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("admin-key", "admin-key"));
        assert!(!secrets_match("admin-ke", "admin-key"));
        assert!(!secrets_match("admin-key-longer", "admin-key"));
        assert!(!secrets_match("", "admin-key"));
    }
}
