//! Branch generation (spec §4.B).

use rand::Rng;
use sha2::{Digest, Sha256};

use sip_types::via::MAGIC_COOKIE;

/// `z9hG4bK` + 32 hex chars of cryptographic randomness (spec §4.B).
pub fn generate_branch() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", MAGIC_COOKIE, hex)
}

/// A deterministic branch derived from SHA-256 of
/// `METHOD|request-URI|from-tag|to-tag|call-id`, for loop detection
/// (RFC 3261 §16.6).
pub fn deterministic_branch(method: &str, request_uri: &str, from_tag: &str, to_tag: &str, call_id: &str) -> String {
    let input = format!("{}|{}|{}|{}|{}", method, request_uri, from_tag, to_tag, call_id);
    let digest = Sha256::digest(input.as_bytes());
    let hex: String = digest.iter().take(16).map(|b| format!("{:02x}", b)).collect();
    format!("{}{}", MAGIC_COOKIE, hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_branches_are_compliant_and_unique() {
        let a = generate_branch();
        let b = generate_branch();
        assert!(a.starts_with(MAGIC_COOKIE));
        assert_ne!(a, b);
    }

    #[test]
    fn deterministic_branch_is_stable() {
        let a = deterministic_branch("INVITE", "sip:bob@biloxi.com", "t1", "t2", "call-1");
        let b = deterministic_branch("INVITE", "sip:bob@biloxi.com", "t1", "t2", "call-1");
        assert_eq!(a, b);
        assert!(a.starts_with(MAGIC_COOKIE));
    }
}
