// contract-desk-core/src/core/hashing.rs
// ============================================================================
// Module: Contract Desk Hashing
// Description: API token generation, token fingerprints, and content hashes.
// Purpose: Keep bearer secrets out of storage and logs.
// Dependencies: base64, rand, serde, sha2
// ============================================================================

//! ## Overview
//! API tokens are random 32-byte secrets handed to a user exactly once. Only
//! their SHA-256 fingerprint is persisted and compared, so a leaked store or
//! audit log never reveals a usable credential.
//!
//! Security posture: token material is untrusted input; fingerprints are
//! compared as lowercase hex strings.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix applied to every issued API token.
pub const API_TOKEN_PREFIX: &str = "cd_";

/// Number of random bytes in an API token.
const API_TOKEN_BYTES: usize = 32;

/// Prefix applied to generated contract numbers.
pub const CONTRACT_NUMBER_PREFIX: &str = "CT-";

// ============================================================================
// SECTION: Token Fingerprints
// ============================================================================

/// SHA-256 fingerprint of a bearer token, lowercase hex.
///
/// # Invariants
/// - Always 64 lowercase hex characters when built through [`TokenFingerprint::of`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenFingerprint(String);

impl TokenFingerprint {
    /// Computes the fingerprint of a raw token.
    #[must_use]
    pub fn of(token: &str) -> Self {
        Self(sha256_hex(token.as_bytes()))
    }

    /// Wraps a fingerprint previously produced by [`TokenFingerprint::of`].
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the hex fingerprint.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TokenFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.0.get(.. 12).unwrap_or(&self.0);
        write!(f, "TokenFingerprint({short}…)")
    }
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Generates a fresh API token from the OS random source.
#[must_use]
pub fn generate_api_token() -> String {
    let mut bytes = [0u8; API_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{API_TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes))
}

/// Generates a contract number of the form `CT-XXXXXXXX` (uppercase hex).
#[must_use]
pub fn generate_contract_number() -> String {
    let mut bytes = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    format!("{CONTRACT_NUMBER_PREFIX}{}", hex_encode(&bytes).to_ascii_uppercase())
}

// ============================================================================
// SECTION: Content Hashes
// ============================================================================

/// Returns the lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Encodes bytes as a lowercase hex string.
fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::use_debug, reason = "Test-only assertions.")]

    use super::*;

    #[test]
    fn fingerprint_is_stable_hex() {
        let fingerprint = TokenFingerprint::of("cd_secret");
        assert_eq!(fingerprint.as_str().len(), 64);
        assert_eq!(fingerprint, TokenFingerprint::of("cd_secret"));
        assert_ne!(fingerprint, TokenFingerprint::of("cd_other"));
        assert!(fingerprint.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn debug_does_not_print_full_fingerprint() {
        let fingerprint = TokenFingerprint::of("cd_secret");
        let rendered = format!("{fingerprint:?}");
        assert!(!rendered.contains(fingerprint.as_str()));
    }

    #[test]
    fn generated_tokens_are_prefixed_and_unique() {
        let first = generate_api_token();
        let second = generate_api_token();
        assert!(first.starts_with(API_TOKEN_PREFIX));
        assert_eq!(first.len(), API_TOKEN_PREFIX.len() + 43);
        assert_ne!(first, second);
    }

    #[test]
    fn contract_numbers_use_uppercase_hex() {
        let number = generate_contract_number();
        let suffix = number.strip_prefix(CONTRACT_NUMBER_PREFIX).unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || ('A' ..= 'F').contains(&c)));
    }

    #[test]
    fn sha256_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
