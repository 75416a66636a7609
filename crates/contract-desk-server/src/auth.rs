// contract-desk-server/src/auth.rs
// ============================================================================
// Module: Bearer Authentication
// Description: Resolves bearer tokens to desk actors.
// Purpose: Fail-closed authentication for every API request.
// Dependencies: contract-desk-core, thiserror
// ============================================================================

//! ## Overview
//! Each API request carries `Authorization: Bearer <token>`. The token is
//! fingerprinted and looked up through the service; unknown, malformed, and
//! inactive-account tokens are all rejected the same way.

// ============================================================================
// SECTION: Imports
// ============================================================================

use contract_desk_core::Actor;
use contract_desk_core::ContractService;
use contract_desk_core::DeskStore;
use contract_desk_core::ServiceError;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest accepted `Authorization` header.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid authentication.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Token lookup failed.
    #[error("authentication lookup failed: {0}")]
    Lookup(ServiceError),
}

// ============================================================================
// SECTION: Authentication
// ============================================================================

/// Resolves the `Authorization` header to an active user's actor.
///
/// # Errors
///
/// Returns [`AuthError::Unauthenticated`] when the header is missing,
/// malformed, or names no active user.
pub fn authenticate<S: DeskStore>(
    service: &ContractService<S>,
    auth_header: Option<&str>,
) -> Result<Actor, AuthError> {
    let token = parse_bearer_token(auth_header)?;
    let user = service.authenticate(&token).map_err(AuthError::Lookup)?;
    user.map(|user| user.actor())
        .ok_or_else(|| AuthError::Unauthenticated("invalid bearer token".to_string()))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the token from a `Bearer` authorization header.
fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
