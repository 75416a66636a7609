// contract-desk-server/src/lib.rs
// ============================================================================
// Module: Contract Desk Server
// Description: REST transport for the contract desk service.
// Purpose: Expose access-checked contract operations over HTTP.
// Dependencies: contract-desk-core, contract-desk-config, axum, tokio
// ============================================================================

//! ## Overview
//! The server maps `/api/v1` routes onto [`contract_desk_core::ContractService`].
//! Every API request is authenticated with a bearer token, resolved to an
//! actor, and logged as a JSON-lines audit event. Handlers hold no policy of
//! their own; denials come back from the service as structured errors.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod error;
mod routes;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AccessDeniedEvent;
pub use audit::DeskAuditSink;
pub use audit::DeskFileAuditSink;
pub use audit::DeskNoopAuditSink;
pub use audit::DeskStderrAuditSink;
pub use audit::HttpRequestEvent;
pub use audit::SecurityAuditEvent;
pub use auth::AuthError;
pub use error::ApiError;
pub use server::DeskServer;
pub use server::ServerError;
