// contract-desk-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Desk Store
// Description: Durable DeskStore backend using SQLite WAL.
// Purpose: Persist users, templates, contracts, versions, and audit entries.
// Dependencies: contract-desk-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`DeskStore`] implementation. Records
//! are stored as JSON payloads with a SHA-256 digest next to the indexed
//! columns used for lookups and filters; loads verify the digest and fail
//! closed on mismatch.
//!
//! [`DeskStore`]: contract_desk_core::DeskStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::MAX_RECORD_BYTES;
pub use store::SqliteDeskStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
