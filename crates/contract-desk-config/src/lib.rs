// contract-desk-config/src/lib.rs
// ============================================================================
// Module: Contract Desk Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for contract-desk.toml semantics.
// Dependencies: contract-desk-core, contract-desk-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `contract-desk-config` defines the configuration model for the Contract
//! Desk server. Loading is strict and fail-closed: oversized files, unknown
//! store settings, and exposed binds without credentials are rejected.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
