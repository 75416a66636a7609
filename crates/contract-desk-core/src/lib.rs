// contract-desk-core/src/lib.rs
// ============================================================================
// Module: Contract Desk Core Library
// Description: Public API surface for the Contract Desk core.
// Purpose: Expose core types, store interfaces, and decision/runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Contract Desk core provides the role-based access policy and the contract
//! status lifecycle for a contract management backend. Both decisions are
//! pure functions over explicit inputs; persistence is reached only through
//! the [`DeskStore`] interface, and the [`ContractService`] composes the two
//! around store calls with an explicit [`Actor`] on every call.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AuditFilter;
pub use interfaces::ContractFilter;
pub use interfaces::ContractWrite;
pub use interfaces::DeskStore;
pub use interfaces::StoreError;
pub use interfaces::TemplateFilter;
pub use runtime::AccessDecision;
pub use runtime::AccessReason;
pub use runtime::Capability;
pub use runtime::ContractService;
pub use runtime::ContractTransitions;
pub use runtime::InMemoryDeskStore;
pub use runtime::IssuedUser;
pub use runtime::ServiceError;
pub use runtime::SharedDeskStore;
pub use runtime::TransitionDirective;
pub use runtime::TransitionRejection;
pub use runtime::TransitionReport;
pub use runtime::VersionComparison;
pub use runtime::allowed_targets;
pub use runtime::can_perform;
pub use runtime::capabilities;
pub use runtime::next_status;
pub use runtime::reachable_statuses;
