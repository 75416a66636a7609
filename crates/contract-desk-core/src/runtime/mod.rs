// contract-desk-core/src/runtime/mod.rs
// ============================================================================
// Module: Contract Desk Runtime
// Description: Access policy, lifecycle decisions, stores, and the service.
// Purpose: Evaluate requests and execute them against a desk store.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The access policy and the lifecycle are pure decision functions. The
//! contract service composes them around store calls; every transport calls
//! into the same service so decisions stay identical across surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod access;
pub mod lifecycle;
pub mod service;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use access::AccessDecision;
pub use access::AccessReason;
pub use access::Capability;
pub use access::can_perform;
pub use access::capabilities;
pub use lifecycle::TransitionAudit;
pub use lifecycle::TransitionDirective;
pub use lifecycle::TransitionRejection;
pub use lifecycle::TransitionReport;
pub use lifecycle::allowed_targets;
pub use lifecycle::next_status;
pub use lifecycle::reachable_statuses;
pub use service::ContractService;
pub use service::ContractTransitions;
pub use service::IssuedUser;
pub use service::ServiceError;
pub use service::VersionComparison;
pub use store::InMemoryDeskStore;
pub use store::SharedDeskStore;
