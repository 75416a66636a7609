// contract-desk-core/src/core/mod.rs
// ============================================================================
// Module: Contract Desk Core Types
// Description: Canonical identifiers, actors, statuses, and record structures.
// Purpose: Provide stable, serializable types shared by every Contract Desk crate.
// Dependencies: base64, rand, serde, sha2, thiserror, time
// ============================================================================

//! ## Overview
//! Core types define users, templates, contracts, version snapshots, and audit
//! entries, plus the transient evaluation inputs (actor and resource reference)
//! consumed by the access policy. These types are the source of truth for the
//! JSON shapes served by the HTTP layer.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod actor;
pub mod clock;
pub mod hashing;
pub mod identifiers;
pub mod records;
pub mod status;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use actor::Action;
pub use actor::Actor;
pub use actor::ResourceKind;
pub use actor::ResourceRef;
pub use actor::Role;
pub use actor::UnknownLabel;
pub use clock::Timestamp;
pub use hashing::TokenFingerprint;
pub use hashing::generate_api_token;
pub use hashing::generate_contract_number;
pub use hashing::sha256_hex;
pub use identifiers::ContractId;
pub use identifiers::TemplateId;
pub use identifiers::UserId;
pub use records::AuditEntry;
pub use records::AuditEntryDraft;
pub use records::ContractDraft;
pub use records::ContractFields;
pub use records::ContractPatch;
pub use records::ContractRecord;
pub use records::ContractVersion;
pub use records::FieldChange;
pub use records::NewContract;
pub use records::NewTemplate;
pub use records::NewUser;
pub use records::Page;
pub use records::RequestContext;
pub use records::TemplateDraft;
pub use records::TemplatePatch;
pub use records::TemplateRecord;
pub use records::UserDraft;
pub use records::UserPatch;
pub use records::UserRecord;
pub use records::VersionDraft;
pub use status::ContractStatus;
