// contract-desk-core/src/interfaces/mod.rs
// ============================================================================
// Module: Contract Desk Interfaces
// Description: Backend-agnostic persistence interface for Contract Desk.
// Purpose: Define the store surface consulted by the contract service.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! [`DeskStore`] is the persistence collaborator. The service decides; the
//! store executes. Every mutating call carries the audit entry that records
//! it, and implementations must write the change and the entry atomically.
//!
//! Contract writes are optimistic: [`ContractWrite::expected_revision`] must
//! match the stored revision or the write fails with [`StoreError::Conflict`]
//! and nothing is persisted.
//!
//! Security posture: implementations consume untrusted data on load and must
//! fail closed on integrity errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AuditEntry;
use crate::core::AuditEntryDraft;
use crate::core::ContractDraft;
use crate::core::ContractId;
use crate::core::ContractRecord;
use crate::core::ContractStatus;
use crate::core::ContractVersion;
use crate::core::Page;
use crate::core::ResourceKind;
use crate::core::TemplateDraft;
use crate::core::TemplateId;
use crate::core::TemplateRecord;
use crate::core::TokenFingerprint;
use crate::core::UserDraft;
use crate::core::UserId;
use crate::core::UserRecord;
use crate::core::VersionDraft;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("desk store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("desk store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("desk store version mismatch: {0}")]
    VersionMismatch(String),
    /// Store data is invalid.
    #[error("desk store invalid data: {0}")]
    Invalid(String),
    /// Addressed record does not exist.
    #[error("desk store record not found: {0}")]
    NotFound(String),
    /// Write conflicts with stored state (stale revision, duplicate key).
    #[error("desk store conflict: {0}")]
    Conflict(String),
    /// Store reported an error.
    #[error("desk store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Filters
// ============================================================================

/// Template listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFilter {
    /// Only templates in this category.
    #[serde(default)]
    pub category: Option<String>,
    /// Only templates with this active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl TemplateFilter {
    /// Returns true when the record passes the filter.
    #[must_use]
    pub fn matches(&self, record: &TemplateRecord) -> bool {
        self.category.as_ref().is_none_or(|category| record.category.as_ref() == Some(category))
            && self.is_active.is_none_or(|active| record.is_active == active)
    }
}

/// Contract listing filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFilter {
    /// Only contracts owned by this user.
    #[serde(default)]
    pub owner_id: Option<UserId>,
    /// Only contracts in this status.
    #[serde(default)]
    pub status: Option<ContractStatus>,
}

impl ContractFilter {
    /// Returns true when the record passes the filter.
    #[must_use]
    pub fn matches(&self, record: &ContractRecord) -> bool {
        self.owner_id.is_none_or(|owner| record.owner_id == owner)
            && self.status.is_none_or(|status| record.status == status)
    }
}

/// Audit log listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFilter {
    /// Only entries by this user.
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Only entries with this action label.
    #[serde(default)]
    pub action: Option<String>,
    /// Only entries for this resource kind.
    #[serde(default)]
    pub resource_kind: Option<ResourceKind>,
    /// Only entries for this resource identifier.
    #[serde(default)]
    pub resource_id: Option<i64>,
}

impl AuditFilter {
    /// Filter selecting every entry for one contract.
    #[must_use]
    pub const fn for_contract(id: ContractId) -> Self {
        Self {
            user_id: None,
            action: None,
            resource_kind: Some(ResourceKind::Contract),
            resource_id: Some(id.get()),
        }
    }

    /// Returns true when the entry passes the filter.
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.user_id.is_none_or(|user| entry.user_id == user)
            && self.action.as_ref().is_none_or(|action| &entry.action == action)
            && self.resource_kind.is_none_or(|kind| entry.resource_kind == kind)
            && self.resource_id.is_none_or(|id| entry.resource_id == Some(id))
    }
}

// ============================================================================
// SECTION: Contract Writes
// ============================================================================

/// Atomic contract update executed by the store.
///
/// # Invariants
/// - `record.id` addresses an existing contract.
/// - Snapshots are numbered in order, continuing from the latest version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractWrite {
    /// Full replacement record.
    pub record: ContractRecord,
    /// Revision the caller observed before deciding on the write.
    pub expected_revision: u64,
    /// Version snapshots to append, in order.
    pub snapshots: Vec<VersionDraft>,
    /// Audit entry recording the write.
    pub audit: AuditEntryDraft,
}

// ============================================================================
// SECTION: Desk Store
// ============================================================================

/// Persistence interface for users, templates, contracts, versions, and audit.
///
/// Listings return users, templates, and contracts in ascending identifier
/// order; versions and audit entries newest first.
pub trait DeskStore {
    /// Inserts a user; `audit.resource_id` is set to the new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the email or token fingerprint is
    /// already in use.
    fn create_user(&self, draft: UserDraft, audit: AuditEntryDraft) -> Result<UserRecord, StoreError>;

    /// Loads a user by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError>;

    /// Loads a user by email.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Loads a user by API token fingerprint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn user_by_token(&self, fingerprint: &TokenFingerprint) -> Result<Option<UserRecord>, StoreError>;

    /// Replaces a stored user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown users and
    /// [`StoreError::Conflict`] for duplicate email or fingerprint.
    fn save_user(&self, record: &UserRecord, audit: AuditEntryDraft) -> Result<(), StoreError>;

    /// Deletes a user; returns false when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the user still owns contracts.
    fn delete_user(&self, id: UserId, audit: AuditEntryDraft) -> Result<bool, StoreError>;

    /// Lists users.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list_users(&self, page: Page) -> Result<Vec<UserRecord>, StoreError>;

    /// Counts stored users.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn count_users(&self) -> Result<u64, StoreError>;

    /// Inserts a template; `audit.resource_id` is set to the new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn create_template(
        &self,
        draft: TemplateDraft,
        audit: AuditEntryDraft,
    ) -> Result<TemplateRecord, StoreError>;

    /// Loads a template by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn template(&self, id: TemplateId) -> Result<Option<TemplateRecord>, StoreError>;

    /// Replaces a stored template.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown templates.
    fn save_template(&self, record: &TemplateRecord, audit: AuditEntryDraft) -> Result<(), StoreError>;

    /// Deletes a template; returns false when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn delete_template(&self, id: TemplateId, audit: AuditEntryDraft) -> Result<bool, StoreError>;

    /// Lists templates passing `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list_templates(
        &self,
        filter: &TemplateFilter,
        page: Page,
    ) -> Result<Vec<TemplateRecord>, StoreError>;

    /// Inserts a contract and records its creation state as version 1;
    /// `audit.resource_id` is set to the new identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when the contract number is in use.
    fn create_contract(
        &self,
        draft: ContractDraft,
        audit: AuditEntryDraft,
    ) -> Result<ContractRecord, StoreError>;

    /// Loads a contract by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn contract(&self, id: ContractId) -> Result<Option<ContractRecord>, StoreError>;

    /// Lists contracts passing `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list_contracts(
        &self,
        filter: &ContractFilter,
        page: Page,
    ) -> Result<Vec<ContractRecord>, StoreError>;

    /// Executes a contract write: revision compare-and-set, record
    /// replacement, snapshots, and audit entry, all or nothing. The stored
    /// record carries `expected_revision + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown contracts and
    /// [`StoreError::Conflict`] when the stored revision differs from
    /// `expected_revision`.
    fn apply_contract_write(&self, write: ContractWrite) -> Result<ContractRecord, StoreError>;

    /// Deletes a contract and its versions; returns false when absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn delete_contract(&self, id: ContractId, audit: AuditEntryDraft) -> Result<bool, StoreError>;

    /// Lists versions of a contract, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list_versions(&self, id: ContractId, page: Page) -> Result<Vec<ContractVersion>, StoreError>;

    /// Loads one version of a contract.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn version(&self, id: ContractId, number: u32) -> Result<Option<ContractVersion>, StoreError>;

    /// Appends a standalone audit entry.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when saving fails.
    fn append_audit(&self, draft: AuditEntryDraft) -> Result<AuditEntry, StoreError>;

    /// Lists audit entries passing `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when loading fails.
    fn list_audit(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditEntry>, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
