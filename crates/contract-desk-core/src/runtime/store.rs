// contract-desk-core/src/runtime/store.rs
// ============================================================================
// Module: Contract Desk In-Memory Store
// Description: In-memory desk store and shared store wrapper.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`InMemoryDeskStore`] keeps every table behind one mutex, so each call is
//! trivially atomic. It backs tests and the `memory` store type; data is lost
//! on restart. [`SharedDeskStore`] wraps any store behind an `Arc` trait
//! object for the server.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::AuditEntry;
use crate::core::AuditEntryDraft;
use crate::core::ContractDraft;
use crate::core::ContractId;
use crate::core::ContractRecord;
use crate::core::ContractVersion;
use crate::core::Page;
use crate::core::TemplateDraft;
use crate::core::TemplateId;
use crate::core::TemplateRecord;
use crate::core::Timestamp;
use crate::core::TokenFingerprint;
use crate::core::UserDraft;
use crate::core::UserId;
use crate::core::UserRecord;
use crate::core::VersionDraft;
use crate::interfaces::AuditFilter;
use crate::interfaces::ContractFilter;
use crate::interfaces::ContractWrite;
use crate::interfaces::DeskStore;
use crate::interfaces::StoreError;
use crate::interfaces::TemplateFilter;

// ============================================================================
// SECTION: State
// ============================================================================

/// Summary recorded on the first snapshot of every contract.
pub const INITIAL_VERSION_SUMMARY: &str = "Initial version";

/// Tables held by the in-memory store.
#[derive(Debug, Default)]
struct DeskState {
    /// Users by identifier.
    users: BTreeMap<UserId, UserRecord>,
    /// Templates by identifier.
    templates: BTreeMap<TemplateId, TemplateRecord>,
    /// Contracts by identifier.
    contracts: BTreeMap<ContractId, ContractRecord>,
    /// Versions keyed by contract and version number.
    versions: BTreeMap<(ContractId, u32), ContractVersion>,
    /// Audit entries in insertion order.
    audit: Vec<AuditEntry>,
    /// Last assigned user identifier.
    last_user_id: i64,
    /// Last assigned template identifier.
    last_template_id: i64,
    /// Last assigned contract identifier.
    last_contract_id: i64,
}

impl DeskState {
    /// Appends an audit entry.
    fn push_audit(&mut self, draft: AuditEntryDraft, now: Timestamp) -> AuditEntry {
        let id = i64::try_from(self.audit.len()).unwrap_or(i64::MAX).saturating_add(1);
        let entry = draft.into_entry(id, now);
        self.audit.push(entry.clone());
        entry
    }

    /// Returns the latest version number of a contract (0 when none).
    fn latest_version(&self, id: ContractId) -> u32 {
        self.versions.range((id, 0) ..= (id, u32::MAX)).next_back().map_or(0, |(key, _)| key.1)
    }

    /// Appends a snapshot with the next version number.
    fn push_version(
        &mut self,
        id: ContractId,
        draft: VersionDraft,
        now: Timestamp,
    ) -> Result<(), StoreError> {
        let number = self
            .latest_version(id)
            .checked_add(1)
            .ok_or_else(|| StoreError::Invalid("version number overflow".to_string()))?;
        let version = ContractVersion {
            contract_id: id,
            version_number: number,
            status: draft.status,
            fields: draft.fields,
            changed_by: draft.changed_by,
            change_summary: draft.change_summary,
            changes: draft.changes,
            created_at: now,
        };
        self.versions.insert((id, number), version);
        Ok(())
    }

    /// Rejects a user whose email or fingerprint collides with another user.
    fn check_user_unique(
        &self,
        id: Option<UserId>,
        email: &str,
        fingerprint: &TokenFingerprint,
    ) -> Result<(), StoreError> {
        for user in self.users.values() {
            if Some(user.id) == id {
                continue;
            }
            if user.email.eq_ignore_ascii_case(email) {
                return Err(StoreError::Conflict(format!("email already registered: {email}")));
            }
            if &user.token_fingerprint == fingerprint {
                return Err(StoreError::Conflict("api token fingerprint collision".to_string()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory desk store for tests and ephemeral deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDeskStore {
    /// All tables protected by a single mutex.
    state: Arc<Mutex<DeskState>>,
}

impl InMemoryDeskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the store state.
    fn lock(&self) -> Result<MutexGuard<'_, DeskState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Store("desk store mutex poisoned".to_string()))
    }
}

impl DeskStore for InMemoryDeskStore {
    fn create_user(
        &self,
        draft: UserDraft,
        mut audit: AuditEntryDraft,
    ) -> Result<UserRecord, StoreError> {
        let mut state = self.lock()?;
        state.check_user_unique(None, &draft.email, &draft.token_fingerprint)?;
        state.last_user_id += 1;
        let now = Timestamp::now();
        let record = UserRecord {
            id: UserId::new(state.last_user_id),
            email: draft.email,
            full_name: draft.full_name,
            role: draft.role,
            is_active: draft.is_active,
            token_fingerprint: draft.token_fingerprint,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(record.id, record.clone());
        audit.resource_id = Some(record.id.get());
        state.push_audit(audit, now);
        Ok(record)
    }

    fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state.users.values().find(|user| user.email.eq_ignore_ascii_case(email)).cloned())
    }

    fn user_by_token(
        &self,
        fingerprint: &TokenFingerprint,
    ) -> Result<Option<UserRecord>, StoreError> {
        let state = self.lock()?;
        Ok(state.users.values().find(|user| &user.token_fingerprint == fingerprint).cloned())
    }

    fn save_user(&self, record: &UserRecord, audit: AuditEntryDraft) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&record.id) {
            return Err(StoreError::NotFound(format!("user {}", record.id)));
        }
        state.check_user_unique(Some(record.id), &record.email, &record.token_fingerprint)?;
        state.users.insert(record.id, record.clone());
        state.push_audit(audit, Timestamp::now());
        Ok(())
    }

    fn delete_user(&self, id: UserId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if !state.users.contains_key(&id) {
            return Ok(false);
        }
        if state.contracts.values().any(|contract| contract.owner_id == id) {
            return Err(StoreError::Conflict(format!("user {id} still owns contracts")));
        }
        state.users.remove(&id);
        state.push_audit(audit, Timestamp::now());
        Ok(true)
    }

    fn list_users(&self, page: Page) -> Result<Vec<UserRecord>, StoreError> {
        Ok(page.apply(self.lock()?.users.values().cloned()).collect())
    }

    fn count_users(&self) -> Result<u64, StoreError> {
        Ok(u64::try_from(self.lock()?.users.len()).unwrap_or(u64::MAX))
    }

    fn create_template(
        &self,
        draft: TemplateDraft,
        mut audit: AuditEntryDraft,
    ) -> Result<TemplateRecord, StoreError> {
        let mut state = self.lock()?;
        state.last_template_id += 1;
        let now = Timestamp::now();
        let record = TemplateRecord {
            id: TemplateId::new(state.last_template_id),
            name: draft.name,
            description: draft.description,
            content: draft.content,
            category: draft.category,
            is_active: draft.is_active,
            created_by: draft.created_by,
            created_at: now,
            updated_at: now,
        };
        state.templates.insert(record.id, record.clone());
        audit.resource_id = Some(record.id.get());
        state.push_audit(audit, now);
        Ok(record)
    }

    fn template(&self, id: TemplateId) -> Result<Option<TemplateRecord>, StoreError> {
        Ok(self.lock()?.templates.get(&id).cloned())
    }

    fn save_template(
        &self,
        record: &TemplateRecord,
        audit: AuditEntryDraft,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if !state.templates.contains_key(&record.id) {
            return Err(StoreError::NotFound(format!("template {}", record.id)));
        }
        state.templates.insert(record.id, record.clone());
        state.push_audit(audit, Timestamp::now());
        Ok(())
    }

    fn delete_template(&self, id: TemplateId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if state.templates.remove(&id).is_none() {
            return Ok(false);
        }
        state.push_audit(audit, Timestamp::now());
        Ok(true)
    }

    fn list_templates(
        &self,
        filter: &TemplateFilter,
        page: Page,
    ) -> Result<Vec<TemplateRecord>, StoreError> {
        let state = self.lock()?;
        Ok(page.apply(state.templates.values().filter(|t| filter.matches(t)).cloned()).collect())
    }

    fn create_contract(
        &self,
        draft: ContractDraft,
        mut audit: AuditEntryDraft,
    ) -> Result<ContractRecord, StoreError> {
        let mut state = self.lock()?;
        if state.contracts.values().any(|c| c.contract_number == draft.contract_number) {
            return Err(StoreError::Conflict(format!(
                "contract number already in use: {}",
                draft.contract_number
            )));
        }
        state.last_contract_id += 1;
        let now = Timestamp::now();
        let record = ContractRecord {
            id: ContractId::new(state.last_contract_id),
            contract_number: draft.contract_number,
            status: draft.status,
            owner_id: draft.owner_id,
            fields: draft.fields,
            revision: 1,
            created_at: now,
            updated_at: now,
        };
        state.contracts.insert(record.id, record.clone());
        let snapshot = VersionDraft::of(&record, record.owner_id, INITIAL_VERSION_SUMMARY);
        state.push_version(record.id, snapshot, now)?;
        audit.resource_id = Some(record.id.get());
        state.push_audit(audit, now);
        Ok(record)
    }

    fn contract(&self, id: ContractId) -> Result<Option<ContractRecord>, StoreError> {
        Ok(self.lock()?.contracts.get(&id).cloned())
    }

    fn list_contracts(
        &self,
        filter: &ContractFilter,
        page: Page,
    ) -> Result<Vec<ContractRecord>, StoreError> {
        let state = self.lock()?;
        Ok(page.apply(state.contracts.values().filter(|c| filter.matches(c)).cloned()).collect())
    }

    fn apply_contract_write(&self, write: ContractWrite) -> Result<ContractRecord, StoreError> {
        let mut state = self.lock()?;
        let mut record = write.record;
        let id = record.id;
        let stored = state
            .contracts
            .get(&id)
            .ok_or_else(|| StoreError::NotFound(format!("contract {id}")))?;
        if stored.revision != write.expected_revision {
            return Err(StoreError::Conflict(format!(
                "contract {id} changed concurrently: revision is {}, expected {}",
                stored.revision, write.expected_revision
            )));
        }
        record.revision = stored
            .revision
            .checked_add(1)
            .ok_or_else(|| StoreError::Invalid("revision overflow".to_string()))?;
        let now = Timestamp::now();
        let start = state.latest_version(id);
        if start.checked_add(u32::try_from(write.snapshots.len()).unwrap_or(u32::MAX)).is_none() {
            return Err(StoreError::Invalid("version number overflow".to_string()));
        }
        for snapshot in write.snapshots {
            state.push_version(id, snapshot, now)?;
        }
        state.contracts.insert(id, record.clone());
        state.push_audit(write.audit, now);
        Ok(record)
    }

    fn delete_contract(&self, id: ContractId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if state.contracts.remove(&id).is_none() {
            return Ok(false);
        }
        state.versions.retain(|(contract_id, _), _| *contract_id != id);
        state.push_audit(audit, Timestamp::now());
        Ok(true)
    }

    fn list_versions(
        &self,
        id: ContractId,
        page: Page,
    ) -> Result<Vec<ContractVersion>, StoreError> {
        let state = self.lock()?;
        let versions = state.versions.range((id, 0) ..= (id, u32::MAX)).rev().map(|(_, v)| v.clone());
        Ok(page.apply(versions).collect())
    }

    fn version(&self, id: ContractId, number: u32) -> Result<Option<ContractVersion>, StoreError> {
        Ok(self.lock()?.versions.get(&(id, number)).cloned())
    }

    fn append_audit(&self, draft: AuditEntryDraft) -> Result<AuditEntry, StoreError> {
        Ok(self.lock()?.push_audit(draft, Timestamp::now()))
    }

    fn list_audit(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditEntry>, StoreError> {
        let state = self.lock()?;
        let entries = state.audit.iter().rev().filter(|entry| filter.matches(entry)).cloned();
        Ok(page.apply(entries).collect())
    }
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared desk store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedDeskStore {
    /// Inner store implementation.
    inner: Arc<dyn DeskStore + Send + Sync>,
}

impl SharedDeskStore {
    /// Wraps a desk store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl DeskStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// Wraps an existing shared store.
    #[must_use]
    pub const fn new(store: Arc<dyn DeskStore + Send + Sync>) -> Self {
        Self {
            inner: store,
        }
    }
}

impl DeskStore for SharedDeskStore {
    fn create_user(&self, draft: UserDraft, audit: AuditEntryDraft) -> Result<UserRecord, StoreError> {
        self.inner.create_user(draft, audit)
    }

    fn user(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        self.inner.user(id)
    }

    fn user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.inner.user_by_email(email)
    }

    fn user_by_token(
        &self,
        fingerprint: &TokenFingerprint,
    ) -> Result<Option<UserRecord>, StoreError> {
        self.inner.user_by_token(fingerprint)
    }

    fn save_user(&self, record: &UserRecord, audit: AuditEntryDraft) -> Result<(), StoreError> {
        self.inner.save_user(record, audit)
    }

    fn delete_user(&self, id: UserId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        self.inner.delete_user(id, audit)
    }

    fn list_users(&self, page: Page) -> Result<Vec<UserRecord>, StoreError> {
        self.inner.list_users(page)
    }

    fn count_users(&self) -> Result<u64, StoreError> {
        self.inner.count_users()
    }

    fn create_template(
        &self,
        draft: TemplateDraft,
        audit: AuditEntryDraft,
    ) -> Result<TemplateRecord, StoreError> {
        self.inner.create_template(draft, audit)
    }

    fn template(&self, id: TemplateId) -> Result<Option<TemplateRecord>, StoreError> {
        self.inner.template(id)
    }

    fn save_template(
        &self,
        record: &TemplateRecord,
        audit: AuditEntryDraft,
    ) -> Result<(), StoreError> {
        self.inner.save_template(record, audit)
    }

    fn delete_template(&self, id: TemplateId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        self.inner.delete_template(id, audit)
    }

    fn list_templates(
        &self,
        filter: &TemplateFilter,
        page: Page,
    ) -> Result<Vec<TemplateRecord>, StoreError> {
        self.inner.list_templates(filter, page)
    }

    fn create_contract(
        &self,
        draft: ContractDraft,
        audit: AuditEntryDraft,
    ) -> Result<ContractRecord, StoreError> {
        self.inner.create_contract(draft, audit)
    }

    fn contract(&self, id: ContractId) -> Result<Option<ContractRecord>, StoreError> {
        self.inner.contract(id)
    }

    fn list_contracts(
        &self,
        filter: &ContractFilter,
        page: Page,
    ) -> Result<Vec<ContractRecord>, StoreError> {
        self.inner.list_contracts(filter, page)
    }

    fn apply_contract_write(&self, write: ContractWrite) -> Result<ContractRecord, StoreError> {
        self.inner.apply_contract_write(write)
    }

    fn delete_contract(&self, id: ContractId, audit: AuditEntryDraft) -> Result<bool, StoreError> {
        self.inner.delete_contract(id, audit)
    }

    fn list_versions(
        &self,
        id: ContractId,
        page: Page,
    ) -> Result<Vec<ContractVersion>, StoreError> {
        self.inner.list_versions(id, page)
    }

    fn version(&self, id: ContractId, number: u32) -> Result<Option<ContractVersion>, StoreError> {
        self.inner.version(id, number)
    }

    fn append_audit(&self, draft: AuditEntryDraft) -> Result<AuditEntry, StoreError> {
        self.inner.append_audit(draft)
    }

    fn list_audit(&self, filter: &AuditFilter, page: Page) -> Result<Vec<AuditEntry>, StoreError> {
        self.inner.list_audit(filter, page)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.inner.readiness()
    }
}
