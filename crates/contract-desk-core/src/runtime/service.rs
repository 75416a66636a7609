// contract-desk-core/src/runtime/service.rs
// ============================================================================
// Module: Contract Service
// Description: Access-checked, audited operations over the desk store.
// Purpose: Compose the access policy and lifecycle around store calls.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! [`ContractService`] is the single entry point for transports. Every call
//! takes an explicit [`Actor`]; there is no ambient session. Each operation
//! follows the same shape:
//!
//! 1. load the addressed record (missing records fail with `NotFound`)
//! 2. evaluate [`can_perform`] with the record's owner
//! 3. validate input and, for status changes, evaluate [`next_status`]
//! 4. hand the store one write carrying its snapshots and audit entry
//!
//! Denials and rejections are returned as structured values; nothing is
//! retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::Action;
use crate::core::Actor;
use crate::core::AuditEntry;
use crate::core::AuditEntryDraft;
use crate::core::ContractDraft;
use crate::core::ContractId;
use crate::core::ContractPatch;
use crate::core::ContractRecord;
use crate::core::ContractStatus;
use crate::core::ContractVersion;
use crate::core::FieldChange;
use crate::core::NewContract;
use crate::core::NewTemplate;
use crate::core::NewUser;
use crate::core::Page;
use crate::core::RequestContext;
use crate::core::ResourceKind;
use crate::core::ResourceRef;
use crate::core::Role;
use crate::core::TemplateDraft;
use crate::core::TemplateId;
use crate::core::TemplatePatch;
use crate::core::TemplateRecord;
use crate::core::Timestamp;
use crate::core::TokenFingerprint;
use crate::core::UserDraft;
use crate::core::UserId;
use crate::core::UserPatch;
use crate::core::UserRecord;
use crate::core::VersionDraft;
use crate::core::generate_api_token;
use crate::core::generate_contract_number;
use crate::core::records::MAX_SHORT_TEXT;
use crate::interfaces::AuditFilter;
use crate::interfaces::ContractFilter;
use crate::interfaces::ContractWrite;
use crate::interfaces::DeskStore;
use crate::interfaces::StoreError;
use crate::interfaces::TemplateFilter;
use crate::runtime::access::AccessDecision;
use crate::runtime::access::AccessReason;
use crate::runtime::access::can_perform;
use crate::runtime::lifecycle::TransitionRejection;
use crate::runtime::lifecycle::next_status;
use crate::runtime::lifecycle::reachable_statuses;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default upper bound for page sizes.
pub const DEFAULT_MAX_PAGE_LIMIT: u64 = 1_000;

/// Audit action label for creations.
pub const ACTION_CREATE: &str = "create";
/// Audit action label for updates.
pub const ACTION_UPDATE: &str = "update";
/// Audit action label for deletions.
pub const ACTION_DELETE: &str = "delete";
/// Audit action label for version restores.
pub const ACTION_RESTORE: &str = "restore";
/// Audit action label for API token rotation.
pub const ACTION_TOKEN_ROTATE: &str = "token_rotate";

/// Record fields excluded from user change payloads.
const USER_DIFF_EXCLUDED: [&str; 2] = ["token_fingerprint", "updated_at"];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Contract service errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Access policy denied the request.
    #[error("permission denied: {}", .0.reason)]
    PermissionDenied(AccessDecision),
    /// Lifecycle rejected a status change.
    #[error("transition rejected: {}", .0.as_str())]
    Transition(TransitionRejection),
    /// Addressed record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Write conflicts with stored state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Request input failed validation.
    #[error("invalid request: {0}")]
    Invalid(String),
    /// Store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl ServiceError {
    /// Returns a stable label for logs and error bodies.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::Transition(rejection) => rejection.as_str(),
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Invalid(_) => "invalid_request",
            Self::Store(_) => "store_error",
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(message) => Self::NotFound(message),
            StoreError::Conflict(message) => Self::Conflict(message),
            other => Self::Store(other),
        }
    }
}

impl From<TransitionRejection> for ServiceError {
    fn from(rejection: TransitionRejection) -> Self {
        Self::Transition(rejection)
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// User record paired with a freshly issued API token.
///
/// The token is shown once; only its fingerprint is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedUser {
    /// Stored user.
    pub user: UserRecord,
    /// Plaintext API token.
    pub api_token: String,
}

/// Contract paired with the statuses an actor may move it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractTransitions {
    /// Loaded contract.
    pub contract: ContractRecord,
    /// Reachable statuses, in table order.
    pub allowed: Vec<ContractStatus>,
}

/// Field differences between two versions of a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionComparison {
    /// Contract identifier.
    pub contract_id: ContractId,
    /// Base version number.
    pub from_version: u32,
    /// Compared version number.
    pub to_version: u32,
    /// Changed fields, in field-name order.
    pub differences: Vec<FieldChange>,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// Access-checked contract desk operations.
#[derive(Debug, Clone)]
pub struct ContractService<S> {
    /// Persistence collaborator.
    store: S,
    /// Upper bound applied to every page.
    max_page_limit: u64,
    /// Client details copied into every audit entry.
    context: RequestContext,
}

impl<S: DeskStore> ContractService<S> {
    /// Creates a service over `store` with the default page cap.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self {
            store,
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
            context: RequestContext {
                ip_address: None,
                user_agent: None,
            },
        }
    }

    /// Returns a service over the same store that records `context` in the
    /// audit entries it writes.
    #[must_use]
    pub fn with_context(&self, context: RequestContext) -> Self
    where
        S: Clone,
    {
        Self {
            store: self.store.clone(),
            max_page_limit: self.max_page_limit,
            context,
        }
    }

    /// Sets the page size cap.
    #[must_use]
    pub const fn with_max_page_limit(mut self, max_page_limit: u64) -> Self {
        self.max_page_limit = max_page_limit;
        self
    }

    /// Returns the underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Caps a caller-supplied page.
    const fn page(&self, page: Page) -> Page {
        page.clamped(self.max_page_limit)
    }

    /// Starts an audit entry tagged with the request context.
    fn audit_entry(
        &self,
        user_id: UserId,
        action: &str,
        resource_kind: ResourceKind,
        resource_id: Option<i64>,
        description: impl Into<String>,
    ) -> AuditEntryDraft {
        AuditEntryDraft::new(user_id, action, resource_kind, resource_id, description)
            .with_context(&self.context)
    }

    // ------------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------------

    /// Resolves a bearer token to an active user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] when the lookup fails.
    pub fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, ServiceError> {
        let fingerprint = TokenFingerprint::of(token);
        let user = self.store.user_by_token(&fingerprint)?;
        Ok(user.filter(|user| user.is_active))
    }

    /// Creates the configured bootstrap admin unless its email already exists.
    ///
    /// When `token` is `None` a token is generated. Returns `None` when the
    /// account already exists.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Invalid`] for invalid account fields.
    pub fn bootstrap_admin(
        &self,
        email: &str,
        full_name: &str,
        token: Option<&str>,
    ) -> Result<Option<IssuedUser>, ServiceError> {
        if self.store.user_by_email(email)?.is_some() {
            return Ok(None);
        }
        let input = NewUser {
            email: email.to_string(),
            full_name: full_name.to_string(),
            role: Role::Admin,
            is_active: true,
        };
        input.validate().map_err(ServiceError::Invalid)?;
        let api_token = token.map_or_else(generate_api_token, str::to_string);
        let audit = AuditEntryDraft::new(
            UserId::SYSTEM,
            ACTION_CREATE,
            ResourceKind::User,
            None,
            format!("Bootstrapped admin {email}"),
        );
        let user = self.store.create_user(user_draft(input, &api_token), audit)?;
        Ok(Some(IssuedUser { user, api_token }))
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    /// Creates a user and issues its API token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PermissionDenied`] for non-admins,
    /// [`ServiceError::Invalid`] for bad input, and [`ServiceError::Conflict`]
    /// for a duplicate email.
    pub fn create_user(&self, actor: &Actor, input: NewUser) -> Result<IssuedUser, ServiceError> {
        authorize(actor, Action::Create, &ResourceRef::collection(ResourceKind::User))?;
        input.validate().map_err(ServiceError::Invalid)?;
        let api_token = generate_api_token();
        let audit = self.audit_entry(
            actor.id,
            ACTION_CREATE,
            ResourceKind::User,
            None,
            format!("Created user {} ({})", input.email, input.role),
        );
        let user = self.store.create_user(user_draft(input, &api_token), audit)?;
        Ok(IssuedUser { user, api_token })
    }

    /// Loads a user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::PermissionDenied`].
    pub fn get_user(&self, actor: &Actor, id: UserId) -> Result<UserRecord, ServiceError> {
        let user = self.load_user(id)?;
        authorize(actor, Action::Read, &ResourceRef::user(id))?;
        Ok(user)
    }

    /// Applies a partial update to a user.
    ///
    /// Only admins may change `role` or `is_active`, including their own.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PermissionDenied`] when the actor may not update
    /// the user or touches privileged fields without being admin.
    pub fn update_user(
        &self,
        actor: &Actor,
        id: UserId,
        patch: UserPatch,
    ) -> Result<UserRecord, ServiceError> {
        let current = self.load_user(id)?;
        authorize(actor, Action::Update, &ResourceRef::user(id))?;
        if patch.touches_privileges() && !actor.role.is_admin() {
            return Err(ServiceError::PermissionDenied(AccessDecision {
                allowed: false,
                reason: AccessReason::DefaultDeny,
            }));
        }
        patch.validate().map_err(ServiceError::Invalid)?;
        let mut updated = current.clone();
        patch.apply(&mut updated);
        updated.updated_at = Timestamp::now();
        let changes: Vec<FieldChange> = FieldChange::between(&current, &updated)
            .into_iter()
            .filter(|change| !USER_DIFF_EXCLUDED.contains(&change.field.as_str()))
            .collect();
        let audit = self.audit_entry(
            actor.id,
            ACTION_UPDATE,
            ResourceKind::User,
            Some(id.get()),
            format!("Updated user {}", updated.email),
        )
        .with_changes(FieldChange::to_json(&changes));
        self.store.save_user(&updated, audit)?;
        Ok(updated)
    }

    /// Replaces a user's API token and returns the new plaintext token.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::PermissionDenied`].
    pub fn rotate_token(&self, actor: &Actor, id: UserId) -> Result<IssuedUser, ServiceError> {
        let mut user = self.load_user(id)?;
        authorize(actor, Action::Update, &ResourceRef::user(id))?;
        let api_token = generate_api_token();
        user.token_fingerprint = TokenFingerprint::of(&api_token);
        user.updated_at = Timestamp::now();
        let audit = self.audit_entry(
            actor.id,
            ACTION_TOKEN_ROTATE,
            ResourceKind::User,
            Some(id.get()),
            format!("Rotated API token for {}", user.email),
        );
        self.store.save_user(&user, audit)?;
        Ok(IssuedUser { user, api_token })
    }

    /// Deletes a user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Conflict`] when the user still owns contracts.
    pub fn delete_user(&self, actor: &Actor, id: UserId) -> Result<(), ServiceError> {
        let user = self.load_user(id)?;
        authorize(actor, Action::Delete, &ResourceRef::user(id))?;
        let audit = self.audit_entry(
            actor.id,
            ACTION_DELETE,
            ResourceKind::User,
            Some(id.get()),
            format!("Deleted user {}", user.email),
        );
        if !self.store.delete_user(id, audit)? {
            return Err(ServiceError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    /// Lists all users (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PermissionDenied`] for non-admins.
    pub fn list_users(&self, actor: &Actor, page: Page) -> Result<Vec<UserRecord>, ServiceError> {
        authorize(actor, Action::ListAll, &ResourceRef::collection(ResourceKind::User))?;
        Ok(self.store.list_users(self.page(page))?)
    }

    // ------------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------------

    /// Creates a template (legal and admin).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PermissionDenied`] or [`ServiceError::Invalid`].
    pub fn create_template(
        &self,
        actor: &Actor,
        input: NewTemplate,
    ) -> Result<TemplateRecord, ServiceError> {
        authorize(actor, Action::Create, &ResourceRef::collection(ResourceKind::Template))?;
        input.validate().map_err(ServiceError::Invalid)?;
        let audit = self.audit_entry(
            actor.id,
            ACTION_CREATE,
            ResourceKind::Template,
            None,
            format!("Created template {}", input.name),
        );
        let draft = TemplateDraft {
            name: input.name,
            description: input.description,
            content: input.content,
            category: input.category,
            is_active: true,
            created_by: actor.id,
        };
        Ok(self.store.create_template(draft, audit)?)
    }

    /// Loads a template.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] for unknown templates.
    pub fn get_template(&self, actor: &Actor, id: TemplateId) -> Result<TemplateRecord, ServiceError> {
        let template = self.load_template(id)?;
        authorize(actor, Action::Read, &template_ref(&template))?;
        Ok(template)
    }

    /// Applies a partial update to a template.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PermissionDenied`] or [`ServiceError::Invalid`].
    pub fn update_template(
        &self,
        actor: &Actor,
        id: TemplateId,
        patch: TemplatePatch,
    ) -> Result<TemplateRecord, ServiceError> {
        let current = self.load_template(id)?;
        authorize(actor, Action::Update, &template_ref(&current))?;
        patch.validate().map_err(ServiceError::Invalid)?;
        let mut updated = current.clone();
        patch.apply(&mut updated);
        updated.updated_at = Timestamp::now();
        let changes: Vec<FieldChange> = FieldChange::between(&current, &updated)
            .into_iter()
            .filter(|change| change.field != "updated_at")
            .collect();
        let audit = self.audit_entry(
            actor.id,
            ACTION_UPDATE,
            ResourceKind::Template,
            Some(id.get()),
            format!("Updated template {}", updated.name),
        )
        .with_changes(FieldChange::to_json(&changes));
        self.store.save_template(&updated, audit)?;
        Ok(updated)
    }

    /// Deletes a template.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::PermissionDenied`].
    pub fn delete_template(&self, actor: &Actor, id: TemplateId) -> Result<(), ServiceError> {
        let template = self.load_template(id)?;
        authorize(actor, Action::Delete, &template_ref(&template))?;
        let audit = self.audit_entry(
            actor.id,
            ACTION_DELETE,
            ResourceKind::Template,
            Some(id.get()),
            format!("Deleted template {}", template.name),
        );
        if !self.store.delete_template(id, audit)? {
            return Err(ServiceError::NotFound(format!("template {id}")));
        }
        Ok(())
    }

    /// Lists templates.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] when loading fails.
    pub fn list_templates(
        &self,
        actor: &Actor,
        filter: &TemplateFilter,
        page: Page,
    ) -> Result<Vec<TemplateRecord>, ServiceError> {
        authorize(actor, Action::Read, &ResourceRef::collection(ResourceKind::Template))?;
        Ok(self.store.list_templates(filter, self.page(page))?)
    }

    // ------------------------------------------------------------------------
    // Contracts
    // ------------------------------------------------------------------------

    /// Creates a contract owned by `actor` in `draft` status.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Invalid`] for bad fields or an unknown template,
    /// and [`ServiceError::Conflict`] for a duplicate contract number.
    pub fn create_contract(
        &self,
        actor: &Actor,
        input: NewContract,
    ) -> Result<ContractRecord, ServiceError> {
        authorize(actor, Action::Create, &ResourceRef::collection(ResourceKind::Contract))?;
        input.fields.validate().map_err(ServiceError::Invalid)?;
        if let Some(template_id) = input.fields.template_id
            && self.store.template(template_id)?.is_none()
        {
            return Err(ServiceError::Invalid(format!("unknown template {template_id}")));
        }
        let contract_number = match input.contract_number {
            Some(number) => {
                validate_contract_number(&number)?;
                number
            }
            None => generate_contract_number(),
        };
        let audit = self.audit_entry(
            actor.id,
            ACTION_CREATE,
            ResourceKind::Contract,
            None,
            format!("Created contract {contract_number}"),
        );
        let draft = ContractDraft {
            contract_number,
            owner_id: actor.id,
            status: ContractStatus::Draft,
            fields: input.fields,
        };
        Ok(self.store.create_contract(draft, audit)?)
    }

    /// Loads a contract.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::PermissionDenied`].
    pub fn get_contract(&self, actor: &Actor, id: ContractId) -> Result<ContractRecord, ServiceError> {
        let contract = self.load_contract(id)?;
        authorize(actor, Action::Read, &contract_ref(&contract))?;
        Ok(contract)
    }

    /// Applies a partial update; a requested status goes through the lifecycle.
    ///
    /// A requested status equal to the current one is not a status change.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Transition`] when a requested status change is
    /// rejected and [`ServiceError::Conflict`] when the contract changed
    /// after it was read.
    pub fn update_contract(
        &self,
        actor: &Actor,
        id: ContractId,
        patch: ContractPatch,
    ) -> Result<ContractRecord, ServiceError> {
        let current = self.load_contract(id)?;
        authorize(actor, Action::Update, &contract_ref(&current))?;
        let directive = patch
            .status
            .filter(|requested| *requested != current.status)
            .map(|requested| next_status(current.status, requested, actor.role))
            .transpose()?;
        let mut updated = current.clone();
        if let Some(directive) = &directive {
            updated.status = directive.audit_entry.to;
        }
        patch.apply(&mut updated.fields);
        updated.fields.validate().map_err(ServiceError::Invalid)?;
        updated.updated_at = Timestamp::now();

        let mut changes = status_change(&current, &updated);
        changes.extend(FieldChange::between(&current.fields, &updated.fields));
        let action = directive
            .as_ref()
            .map_or(ACTION_UPDATE, |directive| directive.audit_entry.action.as_str());
        let summary = format!("Updated contract {}", updated.contract_number);
        let write = ContractWrite {
            snapshots: vec![VersionDraft::of(&updated, actor.id, summary.clone()).with_changes(&changes)],
            audit: self
                .audit_entry(actor.id, action, ResourceKind::Contract, Some(id.get()), summary)
                .with_changes(FieldChange::to_json(&changes)),
            expected_revision: current.revision,
            record: updated,
        };
        Ok(self.store.apply_contract_write(write)?)
    }

    /// Moves a contract to `requested` status.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PermissionDenied`] when the actor may not update
    /// the contract, [`ServiceError::Transition`] when the lifecycle rejects
    /// the change, and [`ServiceError::Conflict`] when the contract changed
    /// after it was read.
    pub fn change_status(
        &self,
        actor: &Actor,
        id: ContractId,
        requested: ContractStatus,
    ) -> Result<ContractRecord, ServiceError> {
        let current = self.load_contract(id)?;
        authorize(actor, Action::Update, &contract_ref(&current))?;
        let directive = next_status(current.status, requested, actor.role)?;
        let mut updated = current.clone();
        updated.status = directive.audit_entry.to;
        updated.updated_at = Timestamp::now();

        let changes = status_change(&current, &updated);
        let summary = format!(
            "Status changed from {} to {}",
            directive.audit_entry.from, directive.audit_entry.to
        );
        let snapshots = if directive.snapshot_required {
            vec![VersionDraft::of(&updated, actor.id, summary.clone()).with_changes(&changes)]
        } else {
            Vec::new()
        };
        let audit = self.audit_entry(
            actor.id,
            &directive.audit_entry.action,
            ResourceKind::Contract,
            Some(id.get()),
            summary,
        )
        .with_changes(FieldChange::to_json(&changes));
        let write = ContractWrite {
            record: updated,
            expected_revision: current.revision,
            snapshots,
            audit,
        };
        Ok(self.store.apply_contract_write(write)?)
    }

    /// Loads a contract with the statuses the actor may move it to.
    ///
    /// Actors who may read but not update the contract get an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::PermissionDenied`].
    pub fn transitions(
        &self,
        actor: &Actor,
        id: ContractId,
    ) -> Result<ContractTransitions, ServiceError> {
        let contract = self.get_contract(actor, id)?;
        let allowed = if can_perform(actor, Action::Update, &contract_ref(&contract)).allowed {
            reachable_statuses(contract.status, actor.role)
        } else {
            Vec::new()
        };
        Ok(ContractTransitions { contract, allowed })
    }

    /// Deletes a contract and its version history.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::PermissionDenied`].
    pub fn delete_contract(&self, actor: &Actor, id: ContractId) -> Result<(), ServiceError> {
        let contract = self.load_contract(id)?;
        authorize(actor, Action::Delete, &contract_ref(&contract))?;
        let audit = self.audit_entry(
            actor.id,
            ACTION_DELETE,
            ResourceKind::Contract,
            Some(id.get()),
            format!("Deleted contract {}", contract.contract_number),
        );
        if !self.store.delete_contract(id, audit)? {
            return Err(ServiceError::NotFound(format!("contract {id}")));
        }
        Ok(())
    }

    /// Lists contracts.
    ///
    /// Admins see every contract and may filter by owner; everyone else sees
    /// only their own contracts regardless of the requested owner filter.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] when loading fails.
    pub fn list_contracts(
        &self,
        actor: &Actor,
        filter: ContractFilter,
        page: Page,
    ) -> Result<Vec<ContractRecord>, ServiceError> {
        let list_all = ResourceRef::collection(ResourceKind::Contract);
        let filter = if can_perform(actor, Action::ListAll, &list_all).allowed {
            filter
        } else {
            ContractFilter {
                owner_id: Some(actor.id),
                ..filter
            }
        };
        Ok(self.store.list_contracts(&filter, self.page(page))?)
    }

    // ------------------------------------------------------------------------
    // Versions
    // ------------------------------------------------------------------------

    /// Lists a contract's versions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::PermissionDenied`].
    pub fn list_versions(
        &self,
        actor: &Actor,
        id: ContractId,
        page: Page,
    ) -> Result<Vec<ContractVersion>, ServiceError> {
        self.get_contract(actor, id)?;
        Ok(self.store.list_versions(id, self.page(page))?)
    }

    /// Loads one version of a contract.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the contract or version is missing.
    pub fn get_version(
        &self,
        actor: &Actor,
        id: ContractId,
        number: u32,
    ) -> Result<ContractVersion, ServiceError> {
        self.get_contract(actor, id)?;
        self.load_version(id, number)
    }

    /// Compares two versions of a contract.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when either version is missing.
    pub fn compare_versions(
        &self,
        actor: &Actor,
        id: ContractId,
        from_version: u32,
        to_version: u32,
    ) -> Result<VersionComparison, ServiceError> {
        self.get_contract(actor, id)?;
        let from = self.load_version(id, from_version)?;
        let to = self.load_version(id, to_version)?;
        Ok(VersionComparison {
            contract_id: id,
            from_version,
            to_version,
            differences: from.compare(&to),
        })
    }

    /// Restores a contract's content fields from a version.
    ///
    /// The current state is snapshotted before the restore and the restored
    /// state after it. Status is never restored.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] when the version is missing and
    /// [`ServiceError::Conflict`] when the contract changed concurrently.
    pub fn restore_version(
        &self,
        actor: &Actor,
        id: ContractId,
        number: u32,
    ) -> Result<ContractRecord, ServiceError> {
        let current = self.load_contract(id)?;
        authorize(actor, Action::Update, &contract_ref(&current))?;
        let version = self.load_version(id, number)?;
        let mut restored = current.clone();
        restored.fields = version.fields;
        restored.updated_at = Timestamp::now();
        let changes = FieldChange::between(&current.fields, &restored.fields);
        let before = VersionDraft::of(&current, actor.id, format!("Before restoring to version {number}"));
        let after = VersionDraft::of(&restored, actor.id, format!("Restored to version {number}"))
            .with_changes(&changes);
        let audit = self.audit_entry(
            actor.id,
            ACTION_RESTORE,
            ResourceKind::Contract,
            Some(id.get()),
            format!("Restored contract {} to version {number}", current.contract_number),
        )
        .with_changes(FieldChange::to_json(&changes));
        let write = ContractWrite {
            record: restored,
            expected_revision: current.revision,
            snapshots: vec![before, after],
            audit,
        };
        Ok(self.store.apply_contract_write(write)?)
    }

    // ------------------------------------------------------------------------
    // Audit
    // ------------------------------------------------------------------------

    /// Lists audit entries across all users (admin only).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PermissionDenied`] for non-admins.
    pub fn list_audit(
        &self,
        actor: &Actor,
        filter: &AuditFilter,
        page: Page,
    ) -> Result<Vec<AuditEntry>, ServiceError> {
        let kind = filter.resource_kind.unwrap_or(ResourceKind::User);
        authorize(actor, Action::ListAll, &ResourceRef::collection(kind))?;
        Ok(self.store.list_audit(filter, self.page(page))?)
    }

    /// Lists audit entries recorded for one contract.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] or [`ServiceError::PermissionDenied`].
    pub fn contract_audit(
        &self,
        actor: &Actor,
        id: ContractId,
        page: Page,
    ) -> Result<Vec<AuditEntry>, ServiceError> {
        self.get_contract(actor, id)?;
        Ok(self.store.list_audit(&AuditFilter::for_contract(id), self.page(page))?)
    }

    /// Lists audit entries performed by one user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::PermissionDenied`] unless the actor is that
    /// user or an admin.
    pub fn user_audit(
        &self,
        actor: &Actor,
        user_id: UserId,
        page: Page,
    ) -> Result<Vec<AuditEntry>, ServiceError> {
        authorize(actor, Action::Read, &ResourceRef::user(user_id))?;
        let filter = AuditFilter {
            user_id: Some(user_id),
            ..AuditFilter::default()
        };
        Ok(self.store.list_audit(&filter, self.page(page))?)
    }

    // ------------------------------------------------------------------------
    // Loaders
    // ------------------------------------------------------------------------

    /// Loads a user or fails with `NotFound`.
    fn load_user(&self, id: UserId) -> Result<UserRecord, ServiceError> {
        self.store.user(id)?.ok_or_else(|| ServiceError::NotFound(format!("user {id}")))
    }

    /// Loads a template or fails with `NotFound`.
    fn load_template(&self, id: TemplateId) -> Result<TemplateRecord, ServiceError> {
        self.store.template(id)?.ok_or_else(|| ServiceError::NotFound(format!("template {id}")))
    }

    /// Loads a contract or fails with `NotFound`.
    fn load_contract(&self, id: ContractId) -> Result<ContractRecord, ServiceError> {
        self.store.contract(id)?.ok_or_else(|| ServiceError::NotFound(format!("contract {id}")))
    }

    /// Loads a version or fails with `NotFound`.
    fn load_version(&self, id: ContractId, number: u32) -> Result<ContractVersion, ServiceError> {
        self.store
            .version(id, number)?
            .ok_or_else(|| ServiceError::NotFound(format!("contract {id} version {number}")))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Evaluates the access policy and converts a deny into an error.
fn authorize(
    actor: &Actor,
    action: Action,
    resource: &ResourceRef,
) -> Result<AccessDecision, ServiceError> {
    let decision = can_perform(actor, action, resource);
    if decision.allowed { Ok(decision) } else { Err(ServiceError::PermissionDenied(decision)) }
}

/// Builds the store draft for a validated user input.
fn user_draft(input: NewUser, api_token: &str) -> UserDraft {
    UserDraft {
        email: input.email,
        full_name: input.full_name,
        role: input.role,
        is_active: input.is_active,
        token_fingerprint: TokenFingerprint::of(api_token),
    }
}

/// Access reference for a stored template (owned by its creator).
const fn template_ref(template: &TemplateRecord) -> ResourceRef {
    ResourceRef::owned(ResourceKind::Template, template.id.get(), Some(template.created_by))
}

/// Access reference for a stored contract.
const fn contract_ref(contract: &ContractRecord) -> ResourceRef {
    ResourceRef::owned(ResourceKind::Contract, contract.id.get(), Some(contract.owner_id))
}

/// Returns the status change between two records, if any.
fn status_change(before: &ContractRecord, after: &ContractRecord) -> Vec<FieldChange> {
    if before.status == after.status {
        return Vec::new();
    }
    vec![FieldChange {
        field: "status".to_string(),
        old: Value::String(before.status.as_str().to_string()),
        new: Value::String(after.status.as_str().to_string()),
    }]
}

/// Validates a caller-supplied contract number.
fn validate_contract_number(number: &str) -> Result<(), ServiceError> {
    if number.trim().is_empty() || number.chars().count() > MAX_SHORT_TEXT {
        return Err(ServiceError::Invalid(format!("invalid contract_number: {number}")));
    }
    Ok(())
}
