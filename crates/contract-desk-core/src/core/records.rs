// contract-desk-core/src/core/records.rs
// ============================================================================
// Module: Contract Desk Records
// Description: Stored records, creation inputs, patches, and paging.
// Purpose: Define the persisted data model and its validation rules.
// Dependencies: crate::core::{actor, clock, hashing, identifiers, status},
// serde, serde_json, time
// ============================================================================

//! ## Overview
//! Each stored record has three shapes:
//! - a `New*` input accepted from callers,
//! - a `*Draft` handed to the store once the service has filled in owner,
//!   status, and credential fields,
//! - the `*Record` returned by the store with its assigned identifier.
//!
//! Patches carry only the fields a caller wants to change. Contract content
//! fields are grouped in [`ContractFields`] so that version snapshots and
//! restores operate on exactly the same set of fields.
//!
//! Security posture: all inputs are untrusted; `validate` methods run before
//! any store call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::core::actor::Actor;
use crate::core::actor::ResourceKind;
use crate::core::actor::Role;
use crate::core::clock::Timestamp;
use crate::core::hashing::TokenFingerprint;
use crate::core::identifiers::ContractId;
use crate::core::identifiers::TemplateId;
use crate::core::identifiers::UserId;
use crate::core::status::ContractStatus;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default currency code applied to new contracts.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Maximum length for short text fields (names, titles, emails).
pub const MAX_SHORT_TEXT: usize = 255;

/// Maximum integer digits in a contract value.
const MAX_AMOUNT_INTEGER_DIGITS: usize = 13;

/// Maximum fractional digits in a contract value.
const MAX_AMOUNT_FRACTION_DIGITS: usize = 2;

/// Maximum stored length of a client IP address.
pub const MAX_IP_ADDRESS_LEN: usize = 45;

/// Maximum stored length of a client user agent.
pub const MAX_USER_AGENT_LEN: usize = 255;

// ============================================================================
// SECTION: Paging
// ============================================================================

/// Offset/limit window for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Records to skip.
    pub skip: u64,
    /// Maximum records to return.
    pub limit: u64,
}

impl Page {
    /// Default page size.
    pub const DEFAULT_LIMIT: u64 = 100;

    /// Creates a page window.
    #[must_use]
    pub const fn new(skip: u64, limit: u64) -> Self {
        Self { skip, limit }
    }

    /// Returns the page with `limit` capped at `max_limit`.
    #[must_use]
    pub const fn clamped(self, max_limit: u64) -> Self {
        let limit = if self.limit > max_limit { max_limit } else { self.limit };
        Self { skip: self.skip, limit }
    }

    /// Applies the window to an iterator.
    pub fn apply<I: IntoIterator>(self, items: I) -> impl Iterator<Item = I::Item> {
        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_LIMIT)
    }
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Stored user account.
///
/// # Invariants
/// - `email` is unique across users.
/// - `token_fingerprint` is unique across users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User identifier.
    pub id: UserId,
    /// Login email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
    /// Inactive users cannot authenticate.
    pub is_active: bool,
    /// Fingerprint of the user's current API token.
    pub token_fingerprint: TokenFingerprint,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

impl UserRecord {
    /// Returns the actor evaluating requests made with this user's token.
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

/// User creation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
    /// Whether the account starts active.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewUser {
    /// Validates caller-supplied user fields.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_email(&self.email)?;
        validate_short_text("full_name", &self.full_name)
    }
}

/// User handed to the store for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    /// Login email.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Assigned role.
    pub role: Role,
    /// Whether the account starts active.
    pub is_active: bool,
    /// Fingerprint of the issued API token.
    pub token_fingerprint: TokenFingerprint,
}

/// Partial user update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    /// New email.
    #[serde(default)]
    pub email: Option<String>,
    /// New display name.
    #[serde(default)]
    pub full_name: Option<String>,
    /// New role.
    #[serde(default)]
    pub role: Option<Role>,
    /// New active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UserPatch {
    /// Returns true when the patch touches privileged fields.
    #[must_use]
    pub const fn touches_privileges(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }

    /// Validates supplied fields.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(name) = &self.full_name {
            validate_short_text("full_name", name)?;
        }
        Ok(())
    }

    /// Applies the patch to a stored record.
    pub fn apply(self, record: &mut UserRecord) {
        if let Some(email) = self.email {
            record.email = email;
        }
        if let Some(name) = self.full_name {
            record.full_name = name;
        }
        if let Some(role) = self.role {
            record.role = role;
        }
        if let Some(active) = self.is_active {
            record.is_active = active;
        }
    }
}

// ============================================================================
// SECTION: Templates
// ============================================================================

/// Stored contract template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    /// Template identifier.
    pub id: TemplateId,
    /// Template name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Template body.
    pub content: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Inactive templates are hidden from default listings.
    pub is_active: bool,
    /// User that created the template.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

/// Template creation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewTemplate {
    /// Template name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Template body.
    pub content: String,
    /// Optional category label.
    #[serde(default)]
    pub category: Option<String>,
}

impl NewTemplate {
    /// Validates caller-supplied template fields.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_short_text("name", &self.name)?;
        validate_required("content", &self.content)
    }
}

/// Template handed to the store for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDraft {
    /// Template name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Template body.
    pub content: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Whether the template starts active.
    pub is_active: bool,
    /// Creating user.
    pub created_by: UserId,
}

/// Partial template update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplatePatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New body.
    #[serde(default)]
    pub content: Option<String>,
    /// New category.
    #[serde(default)]
    pub category: Option<String>,
    /// New active flag.
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl TemplatePatch {
    /// Validates supplied fields.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_short_text("name", name)?;
        }
        if let Some(content) = &self.content {
            validate_required("content", content)?;
        }
        Ok(())
    }

    /// Applies the patch to a stored record.
    pub fn apply(self, record: &mut TemplateRecord) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if self.description.is_some() {
            record.description = self.description;
        }
        if let Some(content) = self.content {
            record.content = content;
        }
        if self.category.is_some() {
            record.category = self.category;
        }
        if let Some(active) = self.is_active {
            record.is_active = active;
        }
    }
}

// ============================================================================
// SECTION: Contracts
// ============================================================================

/// Versioned content fields of a contract.
///
/// # Invariants
/// - Snapshots and restores copy exactly this set of fields.
/// - `contract_value`, when present, is a non-negative decimal with at most
///   two fractional digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFields {
    /// Contract title.
    pub title: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Contract body.
    pub content: String,
    /// Monetary value as a decimal string.
    #[serde(default)]
    pub contract_value: Option<String>,
    /// ISO 4217 currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Counterparty legal name.
    pub counterparty_name: String,
    /// Counterparty contact details.
    #[serde(default)]
    pub counterparty_contact: Option<String>,
    /// Effective date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    /// Expiry date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    /// Signature date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub signature_date: Option<OffsetDateTime>,
    /// Template the contract was drafted from.
    #[serde(default)]
    pub template_id: Option<TemplateId>,
}

impl ContractFields {
    /// Validates content fields.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        validate_short_text("title", &self.title)?;
        validate_required("content", &self.content)?;
        validate_short_text("counterparty_name", &self.counterparty_name)?;
        validate_currency(&self.currency)?;
        if let Some(value) = &self.contract_value {
            validate_amount(value)?;
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end < start
        {
            return Err("end_date precedes start_date".to_string());
        }
        Ok(())
    }
}

/// Contract creation input.
///
/// Decoded through a flat body type so unknown keys (such as `status`)
/// are rejected rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "NewContractBody")]
pub struct NewContract {
    /// Caller-chosen contract number; generated when absent.
    #[serde(default)]
    pub contract_number: Option<String>,
    /// Content fields.
    #[serde(flatten)]
    pub fields: ContractFields,
}

/// Flat wire form of [`NewContract`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NewContractBody {
    /// Caller-chosen contract number.
    #[serde(default)]
    contract_number: Option<String>,
    /// Contract title.
    title: String,
    /// Optional description.
    #[serde(default)]
    description: Option<String>,
    /// Contract body.
    content: String,
    /// Monetary value as a decimal string.
    #[serde(default)]
    contract_value: Option<String>,
    /// ISO 4217 currency code.
    #[serde(default = "default_currency")]
    currency: String,
    /// Counterparty legal name.
    counterparty_name: String,
    /// Counterparty contact details.
    #[serde(default)]
    counterparty_contact: Option<String>,
    /// Effective date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    start_date: Option<OffsetDateTime>,
    /// Expiry date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    end_date: Option<OffsetDateTime>,
    /// Signature date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    signature_date: Option<OffsetDateTime>,
    /// Template the contract is drafted from.
    #[serde(default)]
    template_id: Option<TemplateId>,
}

impl From<NewContractBody> for NewContract {
    fn from(body: NewContractBody) -> Self {
        Self {
            contract_number: body.contract_number,
            fields: ContractFields {
                title: body.title,
                description: body.description,
                content: body.content,
                contract_value: body.contract_value,
                currency: body.currency,
                counterparty_name: body.counterparty_name,
                counterparty_contact: body.counterparty_contact,
                start_date: body.start_date,
                end_date: body.end_date,
                signature_date: body.signature_date,
                template_id: body.template_id,
            },
        }
    }
}

/// Contract handed to the store for insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDraft {
    /// Unique contract number.
    pub contract_number: String,
    /// Owning user.
    pub owner_id: UserId,
    /// Initial status.
    pub status: ContractStatus,
    /// Content fields.
    pub fields: ContractFields,
}

/// Stored contract.
///
/// # Invariants
/// - Exactly one current `status`.
/// - `contract_number` is unique across contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Contract identifier.
    pub id: ContractId,
    /// Unique contract number.
    pub contract_number: String,
    /// Current lifecycle status.
    pub status: ContractStatus,
    /// Owning user.
    pub owner_id: UserId,
    /// Write counter: 1 at creation, incremented by the store on every
    /// committed write.
    pub revision: u64,
    /// Content fields.
    #[serde(flatten)]
    pub fields: ContractFields,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time.
    pub updated_at: Timestamp,
}

/// Partial contract update.
///
/// A `status` entry is not applied here; the service routes it through the
/// lifecycle check first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractPatch {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New body.
    #[serde(default)]
    pub content: Option<String>,
    /// Requested status change.
    #[serde(default)]
    pub status: Option<ContractStatus>,
    /// New value.
    #[serde(default)]
    pub contract_value: Option<String>,
    /// New currency.
    #[serde(default)]
    pub currency: Option<String>,
    /// New counterparty name.
    #[serde(default)]
    pub counterparty_name: Option<String>,
    /// New counterparty contact.
    #[serde(default)]
    pub counterparty_contact: Option<String>,
    /// New effective date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    /// New expiry date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_date: Option<OffsetDateTime>,
    /// New signature date.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub signature_date: Option<OffsetDateTime>,
}

impl ContractPatch {
    /// Applies content changes to `fields`; `status` is ignored.
    pub fn apply(self, fields: &mut ContractFields) {
        if let Some(title) = self.title {
            fields.title = title;
        }
        if self.description.is_some() {
            fields.description = self.description;
        }
        if let Some(content) = self.content {
            fields.content = content;
        }
        if self.contract_value.is_some() {
            fields.contract_value = self.contract_value;
        }
        if let Some(currency) = self.currency {
            fields.currency = currency;
        }
        if let Some(name) = self.counterparty_name {
            fields.counterparty_name = name;
        }
        if self.counterparty_contact.is_some() {
            fields.counterparty_contact = self.counterparty_contact;
        }
        if self.start_date.is_some() {
            fields.start_date = self.start_date;
        }
        if self.end_date.is_some() {
            fields.end_date = self.end_date;
        }
        if self.signature_date.is_some() {
            fields.signature_date = self.signature_date;
        }
    }
}

// ============================================================================
// SECTION: Versions
// ============================================================================

/// Immutable snapshot of a contract at a point in its history.
///
/// # Invariants
/// - `version_number` starts at 1 and increases by one per snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractVersion {
    /// Contract the snapshot belongs to.
    pub contract_id: ContractId,
    /// Sequential version number.
    pub version_number: u32,
    /// Status at snapshot time.
    pub status: ContractStatus,
    /// Content fields at snapshot time.
    #[serde(flatten)]
    pub fields: ContractFields,
    /// User whose change produced the snapshot.
    pub changed_by: UserId,
    /// Human-readable summary.
    pub change_summary: Option<String>,
    /// Field-level changes relative to the previous state.
    pub changes: Option<Value>,
    /// Snapshot time.
    pub created_at: Timestamp,
}

impl ContractVersion {
    /// Returns the field differences from `self` to `other`, status included.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        if self.status != other.status {
            changes.push(FieldChange {
                field: "status".to_string(),
                old: Value::String(self.status.as_str().to_string()),
                new: Value::String(other.status.as_str().to_string()),
            });
        }
        changes.extend(FieldChange::between(&self.fields, &other.fields));
        changes
    }
}

/// Snapshot handed to the store; the store assigns the version number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDraft {
    /// Status to record.
    pub status: ContractStatus,
    /// Content fields to record.
    pub fields: ContractFields,
    /// User whose change produced the snapshot.
    pub changed_by: UserId,
    /// Human-readable summary.
    pub change_summary: Option<String>,
    /// Field-level changes relative to the previous state.
    pub changes: Option<Value>,
}

impl VersionDraft {
    /// Builds a snapshot of a contract's current state.
    #[must_use]
    pub fn of(record: &ContractRecord, changed_by: UserId, summary: impl Into<String>) -> Self {
        Self {
            status: record.status,
            fields: record.fields.clone(),
            changed_by,
            change_summary: Some(summary.into()),
            changes: None,
        }
    }

    /// Attaches field-level changes.
    #[must_use]
    pub fn with_changes(mut self, changes: &[FieldChange]) -> Self {
        self.changes = FieldChange::to_json(changes);
        self
    }
}

// ============================================================================
// SECTION: Field Changes
// ============================================================================

/// Single field difference between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    /// Field name.
    pub field: String,
    /// Previous value.
    pub old: Value,
    /// New value.
    pub new: Value,
}

impl FieldChange {
    /// Diffs two serializable values field by field, in field-name order.
    #[must_use]
    pub fn between<T: Serialize>(old: &T, new: &T) -> Vec<Self> {
        let old = serde_json::to_value(old).unwrap_or(Value::Null);
        let new = serde_json::to_value(new).unwrap_or(Value::Null);
        let (Value::Object(old), Value::Object(new)) = (old, new) else {
            return Vec::new();
        };
        let mut keys: Vec<&String> = old.keys().chain(new.keys()).collect();
        keys.sort();
        keys.dedup();
        keys.into_iter()
            .filter_map(|key| {
                let before = old.get(key).cloned().unwrap_or(Value::Null);
                let after = new.get(key).cloned().unwrap_or(Value::Null);
                (before != after).then(|| Self {
                    field: key.clone(),
                    old: before,
                    new: after,
                })
            })
            .collect()
    }

    /// Renders changes as `{field: {old, new}}`, or `None` when empty.
    #[must_use]
    pub fn to_json(changes: &[Self]) -> Option<Value> {
        if changes.is_empty() {
            return None;
        }
        let map = changes
            .iter()
            .map(|change| {
                let entry = serde_json::json!({ "old": change.old, "new": change.new });
                (change.field.clone(), entry)
            })
            .collect();
        Some(Value::Object(map))
    }
}

// ============================================================================
// SECTION: Audit Entries
// ============================================================================

/// Stored audit log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry identifier, increasing in insertion order.
    pub id: i64,
    /// Acting user.
    pub user_id: UserId,
    /// Action label (`create`, `update`, `delete`, `status_change`, ...).
    pub action: String,
    /// Kind of resource affected.
    pub resource_kind: ResourceKind,
    /// Affected resource identifier.
    pub resource_id: Option<i64>,
    /// Human-readable description.
    pub description: String,
    /// Structured change payload.
    pub changes: Option<Value>,
    /// Client address the request came from.
    #[serde(default)]
    pub ip_address: Option<String>,
    /// Client user agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Entry time.
    pub created_at: Timestamp,
}

/// Client details attached to audit entries written for a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Client address.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// Builds a context, truncating each value to its stored length.
    #[must_use]
    pub fn new(ip_address: Option<&str>, user_agent: Option<&str>) -> Self {
        Self {
            ip_address: ip_address.map(|value| truncate_chars(value, MAX_IP_ADDRESS_LEN)),
            user_agent: user_agent.map(|value| truncate_chars(value, MAX_USER_AGENT_LEN)),
        }
    }
}

/// Audit entry handed to the store.
///
/// On create operations the store fills in `resource_id` with the newly
/// assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntryDraft {
    /// Acting user.
    pub user_id: UserId,
    /// Action label.
    pub action: String,
    /// Kind of resource affected.
    pub resource_kind: ResourceKind,
    /// Affected resource identifier.
    pub resource_id: Option<i64>,
    /// Human-readable description.
    pub description: String,
    /// Structured change payload.
    pub changes: Option<Value>,
    /// Client details of the originating request.
    pub context: RequestContext,
}

impl AuditEntryDraft {
    /// Creates an audit draft without a change payload.
    #[must_use]
    pub fn new(
        user_id: UserId,
        action: &str,
        resource_kind: ResourceKind,
        resource_id: Option<i64>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            resource_kind,
            resource_id,
            description: description.into(),
            changes: None,
            context: RequestContext::default(),
        }
    }

    /// Attaches a structured change payload.
    #[must_use]
    pub fn with_changes(mut self, changes: Option<Value>) -> Self {
        self.changes = changes;
        self
    }

    /// Attaches the client details of the originating request.
    #[must_use]
    pub fn with_context(mut self, context: &RequestContext) -> Self {
        self.context = context.clone();
        self
    }

    /// Builds the stored entry under the identifier the store assigned.
    #[must_use]
    pub fn into_entry(self, id: i64, created_at: Timestamp) -> AuditEntry {
        AuditEntry {
            id,
            user_id: self.user_id,
            action: self.action,
            resource_kind: self.resource_kind,
            resource_id: self.resource_id,
            description: self.description,
            changes: self.changes,
            ip_address: self.context.ip_address,
            user_agent: self.context.user_agent,
            created_at,
        }
    }
}

// ============================================================================
// SECTION: Validation Helpers
// ============================================================================

/// Serde default for boolean flags that start enabled.
const fn default_true() -> bool {
    true
}

/// Serde default for contract currency.
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Keeps at most `max` characters of `value`.
fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Rejects empty or whitespace-only values.
fn validate_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    Ok(())
}

/// Rejects empty or overlong short text.
fn validate_short_text(field: &str, value: &str) -> Result<(), String> {
    validate_required(field, value)?;
    if value.chars().count() > MAX_SHORT_TEXT {
        return Err(format!("{field} exceeds {MAX_SHORT_TEXT} characters"));
    }
    Ok(())
}

/// Checks the `local@domain.tld` shape of an email address.
fn validate_email(value: &str) -> Result<(), String> {
    validate_short_text("email", value)?;
    let valid = value.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.split('.').count() >= 2
            && domain.split('.').all(|label| !label.is_empty())
            && !value.chars().any(char::is_whitespace)
    });
    if !valid {
        return Err(format!("invalid email address: {value}"));
    }
    Ok(())
}

/// Requires a three-letter uppercase currency code.
fn validate_currency(value: &str) -> Result<(), String> {
    if value.len() != 3 || !value.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(format!("invalid currency code: {value}"));
    }
    Ok(())
}

/// Requires a non-negative decimal with bounded precision.
fn validate_amount(value: &str) -> Result<(), String> {
    let (integer, fraction) = value.split_once('.').unwrap_or((value, ""));
    let digits_ok = !integer.is_empty()
        && integer.len() <= MAX_AMOUNT_INTEGER_DIGITS
        && integer.bytes().all(|b| b.is_ascii_digit())
        && fraction.len() <= MAX_AMOUNT_FRACTION_DIGITS
        && fraction.bytes().all(|b| b.is_ascii_digit())
        && !(value.contains('.') && fraction.is_empty());
    if !digits_ok {
        return Err(format!("invalid contract_value: {value}"));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
