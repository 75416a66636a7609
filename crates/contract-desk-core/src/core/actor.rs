// contract-desk-core/src/core/actor.rs
// ============================================================================
// Module: Contract Desk Actors
// Description: Roles, actions, actors, and resource references.
// Purpose: Carry the explicit inputs evaluated by the access policy.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An [`Actor`] is built per request from the authenticated caller and is
//! never stored in ambient state. A [`ResourceRef`] is the minimal
//! descriptor the access policy needs: resource kind, owner, and identifier.
//! Ownership is resolved by the caller before evaluation so the policy itself
//! never performs I/O.
//!
//! All enums use stable `snake_case` labels on the wire and in audit logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::UserId;

// ============================================================================
// SECTION: Label Parsing
// ============================================================================

/// Error returned when a label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} label: {label}")]
pub struct UnknownLabel {
    /// Label family being parsed (`role`, `action`, ...).
    pub kind: &'static str,
    /// Rejected input.
    pub label: String,
}

impl UnknownLabel {
    /// Builds an unknown-label error for the given family.
    pub(crate) fn new(kind: &'static str, label: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
        }
    }
}

// ============================================================================
// SECTION: Roles
// ============================================================================

/// Role assigned to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Procurement staff; owns and drafts contracts.
    Procurement,
    /// Legal reviewers; manage templates and approve or reject contracts.
    Legal,
    /// Finance staff; owner-only contract access.
    Finance,
    /// Administrators; unrestricted.
    Admin,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Self; 4] = [Self::Procurement, Self::Legal, Self::Finance, Self::Admin];

    /// Returns the stable label for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Procurement => "procurement",
            Self::Legal => "legal",
            Self::Finance => "finance",
            Self::Admin => "admin",
        }
    }

    /// Returns true for the admin role.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| UnknownLabel::new("role", value))
    }
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Operation requested against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create a new resource.
    Create,
    /// Read a single resource.
    Read,
    /// Modify an existing resource.
    Update,
    /// Remove a resource.
    Delete,
    /// Enumerate resources regardless of owner.
    ListAll,
}

impl Action {
    /// Every action, in declaration order.
    pub const ALL: [Self; 5] = [Self::Create, Self::Read, Self::Update, Self::Delete, Self::ListAll];

    /// Returns the stable label for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ListAll => "list_all",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| UnknownLabel::new("action", value))
    }
}

// ============================================================================
// SECTION: Resources
// ============================================================================

/// Kind of resource being accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// User account.
    User,
    /// Contract template.
    Template,
    /// Contract.
    Contract,
}

impl ResourceKind {
    /// Every resource kind, in declaration order.
    pub const ALL: [Self; 3] = [Self::User, Self::Template, Self::Contract];

    /// Returns the stable label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Template => "template",
            Self::Contract => "contract",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownLabel::new("resource kind", value))
    }
}

/// Minimal resource descriptor evaluated by the access policy.
///
/// # Invariants
/// - `owner_id` is resolved by the caller; `None` means the resource has no
///   owner yet (creation) or ownership is not applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Owning user, when known.
    pub owner_id: Option<UserId>,
    /// Raw resource identifier, when addressing an existing resource.
    pub id: Option<i64>,
}

impl ResourceRef {
    /// Reference to a resource collection or a resource not yet created.
    #[must_use]
    pub const fn collection(kind: ResourceKind) -> Self {
        Self {
            kind,
            owner_id: None,
            id: None,
        }
    }

    /// Reference to an existing resource with a resolved owner.
    #[must_use]
    pub const fn owned(kind: ResourceKind, id: i64, owner_id: Option<UserId>) -> Self {
        Self {
            kind,
            owner_id,
            id: Some(id),
        }
    }

    /// Reference to a user account; users own themselves.
    #[must_use]
    pub const fn user(id: UserId) -> Self {
        Self::owned(ResourceKind::User, id.get(), Some(id))
    }
}

// ============================================================================
// SECTION: Actor
// ============================================================================

/// Authenticated identity evaluating a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Authenticated user identifier.
    pub id: UserId,
    /// Role at the time of the request.
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }
}
