// contract-desk-core/src/runtime/access.rs
// ============================================================================
// Module: Contract Desk Access Policy
// Description: Role- and ownership-based access decisions.
// Purpose: Decide whether an actor may perform an action on a resource.
// Dependencies: crate::core, serde
// ============================================================================

//! ## Overview
//! [`can_perform`] is a pure function: no I/O, no ambient state, ownership is
//! passed in by the caller. Rules are evaluated in order and the first match
//! wins:
//!
//! 1. admin: allow
//! 2. `list_all`: deny
//! 3. template create/update/delete: legal only
//! 4. template read: allow
//! 5. user/contract read/update/delete: owner only
//! 6. contract create: allow
//! 7. anything else: deny
//!
//! Every decision carries a stable [`AccessReason`] label for audit logs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::Action;
use crate::core::Actor;
use crate::core::ResourceKind;
use crate::core::ResourceRef;
use crate::core::Role;

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Stable reason label attached to every access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessReason {
    /// Admins may do anything.
    AdminAllow,
    /// Cross-owner listing is reserved to admins.
    ListAllAdminOnly,
    /// Template writes require the legal role.
    TemplateWriteRequiresLegal,
    /// Templates are readable by everyone.
    TemplateReadAllow,
    /// Actor owns the resource.
    OwnerAllow,
    /// Actor does not own the resource.
    OwnerMismatch,
    /// Any authenticated user may create contracts.
    ContractCreateAllow,
    /// No rule matched.
    DefaultDeny,
}

impl AccessReason {
    /// Returns the stable label for this reason.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AdminAllow => "admin_allow",
            Self::ListAllAdminOnly => "list_all_admin_only",
            Self::TemplateWriteRequiresLegal => "template_write_requires_legal",
            Self::TemplateReadAllow => "template_read_allow",
            Self::OwnerAllow => "owner_allow",
            Self::OwnerMismatch => "owner_mismatch",
            Self::ContractCreateAllow => "contract_create_allow",
            Self::DefaultDeny => "default_deny",
        }
    }
}

impl fmt::Display for AccessReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access decision outcome.
///
/// # Invariants
/// - `allowed` is the authoritative decision for the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether access is allowed.
    pub allowed: bool,
    /// Reason label for audit logs.
    pub reason: AccessReason,
}

impl AccessDecision {
    /// Builds an allow decision.
    const fn allow(reason: AccessReason) -> Self {
        Self {
            allowed: true,
            reason,
        }
    }

    /// Builds a deny decision.
    const fn deny(reason: AccessReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Evaluates whether `actor` may perform `action` on `resource`.
#[must_use]
pub fn can_perform(actor: &Actor, action: Action, resource: &ResourceRef) -> AccessDecision {
    if actor.role == Role::Admin {
        return AccessDecision::allow(AccessReason::AdminAllow);
    }
    if action == Action::ListAll {
        return AccessDecision::deny(AccessReason::ListAllAdminOnly);
    }
    match (resource.kind, action) {
        (ResourceKind::Template, Action::Create | Action::Update | Action::Delete) => {
            if actor.role == Role::Legal {
                AccessDecision::allow(AccessReason::TemplateWriteRequiresLegal)
            } else {
                AccessDecision::deny(AccessReason::TemplateWriteRequiresLegal)
            }
        }
        (ResourceKind::Template, Action::Read) => {
            AccessDecision::allow(AccessReason::TemplateReadAllow)
        }
        (
            ResourceKind::User | ResourceKind::Contract,
            Action::Read | Action::Update | Action::Delete,
        ) => {
            if resource.owner_id == Some(actor.id) {
                AccessDecision::allow(AccessReason::OwnerAllow)
            } else {
                AccessDecision::deny(AccessReason::OwnerMismatch)
            }
        }
        (ResourceKind::Contract, Action::Create) => {
            AccessDecision::allow(AccessReason::ContractCreateAllow)
        }
        _ => AccessDecision::deny(AccessReason::DefaultDeny),
    }
}

// ============================================================================
// SECTION: Capabilities
// ============================================================================

/// Actions an actor may perform on one resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Permitted actions, in declaration order.
    pub actions: Vec<Action>,
}

/// Derives the capability list for `actor`.
///
/// Ownership-scoped actions are evaluated against resources the actor owns,
/// so an entry means "permitted on at least your own resources".
#[must_use]
pub fn capabilities(actor: &Actor) -> Vec<Capability> {
    ResourceKind::ALL
        .into_iter()
        .map(|kind| {
            let resource = ResourceRef {
                kind,
                owner_id: Some(actor.id),
                id: None,
            };
            let actions = Action::ALL
                .into_iter()
                .filter(|action| can_perform(actor, *action, &resource).allowed)
                .collect();
            Capability { kind, actions }
        })
        .collect()
}
