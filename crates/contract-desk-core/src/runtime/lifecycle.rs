// contract-desk-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Contract Lifecycle
// Description: Contract status transition table and transition decisions.
// Purpose: Accept or reject status changes before any persistence effect.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! [`next_status`] is pure and synchronous. Checks run in a fixed order and
//! the first failing check decides the rejection:
//!
//! 1. current status is terminal: `terminal_status`
//! 2. requested equals current: `no_change`
//! 3. pair missing from the table: `invalid_transition`
//! 4. target is approved/rejected and role is not legal/admin:
//!    `role_not_authorized`
//!
//! An accepted transition returns a [`TransitionDirective`] describing the
//! side effects the store must execute atomically with the status write.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::ContractStatus;
use crate::core::Role;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Audit action label recorded for status changes.
pub const STATUS_CHANGE_ACTION: &str = "status_change";

// ============================================================================
// SECTION: Transition Table
// ============================================================================

/// Returns the statuses directly reachable from `status`.
#[must_use]
pub const fn allowed_targets(status: ContractStatus) -> &'static [ContractStatus] {
    match status {
        ContractStatus::Draft => &[ContractStatus::PendingReview],
        ContractStatus::PendingReview => &[ContractStatus::UnderReview, ContractStatus::Rejected],
        ContractStatus::UnderReview => &[ContractStatus::Approved, ContractStatus::Rejected],
        ContractStatus::Approved => &[ContractStatus::PendingSignature],
        ContractStatus::PendingSignature => &[ContractStatus::Signed],
        ContractStatus::Signed => &[ContractStatus::Active],
        ContractStatus::Active => &[ContractStatus::Expired, ContractStatus::Terminated],
        ContractStatus::Expired | ContractStatus::Terminated | ContractStatus::Rejected => &[],
    }
}

/// Returns true when entering `target` requires a reviewer role.
const fn requires_reviewer(target: ContractStatus) -> bool {
    matches!(target, ContractStatus::Approved | ContractStatus::Rejected)
}

/// Returns true for roles allowed to approve or reject.
const fn is_reviewer(role: Role) -> bool {
    matches!(role, Role::Legal | Role::Admin)
}

// ============================================================================
// SECTION: Decisions
// ============================================================================

/// Audit entry required by an accepted transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionAudit {
    /// Audit action label (`status_change`).
    pub action: String,
    /// Status before the transition.
    pub from: ContractStatus,
    /// Status after the transition.
    pub to: ContractStatus,
}

/// Side effects an accepted transition requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDirective {
    /// Whether a version snapshot must be written with the status change.
    pub snapshot_required: bool,
    /// Audit entry to append with the status change.
    pub audit_entry: TransitionAudit,
}

/// Reason a transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionRejection {
    /// Pair is not in the transition table.
    #[error("transition is not in the lifecycle table")]
    InvalidTransition,
    /// Current status admits no transitions.
    #[error("contract is in a terminal status")]
    TerminalStatus,
    /// Requested status equals the current status.
    #[error("requested status equals current status")]
    NoChange,
    /// Role may not approve or reject.
    #[error("role is not authorized for this transition")]
    RoleNotAuthorized,
}

impl TransitionRejection {
    /// Returns the stable label for this rejection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidTransition => "invalid_transition",
            Self::TerminalStatus => "terminal_status",
            Self::NoChange => "no_change",
            Self::RoleNotAuthorized => "role_not_authorized",
        }
    }
}

/// Wire form of a transition decision: `{ok: true, directive}` or
/// `{ok: false, reason}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionReport {
    /// Whether the transition is accepted.
    pub ok: bool,
    /// Directive for accepted transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directive: Option<TransitionDirective>,
    /// Reason for rejected transitions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<TransitionRejection>,
}

impl From<Result<TransitionDirective, TransitionRejection>> for TransitionReport {
    fn from(result: Result<TransitionDirective, TransitionRejection>) -> Self {
        match result {
            Ok(directive) => Self {
                ok: true,
                directive: Some(directive),
                reason: None,
            },
            Err(reason) => Self {
                ok: false,
                directive: None,
                reason: Some(reason),
            },
        }
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Decides whether `role` may move a contract from `current` to `requested`.
///
/// # Errors
///
/// Returns the first failing [`TransitionRejection`] in evaluation order.
pub fn next_status(
    current: ContractStatus,
    requested: ContractStatus,
    role: Role,
) -> Result<TransitionDirective, TransitionRejection> {
    if current.is_terminal() {
        return Err(TransitionRejection::TerminalStatus);
    }
    if requested == current {
        return Err(TransitionRejection::NoChange);
    }
    if !allowed_targets(current).contains(&requested) {
        return Err(TransitionRejection::InvalidTransition);
    }
    if requires_reviewer(requested) && !is_reviewer(role) {
        return Err(TransitionRejection::RoleNotAuthorized);
    }
    Ok(TransitionDirective {
        snapshot_required: true,
        audit_entry: TransitionAudit {
            action: STATUS_CHANGE_ACTION.to_string(),
            from: current,
            to: requested,
        },
    })
}

/// Lists the statuses `role` may move a contract to from `current`.
#[must_use]
pub fn reachable_statuses(current: ContractStatus, role: Role) -> Vec<ContractStatus> {
    allowed_targets(current)
        .iter()
        .copied()
        .filter(|target| next_status(current, *target, role).is_ok())
        .collect()
}
