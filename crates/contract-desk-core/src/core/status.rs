// contract-desk-core/src/core/status.rs
// ============================================================================
// Module: Contract Status
// Description: Closed set of contract lifecycle statuses.
// Purpose: Give every contract exactly one well-defined current status.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`ContractStatus`] is a closed enum; unknown labels are rejected at the
//! parsing boundary. Transition rules live in the lifecycle runtime module.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::actor::UnknownLabel;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Lifecycle status of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    /// Being drafted by its owner.
    #[default]
    Draft,
    /// Submitted and waiting for a reviewer.
    PendingReview,
    /// Picked up by a reviewer.
    UnderReview,
    /// Approved by legal.
    Approved,
    /// Waiting for counterparty signature.
    PendingSignature,
    /// Signed by all parties.
    Signed,
    /// In force.
    Active,
    /// Ran past its end date.
    Expired,
    /// Ended early.
    Terminated,
    /// Rejected during review.
    Rejected,
}

impl ContractStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 10] = [
        Self::Draft,
        Self::PendingReview,
        Self::UnderReview,
        Self::Approved,
        Self::PendingSignature,
        Self::Signed,
        Self::Active,
        Self::Expired,
        Self::Terminated,
        Self::Rejected,
    ];

    /// Returns the stable label for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::PendingSignature => "pending_signature",
            Self::Signed => "signed",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Terminated => "terminated",
            Self::Rejected => "rejected",
        }
    }

    /// Returns true when no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Terminated | Self::Rejected)
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = UnknownLabel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| UnknownLabel::new("status", value))
    }
}
