//! Admission decisions
//!
//! Every expected outcome of a claim or unclaim attempt is a typed variant
//! here. Only backend faults travel the error channel; a full post or a
//! closed window is a decision, not a failure.

use serde::Serialize;

/// Outcome of a claim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClaimDecision {
    /// A slot was consumed; `remaining` slots are left after this admission.
    Admitted { remaining: u32 },
    /// The referenced post does not exist.
    NotFound,
    /// Claim attempted before the window opened.
    NotYetOpen,
    /// Claim attempted after the window closed.
    Closed,
    /// The user already holds a live claim on this post.
    AlreadyClaimed,
    /// All slots are taken.
    QuotaFull,
}

impl ClaimDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// Outcome of an unclaim attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UnclaimDecision {
    /// The claim was removed; `remaining` slots are free after the release.
    Released { remaining: u32 },
    /// The referenced post does not exist.
    NotFound,
    /// The user holds no live claim on this post.
    NotClaimed,
}

impl UnclaimDecision {
    pub fn is_released(&self) -> bool {
        matches!(self, Self::Released { .. })
    }
}
