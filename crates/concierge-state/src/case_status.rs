//! # Case Status State Machine
//!
//! The macro lifecycle of a client legal engagement.
//!
//! ```text
//! SUBMITTED                ──▶ UNDER_REVIEW | AWAITING_CLIENT_APPROVAL | PAYMENT_PENDING
//! UNDER_REVIEW             ──▶ AWAITING_CLIENT_APPROVAL | PAYMENT_PENDING
//! AWAITING_CLIENT_APPROVAL ──▶ PAYMENT_PENDING | UNDER_REVIEW
//! PAYMENT_PENDING          ──▶ IN_PROGRESS
//! IN_PROGRESS              ──▶ CLOSED
//! CLOSED                   (terminal)
//! ```
//!
//! `AWAITING_CLIENT_APPROVAL → UNDER_REVIEW` is the only back-edge: the
//! client rejects the proposed plan and sends it back for revision. No
//! other status may revert. `CLOSED` is terminal.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{
    self, IllegalTransition, LifecycleStatus, TransitionKind, UnknownStatus,
};

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    /// Client has submitted the case.
    Submitted,
    /// A case manager is reviewing the submission.
    UnderReview,
    /// A plan has been proposed and awaits the client's decision.
    AwaitingClientApproval,
    /// Plan accepted; the platform fee is due.
    PaymentPending,
    /// Work is under way.
    InProgress,
    /// Engagement finished (terminal).
    Closed,
}

impl CaseStatus {
    /// Every case status, in lifecycle order.
    pub const ALL: [CaseStatus; 6] = [
        Self::Submitted,
        Self::UnderReview,
        Self::AwaitingClientApproval,
        Self::PaymentPending,
        Self::InProgress,
        Self::Closed,
    ];

    /// Status of a newly persisted case and the normalization default.
    pub const INITIAL: CaseStatus = Self::Submitted;

    /// Canonical state name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::AwaitingClientApproval => "AWAITING_CLIENT_APPROVAL",
            Self::PaymentPending => "PAYMENT_PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Closed => "CLOSED",
        }
    }

    /// Parse a canonical state name. Returns `None` for anything else,
    /// including lowercase spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// Statuses reachable from this one in a single step.
    pub const fn allowed_next(&self) -> &'static [CaseStatus] {
        match self {
            Self::Submitted => &[
                Self::UnderReview,
                Self::AwaitingClientApproval,
                Self::PaymentPending,
            ],
            Self::UnderReview => &[Self::AwaitingClientApproval, Self::PaymentPending],
            Self::AwaitingClientApproval => &[Self::PaymentPending, Self::UnderReview],
            Self::PaymentPending => &[Self::InProgress],
            Self::InProgress => &[Self::Closed],
            Self::Closed => &[],
        }
    }

    /// Whether `next` may follow this status (self-transition included).
    pub fn can_transition_to(&self, next: CaseStatus) -> bool {
        self.permits(next)
    }

    /// Typed guard: `Ok` when `next` may follow this status.
    pub fn validate_transition(&self, next: CaseStatus) -> Result<(), IllegalTransition> {
        lifecycle::check_transition(*self, next)
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl LifecycleStatus for CaseStatus {
    const KIND: TransitionKind = TransitionKind::Case;
    const ALL: &'static [Self] = &CaseStatus::ALL;
    const INITIAL: Self = CaseStatus::INITIAL;

    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn successors(&self) -> &'static [Self] {
        self.allowed_next()
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaseStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownStatus {
            kind: TransitionKind::Case,
            value: s.to_string(),
        })
    }
}

/// The case transition graph as a constant `status → allowed next` table.
static CASE_TRANSITIONS: [(CaseStatus, &[CaseStatus]); 6] = [
    (CaseStatus::Submitted, CaseStatus::Submitted.allowed_next()),
    (CaseStatus::UnderReview, CaseStatus::UnderReview.allowed_next()),
    (
        CaseStatus::AwaitingClientApproval,
        CaseStatus::AwaitingClientApproval.allowed_next(),
    ),
    (CaseStatus::PaymentPending, CaseStatus::PaymentPending.allowed_next()),
    (CaseStatus::InProgress, CaseStatus::InProgress.allowed_next()),
    (CaseStatus::Closed, CaseStatus::Closed.allowed_next()),
];

/// The case transition graph, one row per status in lifecycle order.
pub fn case_transition_table() -> &'static [(CaseStatus, &'static [CaseStatus])] {
    &CASE_TRANSITIONS
}

/// Validate a proposed case status change between two raw stored values.
///
/// Succeeds when `next` is absent or empty, `current` is absent or empty,
/// `current == next`, or `next` is an allowed edge of `current`. Fails with
/// `Illegal case transition: <current> -> <next>` otherwise.
pub fn validate_case_transition(
    current: Option<&str>,
    next: Option<&str>,
) -> Result<(), IllegalTransition> {
    lifecycle::validate_transition::<CaseStatus>(current, next)
}

/// Coerce a stored value to a case status, defaulting to `SUBMITTED`.
pub fn normalize_case_status(value: Option<&str>) -> CaseStatus {
    lifecycle::normalize::<CaseStatus>(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_edge_to_payment_pending() {
        assert!(validate_case_transition(Some("SUBMITTED"), Some("PAYMENT_PENDING")).is_ok());
    }

    #[test]
    fn reverting_from_payment_pending_is_rejected() {
        let err = validate_case_transition(Some("PAYMENT_PENDING"), Some("SUBMITTED")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal case transition: PAYMENT_PENDING -> SUBMITTED"
        );
        assert_eq!(err.kind, TransitionKind::Case);
    }

    #[test]
    fn client_rejection_back_edge_is_allowed() {
        assert!(
            validate_case_transition(Some("AWAITING_CLIENT_APPROVAL"), Some("UNDER_REVIEW")).is_ok()
        );
    }

    #[test]
    fn back_edge_is_not_symmetric_elsewhere() {
        assert!(validate_case_transition(Some("UNDER_REVIEW"), Some("SUBMITTED")).is_err());
        assert!(validate_case_transition(Some("PAYMENT_PENDING"), Some("UNDER_REVIEW")).is_err());
        assert!(
            validate_case_transition(Some("PAYMENT_PENDING"), Some("AWAITING_CLIENT_APPROVAL"))
                .is_err()
        );
    }

    #[test]
    fn closed_is_terminal() {
        assert!(validate_case_transition(Some("CLOSED"), Some("SUBMITTED")).is_err());
        assert!(CaseStatus::Closed.is_terminal());
        assert!(CaseStatus::Closed.allowed_next().is_empty());
    }

    #[test]
    fn cannot_skip_payment() {
        assert!(validate_case_transition(Some("SUBMITTED"), Some("IN_PROGRESS")).is_err());
        assert!(validate_case_transition(Some("UNDER_REVIEW"), Some("IN_PROGRESS")).is_err());
    }

    #[test]
    fn empty_inputs_are_permitted() {
        assert!(validate_case_transition(Some("CLOSED"), None).is_ok());
        assert!(validate_case_transition(Some("CLOSED"), Some("")).is_ok());
        assert!(validate_case_transition(None, Some("CLOSED")).is_ok());
        assert!(validate_case_transition(Some(""), Some("SUBMITTED")).is_ok());
        assert!(validate_case_transition(None, None).is_ok());
    }

    #[test]
    fn normalize_keeps_members_and_defaults_others() {
        assert_eq!(normalize_case_status(Some("CLOSED")), CaseStatus::Closed);
        assert_eq!(normalize_case_status(Some("bogus")), CaseStatus::Submitted);
        assert_eq!(normalize_case_status(Some("")), CaseStatus::Submitted);
        assert_eq!(normalize_case_status(None), CaseStatus::Submitted);
        assert_eq!(normalize_case_status(Some("in_progress")), CaseStatus::Submitted);
    }

    #[test]
    fn table_matches_allowed_next() {
        let table = case_transition_table();
        assert_eq!(table.len(), CaseStatus::ALL.len());
        for ((status, edges), expected) in table.iter().zip(CaseStatus::ALL.iter()) {
            assert_eq!(status, expected);
            assert_eq!(*edges, status.allowed_next());
        }
    }

    #[test]
    fn display_and_from_str_agree() {
        for status in CaseStatus::ALL {
            assert_eq!(status.to_string().parse::<CaseStatus>().unwrap(), status);
        }
        assert!("OPEN".parse::<CaseStatus>().is_err());
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&CaseStatus::AwaitingClientApproval).unwrap();
        assert_eq!(json, "\"AWAITING_CLIENT_APPROVAL\"");
        for status in CaseStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }
}
