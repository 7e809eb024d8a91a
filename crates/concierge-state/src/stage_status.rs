//! # Stage Status State Machine
//!
//! The payment/execution substate of the stage a case is currently in.
//!
//! ```text
//! PENDING           ──▶ AWAITING_PAYMENT | PAYMENT_SUBMITTED | PAID | IN_PROGRESS
//! AWAITING_PAYMENT  ──▶ PAYMENT_SUBMITTED
//! PAYMENT_SUBMITTED ──▶ PAID
//! PAID              ──▶ IN_PROGRESS
//! IN_PROGRESS       ──▶ COMPLETE
//! COMPLETE          (terminal)
//! ```
//!
//! `PENDING` fans out to every later point except `COMPLETE`, covering
//! stages whose payment was pre-collected or waived. Every other status has
//! a single successor and there are no cycles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::lifecycle::{
    self, IllegalTransition, LifecycleStatus, TransitionKind, UnknownStatus,
};

/// Payment/execution status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    /// Stage defined but no payment requested yet.
    Pending,
    /// Fee requested from the client.
    AwaitingPayment,
    /// Client reports payment; awaiting capture.
    PaymentSubmitted,
    /// Payment captured.
    Paid,
    /// Practitioner is working the stage.
    InProgress,
    /// Stage delivered (terminal).
    Complete,
}

impl StageStatus {
    /// Every stage status, in lifecycle order.
    pub const ALL: [StageStatus; 6] = [
        Self::Pending,
        Self::AwaitingPayment,
        Self::PaymentSubmitted,
        Self::Paid,
        Self::InProgress,
        Self::Complete,
    ];

    /// Status of a newly opened stage and the normalization default.
    pub const INITIAL: StageStatus = Self::Pending;

    /// Canonical state name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::AwaitingPayment => "AWAITING_PAYMENT",
            Self::PaymentSubmitted => "PAYMENT_SUBMITTED",
            Self::Paid => "PAID",
            Self::InProgress => "IN_PROGRESS",
            Self::Complete => "COMPLETE",
        }
    }

    /// Parse a canonical state name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.as_str() == name)
    }

    /// Statuses reachable from this one in a single step.
    pub const fn allowed_next(&self) -> &'static [StageStatus] {
        match self {
            Self::Pending => &[
                Self::AwaitingPayment,
                Self::PaymentSubmitted,
                Self::Paid,
                Self::InProgress,
            ],
            Self::AwaitingPayment => &[Self::PaymentSubmitted],
            Self::PaymentSubmitted => &[Self::Paid],
            Self::Paid => &[Self::InProgress],
            Self::InProgress => &[Self::Complete],
            Self::Complete => &[],
        }
    }

    /// Whether `next` may follow this status (self-transition included).
    pub fn can_transition_to(&self, next: StageStatus) -> bool {
        self.permits(next)
    }

    /// Typed guard: `Ok` when `next` may follow this status.
    pub fn validate_transition(&self, next: StageStatus) -> Result<(), IllegalTransition> {
        lifecycle::check_transition(*self, next)
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }

    /// Whether the stage fee has been captured.
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Paid | Self::InProgress | Self::Complete)
    }
}

impl LifecycleStatus for StageStatus {
    const KIND: TransitionKind = TransitionKind::Stage;
    const ALL: &'static [Self] = &StageStatus::ALL;
    const INITIAL: Self = StageStatus::INITIAL;

    fn name(&self) -> &'static str {
        self.as_str()
    }

    fn successors(&self) -> &'static [Self] {
        self.allowed_next()
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownStatus {
            kind: TransitionKind::Stage,
            value: s.to_string(),
        })
    }
}

static STAGE_TRANSITIONS: [(StageStatus, &[StageStatus]); 6] = [
    (StageStatus::Pending, StageStatus::Pending.allowed_next()),
    (StageStatus::AwaitingPayment, StageStatus::AwaitingPayment.allowed_next()),
    (StageStatus::PaymentSubmitted, StageStatus::PaymentSubmitted.allowed_next()),
    (StageStatus::Paid, StageStatus::Paid.allowed_next()),
    (StageStatus::InProgress, StageStatus::InProgress.allowed_next()),
    (StageStatus::Complete, StageStatus::Complete.allowed_next()),
];

/// The stage transition graph, one row per status in lifecycle order.
pub fn stage_transition_table() -> &'static [(StageStatus, &'static [StageStatus])] {
    &STAGE_TRANSITIONS
}

/// Validate a proposed stage status change between two raw stored values.
///
/// Same contract as [`crate::validate_case_transition`]; the failure
/// message is `Illegal stage transition: <current> -> <next>`.
pub fn validate_stage_transition(
    current: Option<&str>,
    next: Option<&str>,
) -> Result<(), IllegalTransition> {
    lifecycle::validate_transition::<StageStatus>(current, next)
}

/// Coerce a stored value to a stage status, defaulting to `PENDING`.
pub fn normalize_stage_status(value: Option<&str>) -> StageStatus {
    lifecycle::normalize::<StageStatus>(value)
}
