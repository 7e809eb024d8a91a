//! # Lifecycle Validation Primitives
//!
//! Shared machinery for the case and stage state machines: the
//! [`LifecycleStatus`] contract both status enums implement, boundary
//! parsing of raw stored strings into [`StatusInput`], and the generic
//! validator and normalizer that [`crate::case_status`] and
//! [`crate::stage_status`] expose under their own names.
//!
//! ## Validation rule
//!
//! A proposed `(current, next)` pair is accepted when any of these hold:
//!
//! 1. `next` is absent or empty (no change requested);
//! 2. `current` is absent or empty;
//! 3. `current == next` (idempotent write);
//! 4. `next` is an allowed outbound edge of `current`.
//!
//! Everything else is an [`IllegalTransition`]. An unrecognized `current`
//! has no outbound edges, and an unrecognized `next` is never an edge
//! target. The validator never coerces; only [`normalize`] does.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ─── Transition Kind ─────────────────────────────────────────────────

/// Which state machine a transition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// The macro lifecycle of the engagement.
    Case,
    /// The payment/execution substate of the current stage.
    Stage,
}

impl TransitionKind {
    /// Lowercase name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Case => "case",
            Self::Stage => "stage",
        }
    }
}

impl std::fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A requested status change that is not an edge of the lifecycle graph.
///
/// `current` and `next` hold the values exactly as the caller supplied
/// them, so an unrecognized stored value is reported verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("Illegal {kind} transition: {current} -> {next}")]
pub struct IllegalTransition {
    /// The state machine that rejected the change.
    pub kind: TransitionKind,
    /// Status before the attempted change.
    pub current: String,
    /// Attempted target status.
    pub next: String,
}

impl IllegalTransition {
    /// Build the error for a rejected `(current, next)` pair.
    pub fn new(kind: TransitionKind, current: impl Into<String>, next: impl Into<String>) -> Self {
        Self {
            kind,
            current: current.into(),
            next: next.into(),
        }
    }
}

/// A raw string that is not a member of the status enumeration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} status: {value:?}")]
pub struct UnknownStatus {
    /// The state machine the value was parsed for.
    pub kind: TransitionKind,
    /// The rejected input.
    pub value: String,
}

// ─── LifecycleStatus ─────────────────────────────────────────────────

/// Contract shared by the case and stage status enums.
///
/// Implementors are closed, payload-free enums whose outbound edges are a
/// `&'static` table. The default methods derive everything else from
/// [`LifecycleStatus::successors`].
pub trait LifecycleStatus:
    Copy + Eq + Hash + Debug + Display + Send + Sync + 'static
{
    /// Which state machine this enum models.
    const KIND: TransitionKind;

    /// Every member, in lifecycle order.
    const ALL: &'static [Self];

    /// Status assigned on creation and used by normalization.
    const INITIAL: Self;

    /// Canonical SCREAMING_SNAKE_CASE name.
    fn name(&self) -> &'static str;

    /// Statuses reachable in one step (excluding the self-transition).
    fn successors(&self) -> &'static [Self];

    /// Look up a member by its canonical name. Matching is exact.
    fn parse_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.name() == name)
    }

    /// Whether `next` may follow `self`. The self-transition is allowed.
    fn permits(&self, next: Self) -> bool {
        *self == next || self.successors().contains(&next)
    }
}

// ─── Boundary parsing ────────────────────────────────────────────────

/// A raw status value classified at the system boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusInput<S> {
    /// Absent or empty: no value supplied.
    Absent,
    /// A member of the enumeration.
    Known(S),
    /// Present but not a member (corrupt or legacy value).
    Unrecognized(String),
}

impl<S: LifecycleStatus> StatusInput<S> {
    /// Classify a raw optional string. Only the empty string counts as
    /// absent; whitespace and case variants are unrecognized.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") => Self::Absent,
            Some(value) => match S::parse_name(value) {
                Some(status) => Self::Known(status),
                None => Self::Unrecognized(value.to_string()),
            },
        }
    }

    /// The value as supplied (empty for `Absent`).
    pub fn raw(&self) -> &str {
        match self {
            Self::Absent => "",
            Self::Known(status) => status.name(),
            Self::Unrecognized(value) => value,
        }
    }

    /// Whether a value was supplied.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Collapse to a member, resolving absent or unrecognized values to
    /// [`LifecycleStatus::INITIAL`].
    pub fn normalize(&self) -> S {
        match self {
            Self::Known(status) => *status,
            Self::Absent | Self::Unrecognized(_) => S::INITIAL,
        }
    }
}

// ─── Validation & normalization ──────────────────────────────────────

/// Validate a proposed change between two raw stored values.
///
/// Pure and side-effect free. The caller must hold a serialized read of
/// `current` (see `concierge_api::state::Store::try_update`) and must not
/// persist `next` unless this returns `Ok`.
pub fn validate_transition<S: LifecycleStatus>(
    current: Option<&str>,
    next: Option<&str>,
) -> Result<(), IllegalTransition> {
    let next = StatusInput::<S>::parse(next);
    if next.is_absent() {
        return Ok(());
    }
    let current = StatusInput::<S>::parse(current);
    if current.is_absent() || current.raw() == next.raw() {
        return Ok(());
    }
    if let (StatusInput::Known(from), StatusInput::Known(to)) = (&current, &next) {
        if from.successors().contains(to) {
            return Ok(());
        }
    }
    Err(IllegalTransition::new(S::KIND, current.raw(), next.raw()))
}

/// Validate a change between two members. Total over the closed enum.
pub fn check_transition<S: LifecycleStatus>(current: S, next: S) -> Result<(), IllegalTransition> {
    if current.permits(next) {
        Ok(())
    } else {
        Err(IllegalTransition::new(S::KIND, current.name(), next.name()))
    }
}

/// Coerce a raw stored value to a member. Never fails.
pub fn normalize<S: LifecycleStatus>(value: Option<&str>) -> S {
    StatusInput::<S>::parse(value).normalize()
}

/// Serde adapter that normalizes a stored status on read.
///
/// Accepts a string, `null`, or a missing field; any value that is not a
/// member deserializes as [`LifecycleStatus::INITIAL`].
pub fn deserialize_normalized<'de, D, S>(deserializer: D) -> Result<S, D::Error>
where
    D: Deserializer<'de>,
    S: LifecycleStatus,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(normalize::<S>(raw.as_deref()))
}
