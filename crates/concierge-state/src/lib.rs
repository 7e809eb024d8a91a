//! # concierge-state — Case & Stage Lifecycle
//!
//! The lifecycle engine of the concierge legal-services platform. Two
//! independent state machines govern every status write:
//!
//! - **Case** (`case_status.rs`): `SUBMITTED → UNDER_REVIEW →
//!   AWAITING_CLIENT_APPROVAL → PAYMENT_PENDING → IN_PROGRESS → CLOSED`,
//!   with a single back-edge for a client rejecting the proposed plan.
//!
//! - **Stage** (`stage_status.rs`): `PENDING → AWAITING_PAYMENT →
//!   PAYMENT_SUBMITTED → PAID → IN_PROGRESS → COMPLETE`, acyclic.
//!
//! `validate_case_transition` / `validate_stage_transition` are pure
//! predicates over raw stored values; `normalize_case_status` /
//! `normalize_stage_status` coerce legacy or corrupt values on read.
//!
//! On top of the validators, [`Case`] is the aggregate every mutation path
//! writes through, and [`workflow`] names the business operations (plan
//! approval, payment capture, escrow advance, closure) as methods that
//! validate every status they touch before writing any.

pub mod case;
pub mod case_status;
pub mod lifecycle;
pub mod stage_status;
pub mod workflow;

// ─── Lifecycle re-exports ───────────────────────────────────────────

pub use lifecycle::{IllegalTransition, LifecycleStatus, StatusInput, TransitionKind, UnknownStatus};

pub use case_status::{
    case_transition_table, normalize_case_status, validate_case_transition, CaseStatus,
};

pub use stage_status::{
    normalize_stage_status, stage_transition_table, validate_stage_transition, StageStatus,
};

// ─── Aggregate re-exports ───────────────────────────────────────────

pub use case::{Case, Stage, TransitionEvidence, TransitionRecord, TransitionSubject};

pub use workflow::{
    can_schedule_consultation, can_upload_documents, is_payable, Action, Permissions,
    WorkflowError,
};
