//! # Case Aggregate
//!
//! The record that owns a case's status, its current stage and the audit
//! log of every accepted transition. All status writes go through
//! [`Case::transition_case`] / [`Case::transition_stage`] (or the raw-string
//! variants), which call the lifecycle validator before touching any field.
//! A rejected transition leaves the aggregate unchanged.
//!
//! Status fields are normalized when a record is deserialized, so a row
//! carrying a legacy or corrupt status loads as `SUBMITTED` / `PENDING`
//! instead of failing.

use serde::{Deserialize, Serialize};

use concierge_core::{CaseId, StageId, Timestamp};

use crate::case_status::{validate_case_transition, CaseStatus};
use crate::lifecycle::{self, IllegalTransition, StatusInput, TransitionKind};
use crate::stage_status::{validate_stage_transition, StageStatus};

// ─── Transition Evidence ─────────────────────────────────────────────

/// Context attached to a status change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvidence {
    /// Reason for the transition.
    pub reason: Option<String>,
    /// Actor who initiated the transition (user or service identifier).
    pub actor: Option<String>,
}

impl TransitionEvidence {
    /// Evidence carrying only a reason.
    pub fn because(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            actor: None,
        }
    }

    /// Attach the initiating actor.
    pub fn by(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// What a recorded transition changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionSubject {
    /// The case status.
    Case,
    /// The status of the stage with the given 1-based index.
    Stage {
        /// Stage position within the case.
        index: u32,
    },
}

impl TransitionSubject {
    /// The state machine the subject belongs to.
    pub fn kind(&self) -> TransitionKind {
        match self {
            Self::Case => TransitionKind::Case,
            Self::Stage { .. } => TransitionKind::Stage,
        }
    }
}

/// Record of an accepted status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Which status changed.
    pub subject: TransitionSubject,
    /// Canonical name before the change.
    pub from: String,
    /// Canonical name after the change.
    pub to: String,
    /// When the change was applied.
    pub timestamp: Timestamp,
    /// Reason supplied by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Actor supplied by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

// ─── Stage ───────────────────────────────────────────────────────────

/// One execution phase of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// Unique stage identifier.
    pub id: StageId,
    /// 1-based position within the case.
    pub index: u32,
    /// Human-readable stage name.
    pub name: String,
    /// Payment/execution status.
    #[serde(default = "initial_stage_status", deserialize_with = "lifecycle::deserialize_normalized")]
    pub status: StageStatus,
    /// Platform fee quoted for this stage, in minor units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_cents: Option<u64>,
}

impl Stage {
    /// Open a stage at `PENDING`.
    pub fn open(index: u32, name: impl Into<String>) -> Self {
        Self {
            id: StageId::new(),
            index,
            name: name.into(),
            status: StageStatus::INITIAL,
            fee_cents: None,
        }
    }
}

fn initial_case_status() -> CaseStatus {
    CaseStatus::INITIAL
}

fn initial_stage_status() -> StageStatus {
    StageStatus::INITIAL
}

// ─── Case ────────────────────────────────────────────────────────────

/// A client legal engagement with its lifecycle state and history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    /// Unique case identifier.
    pub id: CaseId,
    /// Short description supplied by the client.
    pub title: String,
    /// The submitting client.
    pub client_id: String,
    /// Macro lifecycle status.
    #[serde(default = "initial_case_status", deserialize_with = "lifecycle::deserialize_normalized")]
    pub status: CaseStatus,
    /// The stage currently being worked.
    pub stage: Stage,
    /// Stages already completed, oldest first.
    #[serde(default)]
    pub previous_stages: Vec<Stage>,
    /// When the case was created.
    pub created_at: Timestamp,
    /// When any field last changed.
    pub updated_at: Timestamp,
    /// Ordered log of accepted transitions.
    #[serde(default)]
    pub transitions: Vec<TransitionRecord>,
}

impl Case {
    /// Create a case at `SUBMITTED` with a single `PENDING` stage.
    pub fn new(title: impl Into<String>, client_id: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: CaseId::new(),
            title: title.into(),
            client_id: client_id.into(),
            status: CaseStatus::INITIAL,
            stage: Stage::open(1, "Stage 1"),
            previous_stages: Vec::new(),
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        }
    }

    /// Create a case from caller-supplied initial statuses.
    ///
    /// Values that are absent or not members of their enumeration fall
    /// back to `SUBMITTED` / `PENDING`.
    pub fn with_initial_status(
        title: impl Into<String>,
        client_id: impl Into<String>,
        status: Option<&str>,
        stage_status: Option<&str>,
    ) -> Self {
        let mut case = Self::new(title, client_id);
        case.status = lifecycle::normalize(status);
        case.stage.status = lifecycle::normalize(stage_status);
        case
    }

    /// Status of the current stage.
    pub fn stage_status(&self) -> StageStatus {
        self.stage.status
    }

    /// Number of stages opened so far, including the current one.
    pub fn stage_count(&self) -> usize {
        self.previous_stages.len() + 1
    }

    /// Whether the case has reached its terminal status.
    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move the case to `next` after validating the edge.
    ///
    /// A self-transition succeeds without recording anything.
    pub fn transition_case(
        &mut self,
        next: CaseStatus,
        evidence: &TransitionEvidence,
    ) -> Result<(), IllegalTransition> {
        self.status.validate_transition(next)?;
        self.write_case_status(next, evidence);
        Ok(())
    }

    /// Move the current stage to `next` after validating the edge.
    pub fn transition_stage(
        &mut self,
        next: StageStatus,
        evidence: &TransitionEvidence,
    ) -> Result<(), IllegalTransition> {
        self.stage.status.validate_transition(next)?;
        self.write_stage_status(next, evidence);
        Ok(())
    }

    /// Apply a case status change expressed as a raw string.
    ///
    /// An absent or empty `next` is a no-op. An unrecognized `next` is
    /// rejected with the raw value in the error.
    pub fn request_case_status(
        &mut self,
        next: Option<&str>,
        evidence: &TransitionEvidence,
    ) -> Result<(), IllegalTransition> {
        validate_case_transition(Some(self.status.as_str()), next)?;
        if let StatusInput::Known(status) = StatusInput::<CaseStatus>::parse(next) {
            self.write_case_status(status, evidence);
        }
        Ok(())
    }

    /// Apply a stage status change expressed as a raw string.
    pub fn request_stage_status(
        &mut self,
        next: Option<&str>,
        evidence: &TransitionEvidence,
    ) -> Result<(), IllegalTransition> {
        validate_stage_transition(Some(self.stage.status.as_str()), next)?;
        if let StatusInput::Known(status) = StatusInput::<StageStatus>::parse(next) {
            self.write_stage_status(status, evidence);
        }
        Ok(())
    }

    /// Write an already-validated case status.
    pub(crate) fn write_case_status(&mut self, next: CaseStatus, evidence: &TransitionEvidence) {
        if self.status == next {
            return;
        }
        self.record(TransitionSubject::Case, self.status.as_str(), next.as_str(), evidence);
        self.status = next;
    }

    /// Write an already-validated stage status.
    pub(crate) fn write_stage_status(&mut self, next: StageStatus, evidence: &TransitionEvidence) {
        if self.stage.status == next {
            return;
        }
        let subject = TransitionSubject::Stage {
            index: self.stage.index,
        };
        self.record(subject, self.stage.status.as_str(), next.as_str(), evidence);
        self.stage.status = next;
    }

    /// Bump `updated_at` for a change that is not a status transition.
    pub(crate) fn touch(&mut self) {
        self.updated_at = Timestamp::now();
    }

    fn record(
        &mut self,
        subject: TransitionSubject,
        from: &str,
        to: &str,
        evidence: &TransitionEvidence,
    ) {
        let now = Timestamp::now();
        self.transitions.push(TransitionRecord {
            subject,
            from: from.to_string(),
            to: to.to_string(),
            timestamp: now,
            reason: evidence.reason.clone(),
            actor: evidence.actor.clone(),
        });
        self.updated_at = now;
    }
}
