//! # Workflow Mutation Paths
//!
//! Named operations on a [`Case`] for each business event that moves a
//! status: admin review, plan proposal and approval, payment, stage
//! execution, escrow advance and closure. Every operation validates each
//! status it changes before writing any of them, so a rejected operation
//! leaves the case untouched.
//!
//! The permission predicates ([`can_upload_documents`],
//! [`can_schedule_consultation`], [`is_payable`]) gate the read-side
//! features on normalized status values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::case::{Case, Stage, TransitionEvidence};
use crate::case_status::CaseStatus;
use crate::lifecycle::IllegalTransition;
use crate::stage_status::StageStatus;

// ─── Actions ─────────────────────────────────────────────────────────

/// A named workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Case manager picks up the submission.
    BeginReview,
    /// Case manager proposes a plan and quotes the stage fee.
    ProposePlan,
    /// Client sends the proposed plan back for revision.
    RejectPlan,
    /// Plan accepted; the first stage fee becomes due.
    ApprovePlan,
    /// Request the fee for a later stage of an active case.
    RequestStagePayment,
    /// Client reports having paid.
    SubmitPayment,
    /// Payment captured by the platform.
    CapturePayment,
    /// Practitioner starts work on the stage.
    StartStage,
    /// Practitioner delivers the stage.
    CompleteStage,
    /// Open the next stage after the current one completes.
    AdvanceStage,
    /// Close the engagement.
    Close,
}

impl Action {
    /// Every action.
    pub const ALL: [Action; 11] = [
        Self::BeginReview,
        Self::ProposePlan,
        Self::RejectPlan,
        Self::ApprovePlan,
        Self::RequestStagePayment,
        Self::SubmitPayment,
        Self::CapturePayment,
        Self::StartStage,
        Self::CompleteStage,
        Self::AdvanceStage,
        Self::Close,
    ];

    /// Kebab-case name used in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeginReview => "begin-review",
            Self::ProposePlan => "propose-plan",
            Self::RejectPlan => "reject-plan",
            Self::ApprovePlan => "approve-plan",
            Self::RequestStagePayment => "request-stage-payment",
            Self::SubmitPayment => "submit-payment",
            Self::CapturePayment => "capture-payment",
            Self::StartStage => "start-stage",
            Self::CompleteStage => "complete-stage",
            Self::AdvanceStage => "advance-stage",
            Self::Close => "close",
        }
    }

    /// Look up an action by its kebab-case name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == name)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by workflow operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// A status change is not an edge of its lifecycle graph.
    #[error(transparent)]
    IllegalTransition(#[from] IllegalTransition),

    /// The operation requires the current stage to be delivered first.
    #[error("stage {index} is {status}, not COMPLETE")]
    StageNotComplete {
        /// Index of the current stage.
        index: u32,
        /// Its status.
        status: StageStatus,
    },

    /// The operation does not apply in the case's current position.
    #[error("{action} is not permitted while case is {case_status} and stage is {stage_status}")]
    NotPermitted {
        /// The rejected operation.
        action: Action,
        /// Case status at the time of the attempt.
        case_status: CaseStatus,
        /// Current stage status at the time of the attempt.
        stage_status: StageStatus,
    },
}

// ─── Permission predicates ───────────────────────────────────────────

/// Whether the client may upload documents. Never true before payment.
pub fn can_upload_documents(case: CaseStatus, stage: StageStatus) -> bool {
    case != CaseStatus::Closed && matches!(stage, StageStatus::Paid | StageStatus::InProgress)
}

/// Whether a video consultation may be scheduled.
pub fn can_schedule_consultation(case: CaseStatus, stage: StageStatus) -> bool {
    case == CaseStatus::InProgress && matches!(stage, StageStatus::Paid | StageStatus::InProgress)
}

/// Whether the current stage fee can be paid.
///
/// The first stage is paid while the case is `PAYMENT_PENDING`; later
/// stages are paid while it is `IN_PROGRESS`.
pub fn is_payable(case: CaseStatus, stage: StageStatus) -> bool {
    matches!(case, CaseStatus::PaymentPending | CaseStatus::InProgress)
        && matches!(
            stage,
            StageStatus::Pending | StageStatus::AwaitingPayment | StageStatus::PaymentSubmitted
        )
}

/// Snapshot of the permission predicates for one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// See [`can_upload_documents`].
    pub can_upload_documents: bool,
    /// See [`can_schedule_consultation`].
    pub can_schedule_consultation: bool,
    /// See [`is_payable`].
    pub is_payable: bool,
}

impl Permissions {
    /// Evaluate every predicate for a status pair.
    pub fn evaluate(case: CaseStatus, stage: StageStatus) -> Self {
        Self {
            can_upload_documents: can_upload_documents(case, stage),
            can_schedule_consultation: can_schedule_consultation(case, stage),
            is_payable: is_payable(case, stage),
        }
    }
}

// ─── Operations ──────────────────────────────────────────────────────

impl Case {
    /// Current permission predicates.
    pub fn permissions(&self) -> Permissions {
        Permissions::evaluate(self.status, self.stage.status)
    }

    /// Case manager picks up the submission (→ `UNDER_REVIEW`).
    pub fn begin_review(&mut self, evidence: &TransitionEvidence) -> Result<(), WorkflowError> {
        self.apply(Some(CaseStatus::UnderReview), None, evidence)
    }

    /// Propose a plan to the client (→ `AWAITING_CLIENT_APPROVAL`) and
    /// quote the current stage fee.
    pub fn propose_plan(
        &mut self,
        fee_cents: u64,
        evidence: &TransitionEvidence,
    ) -> Result<(), WorkflowError> {
        self.status.validate_transition(CaseStatus::AwaitingClientApproval)?;
        if self.stage.fee_cents != Some(fee_cents) {
            self.stage.fee_cents = Some(fee_cents);
            self.touch();
        }
        self.write_case_status(CaseStatus::AwaitingClientApproval, evidence);
        Ok(())
    }

    /// Client sends the plan back (`AWAITING_CLIENT_APPROVAL → UNDER_REVIEW`).
    pub fn reject_plan(&mut self, evidence: &TransitionEvidence) -> Result<(), WorkflowError> {
        self.require(Action::RejectPlan, self.status == CaseStatus::AwaitingClientApproval)?;
        self.apply(Some(CaseStatus::UnderReview), None, evidence)
    }

    /// Admin approval or client acceptance: the case awaits payment and
    /// the current stage fee is requested.
    pub fn approve_plan(&mut self, evidence: &TransitionEvidence) -> Result<(), WorkflowError> {
        self.apply(
            Some(CaseStatus::PaymentPending),
            Some(StageStatus::AwaitingPayment),
            evidence,
        )
    }

    /// Request the fee for a later stage (stage → `AWAITING_PAYMENT`).
    /// Only applies once the case is `IN_PROGRESS`.
    pub fn request_stage_payment(
        &mut self,
        evidence: &TransitionEvidence,
    ) -> Result<(), WorkflowError> {
        self.require(Action::RequestStagePayment, self.status == CaseStatus::InProgress)?;
        self.apply(None, Some(StageStatus::AwaitingPayment), evidence)
    }

    /// Client reports payment (stage → `PAYMENT_SUBMITTED`).
    pub fn submit_payment(&mut self, evidence: &TransitionEvidence) -> Result<(), WorkflowError> {
        self.require(Action::SubmitPayment, is_payable(self.status, self.stage.status))?;
        self.apply(None, Some(StageStatus::PaymentSubmitted), evidence)
    }

    /// Payment captured: the stage is `PAID` and the case `IN_PROGRESS`.
    ///
    /// For a later stage the case is already `IN_PROGRESS` and only the
    /// stage moves.
    pub fn capture_payment(&mut self, evidence: &TransitionEvidence) -> Result<(), WorkflowError> {
        self.apply(
            Some(CaseStatus::InProgress),
            Some(StageStatus::Paid),
            evidence,
        )
    }

    /// Practitioner starts the stage (stage → `IN_PROGRESS`).
    pub fn start_stage(&mut self, evidence: &TransitionEvidence) -> Result<(), WorkflowError> {
        self.require(Action::StartStage, self.status == CaseStatus::InProgress)?;
        self.apply(None, Some(StageStatus::InProgress), evidence)
    }

    /// Practitioner delivers the stage (stage → `COMPLETE`).
    pub fn complete_stage(&mut self, evidence: &TransitionEvidence) -> Result<(), WorkflowError> {
        self.apply(None, Some(StageStatus::Complete), evidence)
    }

    /// Escrow advance: archive the completed stage and open the next one
    /// at `PENDING`. Returns the new stage index.
    pub fn advance_stage(&mut self, name: impl Into<String>) -> Result<u32, WorkflowError> {
        self.require_stage_complete()?;
        self.require(Action::AdvanceStage, self.status == CaseStatus::InProgress)?;
        let next = Stage::open(self.stage.index + 1, name);
        let index = next.index;
        let done = std::mem::replace(&mut self.stage, next);
        self.previous_stages.push(done);
        self.touch();
        Ok(index)
    }

    /// Close the engagement (→ `CLOSED`). The current stage must be
    /// `COMPLETE`.
    pub fn close(&mut self, evidence: &TransitionEvidence) -> Result<(), WorkflowError> {
        self.require_stage_complete()?;
        self.apply(Some(CaseStatus::Closed), None, evidence)
    }

    /// Run a named action. `fee_cents` and `stage_name` are used by
    /// [`Action::ProposePlan`] and [`Action::AdvanceStage`] respectively.
    pub fn perform(
        &mut self,
        action: Action,
        fee_cents: Option<u64>,
        stage_name: Option<&str>,
        evidence: &TransitionEvidence,
    ) -> Result<(), WorkflowError> {
        match action {
            Action::BeginReview => self.begin_review(evidence),
            Action::ProposePlan => {
                let fee = fee_cents.or(self.stage.fee_cents).unwrap_or(0);
                self.propose_plan(fee, evidence)
            }
            Action::RejectPlan => self.reject_plan(evidence),
            Action::ApprovePlan => self.approve_plan(evidence),
            Action::RequestStagePayment => self.request_stage_payment(evidence),
            Action::SubmitPayment => self.submit_payment(evidence),
            Action::CapturePayment => self.capture_payment(evidence),
            Action::StartStage => self.start_stage(evidence),
            Action::CompleteStage => self.complete_stage(evidence),
            Action::AdvanceStage => {
                let name = match stage_name {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => format!("Stage {}", self.stage.index + 1),
                };
                self.advance_stage(name).map(|_| ())
            }
            Action::Close => self.close(evidence),
        }
    }

    /// Validate every requested change, then write them all.
    fn apply(
        &mut self,
        case: Option<CaseStatus>,
        stage: Option<StageStatus>,
        evidence: &TransitionEvidence,
    ) -> Result<(), WorkflowError> {
        if let Some(next) = case {
            self.status.validate_transition(next)?;
        }
        if let Some(next) = stage {
            self.stage.status.validate_transition(next)?;
        }
        if let Some(next) = stage {
            self.write_stage_status(next, evidence);
        }
        if let Some(next) = case {
            self.write_case_status(next, evidence);
        }
        Ok(())
    }

    fn require(&self, action: Action, allowed: bool) -> Result<(), WorkflowError> {
        if allowed {
            Ok(())
        } else {
            Err(WorkflowError::NotPermitted {
                action,
                case_status: self.status,
                stage_status: self.stage.status,
            })
        }
    }

    fn require_stage_complete(&self) -> Result<(), WorkflowError> {
        if self.stage.status == StageStatus::Complete {
            Ok(())
        } else {
            Err(WorkflowError::StageNotComplete {
                index: self.stage.index,
                status: self.stage.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::Timestamp;

    fn ev(reason: &str) -> TransitionEvidence {
        TransitionEvidence::because(reason)
    }

    fn paid_case() -> Case {
        let mut case = Case::new("Company formation", "client-42");
        case.begin_review(&ev("assigned")).unwrap();
        case.propose_plan(15_000, &ev("plan")).unwrap();
        case.approve_plan(&ev("accepted")).unwrap();
        case.submit_payment(&ev("card")).unwrap();
        case.capture_payment(&ev("captured")).unwrap();
        case
    }

    #[test]
    fn happy_path_through_two_stages() {
        let mut case = paid_case();
        assert_eq!(case.status, CaseStatus::InProgress);
        assert_eq!(case.stage_status(), StageStatus::Paid);
        assert_eq!(case.stage.fee_cents, Some(15_000));

        case.start_stage(&ev("work")).unwrap();
        case.complete_stage(&ev("delivered")).unwrap();
        let index = case.advance_stage("Filing").unwrap();
        assert_eq!(index, 2);
        assert_eq!(case.stage_status(), StageStatus::Pending);
        assert_eq!(case.previous_stages.len(), 1);
        assert_eq!(case.previous_stages[0].status, StageStatus::Complete);

        case.request_stage_payment(&ev("stage 2 fee")).unwrap();
        case.submit_payment(&ev("bank transfer")).unwrap();
        case.capture_payment(&ev("captured")).unwrap();
        assert_eq!(case.status, CaseStatus::InProgress);
        case.start_stage(&ev("work")).unwrap();
        case.complete_stage(&ev("delivered")).unwrap();
        case.close(&ev("done")).unwrap();

        assert!(case.is_closed());
        assert_eq!(case.stage_count(), 2);
    }

    #[test]
    fn transitions_are_logged_in_order() {
        let case = paid_case();
        let pairs: Vec<(&str, &str)> = case
            .transitions
            .iter()
            .map(|t| (t.from.as_str(), t.to.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("SUBMITTED", "UNDER_REVIEW"),
                ("UNDER_REVIEW", "AWAITING_CLIENT_APPROVAL"),
                ("PENDING", "AWAITING_PAYMENT"),
                ("AWAITING_CLIENT_APPROVAL", "PAYMENT_PENDING"),
                ("AWAITING_PAYMENT", "PAYMENT_SUBMITTED"),
                ("PAYMENT_SUBMITTED", "PAID"),
                ("PAYMENT_PENDING", "IN_PROGRESS"),
            ]
        );
    }

    #[test]
    fn rejected_operation_leaves_case_unchanged() {
        let mut case = Case::new("Visa", "client-1");
        let before = case.clone();

        // PENDING -> PAID is a legal stage edge, but SUBMITTED -> IN_PROGRESS
        // is not, so neither half is written.
        let err = case.capture_payment(&ev("captured")).unwrap_err();
        assert!(matches!(err, WorkflowError::IllegalTransition(_)));
        assert_eq!(case, before);
    }

    #[test]
    fn capture_requires_submitted_payment() {
        let mut case = Case::new("Visa", "client-1");
        case.begin_review(&ev("r")).unwrap();
        case.approve_plan(&ev("a")).unwrap();
        let err = case.capture_payment(&ev("captured")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal stage transition: AWAITING_PAYMENT -> PAID"
        );
        assert_eq!(case.status, CaseStatus::PaymentPending);
    }

    #[test]
    fn reject_plan_returns_to_review() {
        let mut case = Case::new("Lease", "client-2");
        case.propose_plan(9_000, &ev("plan")).unwrap();
        case.reject_plan(&ev("too expensive")).unwrap();
        assert_eq!(case.status, CaseStatus::UnderReview);
        case.propose_plan(7_000, &ev("revised")).unwrap();
        assert_eq!(case.stage.fee_cents, Some(7_000));
    }

    #[test]
    fn requote_while_awaiting_approval_bumps_updated_at() {
        let mut case = Case::new("Lease", "client-2");
        case.propose_plan(100, &ev("plan")).unwrap();
        let logged = case.transitions.len();
        let stale = Timestamp::parse("2020-01-01T00:00:00Z").unwrap();

        case.updated_at = stale;
        case.propose_plan(100, &ev("same quote")).unwrap();
        assert_eq!(case.updated_at, stale);

        case.propose_plan(200, &ev("requote")).unwrap();
        assert_eq!(case.stage.fee_cents, Some(200));
        assert!(case.updated_at > stale);
        assert_eq!(case.status, CaseStatus::AwaitingClientApproval);
        assert_eq!(case.transitions.len(), logged);
    }

    #[test]
    fn reject_plan_outside_approval_is_not_permitted() {
        let mut case = Case::new("Lease", "client-2");
        let err = case.reject_plan(&ev("no")).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::NotPermitted {
                action: Action::RejectPlan,
                case_status: CaseStatus::Submitted,
                stage_status: StageStatus::Pending,
            }
        );
    }

    #[test]
    fn propose_plan_after_payment_is_illegal_and_keeps_fee() {
        let mut case = paid_case();
        let err = case.propose_plan(1, &ev("reprice")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Illegal case transition: IN_PROGRESS -> AWAITING_CLIENT_APPROVAL"
        );
        assert_eq!(case.stage.fee_cents, Some(15_000));
    }

    #[test]
    fn close_requires_complete_stage() {
        let mut case = paid_case();
        let err = case.close(&ev("early")).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::StageNotComplete {
                index: 1,
                status: StageStatus::Paid,
            }
        );
        assert_eq!(err.to_string(), "stage 1 is PAID, not COMPLETE");
    }

    #[test]
    fn advance_requires_complete_stage() {
        let mut case = paid_case();
        assert!(matches!(
            case.advance_stage("Next"),
            Err(WorkflowError::StageNotComplete { .. })
        ));
        assert_eq!(case.stage_count(), 1);
    }

    #[test]
    fn submit_payment_needs_payable_case() {
        let mut case = Case::new("Will", "client-3");
        let err = case.submit_payment(&ev("early")).unwrap_err();
        assert!(matches!(err, WorkflowError::NotPermitted { .. }));
        assert!(err.to_string().starts_with("submit-payment is not permitted"));
    }

    #[test]
    fn start_stage_waits_for_active_case() {
        let mut case = Case::new("Will", "client-3");
        assert!(matches!(
            case.start_stage(&ev("eager")),
            Err(WorkflowError::NotPermitted { .. })
        ));
    }

    #[test]
    fn documents_never_uploadable_before_payment() {
        for case in CaseStatus::ALL {
            for stage in [
                StageStatus::Pending,
                StageStatus::AwaitingPayment,
                StageStatus::PaymentSubmitted,
            ] {
                assert!(!can_upload_documents(case, stage), "{case}/{stage}");
            }
        }
        assert!(can_upload_documents(CaseStatus::InProgress, StageStatus::Paid));
        assert!(!can_upload_documents(CaseStatus::Closed, StageStatus::InProgress));
    }

    #[test]
    fn consultation_requires_active_case_and_paid_stage() {
        assert!(can_schedule_consultation(CaseStatus::InProgress, StageStatus::InProgress));
        assert!(!can_schedule_consultation(CaseStatus::PaymentPending, StageStatus::Paid));
        assert!(!can_schedule_consultation(CaseStatus::InProgress, StageStatus::Complete));
    }

    #[test]
    fn payable_positions() {
        assert!(is_payable(CaseStatus::PaymentPending, StageStatus::AwaitingPayment));
        assert!(is_payable(CaseStatus::InProgress, StageStatus::Pending));
        assert!(!is_payable(CaseStatus::UnderReview, StageStatus::AwaitingPayment));
        assert!(!is_payable(CaseStatus::InProgress, StageStatus::Paid));
    }

    #[test]
    fn perform_dispatches_by_name() {
        let mut case = Case::new("Probate", "client-9");
        for name in ["begin-review", "propose-plan", "approve-plan"] {
            let action = Action::from_name(name).unwrap();
            case.perform(action, Some(5_000), None, &ev(name)).unwrap();
        }
        assert_eq!(case.status, CaseStatus::PaymentPending);
        assert_eq!(case.stage_status(), StageStatus::AwaitingPayment);
        assert!(Action::from_name("refund").is_none());
    }

    #[test]
    fn perform_advance_defaults_stage_name() {
        let mut case = paid_case();
        case.start_stage(&ev("w")).unwrap();
        case.complete_stage(&ev("d")).unwrap();
        case.perform(Action::AdvanceStage, None, None, &ev("next")).unwrap();
        assert_eq!(case.stage.name, "Stage 2");
    }

    #[test]
    fn action_names_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_name(action.as_str()), Some(action));
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }
}
