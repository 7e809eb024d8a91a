//! # Case Lifecycle API
//!
//! Case creation and reads, validated status changes, named workflow
//! actions and the permission predicates. Every write runs inside
//! [`Store::try_update`](crate::state::Store::try_update), so the status
//! read, the lifecycle check and the write happen under one lock.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use concierge_state::{
    Action, Case, CaseStatus, StageStatus, TransitionEvidence, TransitionKind,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::middleware::metrics::{record_action, record_transition, Outcome};
use crate::state::{AppState, CaseRecord};

/// Pagination parameters for list endpoints.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct PaginationParams {
    /// Maximum number of items to return (default: 100, max: 1000).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

impl PaginationParams {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 1000;

    fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }

    fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }
}

/// Request to open a case.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCaseRequest {
    pub title: String,
    pub client_id: String,
    /// Initial case status. Absent or unrecognized values become SUBMITTED.
    pub status: Option<String>,
    /// Initial stage status. Absent or unrecognized values become PENDING.
    pub stage_status: Option<String>,
    /// Name of the first stage (default "Stage 1").
    pub stage_name: Option<String>,
}

impl Validate for CreateCaseRequest {
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.title.len() > 255 {
            return Err("title must not exceed 255 characters".to_string());
        }
        if self.client_id.trim().is_empty() {
            return Err("client_id must not be empty".to_string());
        }
        Ok(())
    }
}

/// Request to change a case or stage status.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChangeRequest {
    /// Target status. Absent or empty means no change.
    pub status: Option<String>,
    pub reason: Option<String>,
    pub actor: Option<String>,
}

impl Validate for StatusChangeRequest {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl StatusChangeRequest {
    fn evidence(&self) -> TransitionEvidence {
        TransitionEvidence {
            reason: self.reason.clone(),
            actor: self.actor.clone(),
        }
    }
}

/// Optional parameters for a workflow action.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ActionRequest {
    /// Stage fee for `propose-plan`, in minor units.
    pub fee_cents: Option<u64>,
    /// Name of the next stage for `advance-stage`.
    pub stage_name: Option<String>,
    pub reason: Option<String>,
    pub actor: Option<String>,
}

/// Permission predicates for a case.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PermissionsResponse {
    #[schema(value_type = String)]
    pub case_status: CaseStatus,
    #[schema(value_type = String)]
    pub stage_status: StageStatus,
    pub can_upload_documents: bool,
    pub can_schedule_consultation: bool,
    pub is_payable: bool,
}

/// Build the cases router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/cases", get(list_cases).post(create_case))
        .route("/v1/cases/{id}", get(get_case))
        .route("/v1/cases/{id}/status", put(update_case_status))
        .route("/v1/cases/{id}/stage/status", put(update_stage_status))
        .route("/v1/cases/{id}/actions/{action}", post(perform_action))
        .route("/v1/cases/{id}/permissions", get(get_permissions))
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("case {id} not found"))
}

/// POST /v1/cases — Open a case.
#[utoipa::path(
    post,
    path = "/v1/cases",
    request_body = CreateCaseRequest,
    responses(
        (status = 201, description = "Case created", body = CaseRecord),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn create_case(
    State(state): State<AppState>,
    body: Result<Json<CreateCaseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CaseRecord>), AppError> {
    let req = extract_validated_json(body)?;
    let mut case = Case::with_initial_status(
        req.title,
        req.client_id,
        req.status.as_deref(),
        req.stage_status.as_deref(),
    );
    if let Some(name) = req.stage_name.filter(|n| !n.trim().is_empty()) {
        case.stage.name = name;
    }

    let id = *case.id.as_uuid();
    let record = CaseRecord::from(&case);
    state.cases.insert(id, case);
    tracing::info!(case_id = %id, status = %record.status, stage_status = %record.stage_status, "case created");

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/cases — List cases, oldest first.
#[utoipa::path(
    get,
    path = "/v1/cases",
    params(
        ("limit" = Option<usize>, Query, description = "Max items to return (default 100, max 1000)"),
        ("offset" = Option<usize>, Query, description = "Items to skip (default 0)"),
    ),
    responses(
        (status = 200, description = "List of cases", body = Vec<CaseRecord>),
    ),
    tag = "cases"
)]
pub(crate) async fn list_cases(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Json<Vec<CaseRecord>> {
    let mut all = state.cases.list();
    all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    let offset = pagination.effective_offset().min(all.len());
    let page = all
        .iter()
        .skip(offset)
        .take(pagination.effective_limit())
        .map(CaseRecord::from)
        .collect();
    Json(page)
}

/// GET /v1/cases/{id} — Get a case.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Case found", body = CaseRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn get_case(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CaseRecord>, AppError> {
    state
        .cases
        .get(&id)
        .map(|case| Json(CaseRecord::from(&case)))
        .ok_or_else(|| not_found(id))
}

/// PUT /v1/cases/{id}/status — Change the case status.
///
/// The stored status and the requested one are checked against the case
/// lifecycle graph; an illegal change is a 403 carrying the validator
/// message and nothing is written.
#[utoipa::path(
    put,
    path = "/v1/cases/{id}/status",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Status applied (or unchanged)", body = CaseRecord),
        (status = 403, description = "Illegal transition", body = crate::error::ErrorBody),
        (status = 404, description = "Case not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn update_case_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Json<CaseRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let evidence = req.evidence();
    let result = state
        .cases
        .try_update(&id, |case| {
            apply_write(case, |case| case.request_case_status(req.status.as_deref(), &evidence))
        })
        .ok_or_else(|| not_found(id))?;
    finish(Endpoint::Status(TransitionKind::Case), id, result)
}

/// PUT /v1/cases/{id}/stage/status — Change the current stage status.
#[utoipa::path(
    put,
    path = "/v1/cases/{id}/stage/status",
    params(("id" = Uuid, Path, description = "Case ID")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Status applied (or unchanged)", body = CaseRecord),
        (status = 403, description = "Illegal transition", body = crate::error::ErrorBody),
        (status = 404, description = "Case not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn update_stage_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Result<Json<CaseRecord>, AppError> {
    let req = extract_validated_json(body)?;
    let evidence = req.evidence();
    let result = state
        .cases
        .try_update(&id, |case| {
            apply_write(case, |case| case.request_stage_status(req.status.as_deref(), &evidence))
        })
        .ok_or_else(|| not_found(id))?;
    finish(Endpoint::Status(TransitionKind::Stage), id, result)
}

/// POST /v1/cases/{id}/actions/{action} — Run a workflow action.
///
/// `action` is one of `begin-review`, `propose-plan`, `reject-plan`,
/// `approve-plan`, `request-stage-payment`, `submit-payment`,
/// `capture-payment`, `start-stage`, `complete-stage`, `advance-stage`,
/// `close`. The body is optional.
#[utoipa::path(
    post,
    path = "/v1/cases/{id}/actions/{action}",
    params(
        ("id" = Uuid, Path, description = "Case ID"),
        ("action" = String, Path, description = "Workflow action name"),
    ),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Action applied", body = CaseRecord),
        (status = 403, description = "Illegal transition or action not permitted", body = crate::error::ErrorBody),
        (status = 404, description = "Case or action not found", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn perform_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(Uuid, String)>,
    body: Bytes,
) -> Result<Json<CaseRecord>, AppError> {
    let action =
        Action::from_name(&action).ok_or_else(|| AppError::NotFound(format!("unknown action {action:?}")))?;
    let req: ActionRequest = if body.is_empty() {
        ActionRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?
    };
    let evidence = TransitionEvidence {
        reason: req.reason.clone(),
        actor: req.actor.clone(),
    };

    let result = state
        .cases
        .try_update(&id, |case| {
            apply_write(case, |case| {
                case.perform(action, req.fee_cents, req.stage_name.as_deref(), &evidence)
            })
        })
        .ok_or_else(|| not_found(id))?;
    finish(Endpoint::Action(action), id, result)
}

/// GET /v1/cases/{id}/permissions — Evaluate the permission predicates.
#[utoipa::path(
    get,
    path = "/v1/cases/{id}/permissions",
    params(("id" = Uuid, Path, description = "Case ID")),
    responses(
        (status = 200, description = "Permissions", body = PermissionsResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "cases"
)]
pub(crate) async fn get_permissions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PermissionsResponse>, AppError> {
    let case = state.cases.get(&id).ok_or_else(|| not_found(id))?;
    let permissions = case.permissions();
    Ok(Json(PermissionsResponse {
        case_status: case.status,
        stage_status: case.stage.status,
        can_upload_documents: permissions.can_upload_documents,
        can_schedule_consultation: permissions.can_schedule_consultation,
        is_payable: permissions.is_payable,
    }))
}

/// Which endpoint produced a write.
#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Status(TransitionKind),
    Action(Action),
}

impl Endpoint {
    fn label(&self) -> &'static str {
        match self {
            Self::Status(kind) => kind.as_str(),
            Self::Action(action) => action.as_str(),
        }
    }
}

/// Result of a successful write.
#[derive(Debug)]
struct Applied {
    record: CaseRecord,
    /// Subjects of the transitions this write appended, in order.
    appended: Vec<TransitionKind>,
    /// Whether any field of the case differs from before the write.
    changed: bool,
}

/// Run `f` against the stored case and describe what it changed.
fn apply_write<E: Into<AppError>>(
    case: &mut Case,
    f: impl FnOnce(&mut Case) -> Result<(), E>,
) -> Result<Applied, AppError> {
    let before = case.clone();
    f(case).map_err(Into::into)?;
    let appended = case.transitions[before.transitions.len()..]
        .iter()
        .map(|t| t.subject.kind())
        .collect();
    Ok(Applied {
        record: CaseRecord::from(&*case),
        appended,
        changed: *case != before,
    })
}

fn outcome_of(changed: bool) -> Outcome {
    if changed {
        Outcome::Accepted
    } else {
        Outcome::Unchanged
    }
}

/// Count a write against `concierge_transitions_total` and, for
/// workflow actions, `concierge_actions_total`.
fn count(endpoint: Endpoint, result: &Result<Applied, AppError>) {
    match (endpoint, result) {
        (Endpoint::Status(kind), Ok(applied)) => {
            record_transition(kind, outcome_of(applied.changed));
        }
        (Endpoint::Action(action), Ok(applied)) => {
            for kind in &applied.appended {
                record_transition(*kind, Outcome::Accepted);
            }
            record_action(action, outcome_of(applied.changed));
        }
        (endpoint, Err(err)) => {
            if let AppError::IllegalTransition(illegal) = err {
                record_transition(illegal.kind, Outcome::Rejected);
            }
            let refused = matches!(err, AppError::IllegalTransition(_) | AppError::Forbidden(_));
            if let (Endpoint::Action(action), true) = (endpoint, refused) {
                record_action(action, Outcome::Rejected);
            }
        }
    }
}

/// Count and log the outcome of a write, then unwrap the record.
fn finish(
    endpoint: Endpoint,
    id: Uuid,
    result: Result<Applied, AppError>,
) -> Result<Json<CaseRecord>, AppError> {
    count(endpoint, &result);
    let kind = endpoint.label();
    match result {
        Ok(applied) => {
            let record = applied.record;
            tracing::info!(
                case_id = %id,
                kind,
                outcome = outcome_of(applied.changed).as_str(),
                status = %record.status,
                stage_status = %record.stage_status,
                "write applied"
            );
            Ok(Json(record))
        }
        Err(err) => {
            if matches!(err, AppError::IllegalTransition(_) | AppError::Forbidden(_)) {
                tracing::warn!(case_id = %id, kind, error = %err, "write rejected");
            }
            Err(err)
        }
    }
}
