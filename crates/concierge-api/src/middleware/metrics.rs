//! # Prometheus Metrics
//!
//! Counters are emitted through the `metrics` facade and exported by the
//! `metrics-exporter-prometheus` recorder installed in the binary. Without
//! an installed recorder every counter is a no-op, which is what handler
//! tests run against.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use concierge_state::{Action, TransitionKind};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Status change attempts, labelled by `kind` (`case` or `stage`) and
/// `outcome`.
pub const TRANSITIONS_TOTAL: &str = "concierge_transitions_total";

/// Workflow action attempts, labelled by `action` and `outcome`.
pub const ACTIONS_TOTAL: &str = "concierge_actions_total";

/// Handled HTTP requests, labelled by `method` and `status`.
pub const HTTP_REQUESTS_TOTAL: &str = "concierge_http_requests_total";

/// Result of a status change attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The change was written.
    Accepted,
    /// Nothing about the case changed.
    Unchanged,
    /// The validator or a workflow guard refused the change.
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Unchanged => "unchanged",
            Self::Rejected => "rejected",
        }
    }
}

/// Install the global Prometheus recorder and return its render handle.
///
/// Fails if a recorder is already installed in this process.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Count one status change attempt.
pub fn record_transition(kind: TransitionKind, outcome: Outcome) {
    metrics::counter!(TRANSITIONS_TOTAL, "kind" => kind.as_str(), "outcome" => outcome.as_str())
        .increment(1);
}

/// Count one workflow action attempt.
pub fn record_action(action: Action, outcome: Outcome) {
    metrics::counter!(ACTIONS_TOTAL, "action" => action.as_str(), "outcome" => outcome.as_str())
        .increment(1);
}

/// Middleware that counts requests by method and response status.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().as_str().to_string();

    let response = next.run(request).await;

    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);

    response
}
