//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor: the in-memory case store, the Prometheus
//! handle (when metrics are enabled) and the runtime configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use concierge_state::{Case, CaseStatus, Permissions, Stage, StageStatus, TransitionRecord};
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// -- Case Store ---------------------------------------------------------------

/// In-memory records keyed by UUID, shared across handlers.
///
/// Clones share the same map. Locking is synchronous (`parking_lot`) and
/// no guard outlives a method call, so nothing is held across `.await`.
#[derive(Debug)]
pub struct Store<T: Clone + Send + Sync> {
    pub(crate) records: Arc<RwLock<HashMap<Uuid, T>>>,
}

impl<T: Clone + Send + Sync> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<T: Clone + Send + Sync> Store<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store `value` under `id`, handing back whatever it replaced.
    pub fn insert(&self, id: Uuid, value: T) -> Option<T> {
        self.records.write().insert(id, value)
    }

    /// Snapshot of one record.
    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.records.read().get(id).cloned()
    }

    /// Snapshot of every record, in no particular order.
    pub fn list(&self) -> Vec<T> {
        self.records.read().values().cloned().collect()
    }

    /// Read, check and mutate one record as a single step.
    ///
    /// `f` runs while the write lock is held. Concurrent calls on the same
    /// record are therefore serialized: each sees the state the previous
    /// caller left behind, and a status validated inside `f` cannot go
    /// stale before it is written. `None` when `id` is unknown.
    pub fn try_update<R, E>(
        &self,
        id: &Uuid,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.records.write().get_mut(id).map(f)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Whether a read lock can be taken within `timeout`.
    pub fn is_available(&self, timeout: Duration) -> bool {
        self.records.try_read_for(timeout).is_some()
    }
}

impl<T: Clone + Send + Sync> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- API Record Types ---------------------------------------------------------

/// Case as returned by the API: the stored aggregate plus the permission
/// predicates evaluated at read time.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CaseRecord {
    pub id: Uuid,
    pub title: String,
    pub client_id: String,
    /// SUBMITTED, UNDER_REVIEW, AWAITING_CLIENT_APPROVAL, PAYMENT_PENDING,
    /// IN_PROGRESS or CLOSED.
    #[schema(value_type = String)]
    pub status: CaseStatus,
    /// PENDING, AWAITING_PAYMENT, PAYMENT_SUBMITTED, PAID, IN_PROGRESS or
    /// COMPLETE.
    #[schema(value_type = String)]
    pub stage_status: StageStatus,
    /// The stage currently being worked.
    #[schema(value_type = Object)]
    pub stage: Stage,
    #[schema(value_type = Vec<Object>)]
    pub previous_stages: Vec<Stage>,
    /// Audit trail of accepted status changes.
    #[schema(value_type = Vec<Object>)]
    pub transitions: Vec<TransitionRecord>,
    #[schema(value_type = Object)]
    pub permissions: Permissions,
    #[schema(value_type = String)]
    pub created_at: concierge_core::Timestamp,
    #[schema(value_type = String)]
    pub updated_at: concierge_core::Timestamp,
}

impl From<&Case> for CaseRecord {
    fn from(case: &Case) -> Self {
        Self {
            id: *case.id.as_uuid(),
            title: case.title.clone(),
            client_id: case.client_id.clone(),
            status: case.status,
            stage_status: case.stage.status,
            stage: case.stage.clone(),
            previous_stages: case.previous_stages.clone(),
            transitions: case.transitions.clone(),
            permissions: case.permissions(),
            created_at: case.created_at,
            updated_at: case.updated_at,
        }
    }
}

// -- Configuration ------------------------------------------------------------

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Runtime configuration, read from the environment.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Whether `/metrics` is mounted and transition counters are exported.
    pub metrics_enabled: bool,
    /// Tracing output format.
    pub log_format: LogFormat,
    /// Bearer token for the Prometheus scrape endpoint. `None` leaves it open.
    pub metrics_token: Option<String>,
}

impl AppConfig {
    /// Read `PORT`, `CONCIERGE_METRICS_ENABLED`, `LOG_FORMAT` and
    /// `CONCIERGE_METRICS_TOKEN`, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let port = lookup("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let metrics_enabled = lookup("CONCIERGE_METRICS_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(defaults.metrics_enabled);
        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let metrics_token = lookup("CONCIERGE_METRICS_TOKEN").filter(|t| !t.is_empty());
        Self {
            port,
            metrics_enabled,
            log_format,
            metrics_token,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("log_format", &self.log_format)
            .field(
                "metrics_token",
                &self.metrics_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            metrics_enabled: true,
            log_format: LogFormat::Text,
            metrics_token: None,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state accessible to all route handlers.
/// Clone-friendly via `Arc` internals.
#[derive(Clone)]
pub struct AppState {
    pub cases: Store<Case>,
    /// Render handle of the installed Prometheus recorder.
    pub prometheus: Option<PrometheusHandle>,
    pub config: AppConfig,
}

impl AppState {
    /// Empty state with default configuration and no metrics recorder.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// State with the given configuration and Prometheus handle.
    pub fn with_config(config: AppConfig, prometheus: Option<PrometheusHandle>) -> Self {
        Self {
            cases: Store::new(),
            prometheus,
            config,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cases", &self.cases.len())
            .field("prometheus", &self.prometheus.is_some())
            .field("config", &self.config)
            .finish()
    }
}
