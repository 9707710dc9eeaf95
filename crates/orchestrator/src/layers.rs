//! Three-layer readiness tracking (context, service, state).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::errors::{OrchestratorError, OrchestratorResult};

/// A layer older than this is considered stale.
pub const DEFAULT_LAYER_STALENESS: Duration = Duration::from_secs(5 * 60);

/// Readiness categories tracked by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Context,
    Service,
    State,
}

impl LayerKind {
    pub const ALL: [LayerKind; 3] = [LayerKind::Context, LayerKind::Service, LayerKind::State];
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerKind::Context => write!(f, "context"),
            LayerKind::Service => write!(f, "service"),
            LayerKind::State => write!(f, "state"),
        }
    }
}

/// Status of a single layer.
///
/// Values are replaced, never edited in place; every transition goes through
/// a constructor that keeps `last_update` monotonically non-decreasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStatus {
    pub is_active: bool,
    pub last_update: DateTime<Utc>,
    pub error: Option<String>,
}

impl Default for LayerStatus {
    fn default() -> Self {
        Self::inactive()
    }
}

impl LayerStatus {
    pub fn inactive() -> Self {
        Self {
            is_active: false,
            last_update: Utc::now(),
            error: None,
        }
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        Utc::now().max(self.last_update)
    }

    /// Freshly active, error cleared
    pub fn activated(&self) -> Self {
        Self {
            is_active: true,
            last_update: self.next_timestamp(),
            error: None,
        }
    }

    /// Inactive with the given error recorded
    pub fn failed(&self, error: impl Into<String>) -> Self {
        Self {
            is_active: false,
            last_update: self.next_timestamp(),
            error: Some(error.into()),
        }
    }

    pub fn is_valid(&self, staleness: Duration) -> bool {
        self.is_valid_at(Utc::now(), staleness)
    }

    /// Active, error-free and updated less than `staleness` before `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, staleness: Duration) -> bool {
        if !self.is_active || self.error.is_some() {
            return false;
        }
        match (now - self.last_update).to_std() {
            Ok(age) => age < staleness,
            // Updated "in the future" relative to `now`: clock skew, still fresh
            Err(_) => true,
        }
    }

    pub fn report(&self, staleness: Duration) -> LayerReport {
        let valid = self.is_valid(staleness);
        let error = match (&self.error, valid) {
            (Some(err), _) => Some(err.clone()),
            (None, true) => None,
            (None, false) if !self.is_active => Some("layer inactive".to_string()),
            (None, false) => Some("layer stale".to_string()),
        };
        LayerReport { valid, error }
    }
}

/// Validity of one layer as carried by a layer alignment error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerReport {
    pub valid: bool,
    pub error: Option<String>,
}

impl LayerReport {
    pub fn new(valid: bool, error: Option<String>) -> Self {
        Self { valid, error }
    }
}

/// Immutable snapshot of the three layers, broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrchestrationState {
    pub context: LayerStatus,
    pub service: LayerStatus,
    pub state: LayerStatus,
}

impl OrchestrationState {
    pub fn layer(&self, kind: LayerKind) -> &LayerStatus {
        match kind {
            LayerKind::Context => &self.context,
            LayerKind::Service => &self.service,
            LayerKind::State => &self.state,
        }
    }

    pub(crate) fn layer_mut(&mut self, kind: LayerKind) -> &mut LayerStatus {
        match kind {
            LayerKind::Context => &mut self.context,
            LayerKind::Service => &mut self.service,
            LayerKind::State => &mut self.state,
        }
    }

    /// Replace one layer with `f(current)`.
    pub(crate) fn update(&mut self, kind: LayerKind, f: impl FnOnce(&LayerStatus) -> LayerStatus) {
        let slot = self.layer_mut(kind);
        *slot = f(&*slot);
    }

    pub fn all_valid(&self, staleness: Duration) -> bool {
        LayerKind::ALL
            .iter()
            .all(|kind| self.layer(*kind).is_valid(staleness))
    }

    /// Check the given layers, failing with a report covering every one of them.
    pub fn validate(&self, kinds: &[LayerKind], staleness: Duration) -> OrchestratorResult<()> {
        let layers: BTreeMap<LayerKind, LayerReport> = kinds
            .iter()
            .map(|kind| (*kind, self.layer(*kind).report(staleness)))
            .collect();

        if layers.values().all(|report| report.valid) {
            Ok(())
        } else {
            Err(OrchestratorError::LayerAlignment { layers })
        }
    }
}
