//! Error taxonomy for the orchestration core.

use common::{ErrorSeverity, HasSeverity};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::layers::{LayerKind, LayerReport};

/// Errors produced by registries, integrations and the orchestrator.
///
/// `Clone` so one memoized initialization outcome can be handed to every
/// concurrent caller.
#[derive(Debug, Clone, Error)]
pub enum OrchestratorError {
    /// Malformed or missing integration identity or configuration
    #[error("Validation failed for {subject}: {reason}")]
    Validation { subject: String, reason: String },

    /// Liveness or health probe failure
    #[error("Connection to {target} failed: {reason}")]
    Connection {
        target: String,
        reason: String,
        transient: bool,
    },

    /// One or more readiness layers are invalid
    #[error("Layer misalignment: {}", describe_layers(.layers))]
    LayerAlignment {
        layers: BTreeMap<LayerKind, LayerReport>,
    },

    /// Unknown domain or missing domain-scoped credential
    #[error("Domain error ({domain}): {reason}")]
    Domain { domain: String, reason: String },

    #[error("Failed to register service for domain {domain}: {reason}")]
    DomainRegistration { domain: String, reason: String },

    /// Downstream execute failure, with the query kept for diagnostics
    #[error("Query processing failed in domain {domain}: {reason}")]
    QueryProcessing {
        query: String,
        domain: String,
        reason: String,
    },

    #[error("Integration {0} not found")]
    NotFound(String),

    #[error("{0} used before initialization")]
    NotInitialized(String),

    #[error("Critical services not initialized: {0}")]
    CriticalServicesNotInitialized(String),

    #[error("Initialization timed out after {0:?}")]
    InitializationTimeout(Duration),

    #[error("Orchestrator has been disposed")]
    Disposed,
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

fn describe_layers(layers: &BTreeMap<LayerKind, LayerReport>) -> String {
    layers
        .iter()
        .map(|(kind, report)| match (&report.error, report.valid) {
            (_, true) => format!("{}=ok", kind),
            (Some(err), false) => format!("{}=invalid ({})", kind, err),
            (None, false) => format!("{}=invalid", kind),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl OrchestratorError {
    pub fn validation(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchestratorError::Validation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    pub fn connection(target: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchestratorError::Connection {
            target: target.into(),
            reason: reason.into(),
            transient: true,
        }
    }

    pub fn domain(domain: impl Into<String>, reason: impl Into<String>) -> Self {
        OrchestratorError::Domain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            OrchestratorError::Validation { .. } => "VALIDATION_ERROR",
            OrchestratorError::Connection { .. } => "CONNECTION_ERROR",
            OrchestratorError::LayerAlignment { .. } => "LAYER_ALIGNMENT_ERROR",
            OrchestratorError::Domain { .. } => "DOMAIN_ERROR",
            OrchestratorError::DomainRegistration { .. } => "DOMAIN_REGISTRATION_ERROR",
            OrchestratorError::QueryProcessing { .. } => "QUERY_PROCESSING_ERROR",
            OrchestratorError::NotFound(_) => "NOT_FOUND",
            OrchestratorError::NotInitialized(_) => "NOT_INITIALIZED",
            OrchestratorError::CriticalServicesNotInitialized(_) => "CRITICAL_SERVICES_DOWN",
            OrchestratorError::InitializationTimeout(_) => "INITIALIZATION_TIMEOUT",
            OrchestratorError::Disposed => "DISPOSED",
        }
    }
}

impl HasSeverity for OrchestratorError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            OrchestratorError::Validation { .. } => ErrorSeverity::Fatal,
            OrchestratorError::NotFound(_) => ErrorSeverity::Fatal,
            OrchestratorError::CriticalServicesNotInitialized(_) => ErrorSeverity::Fatal,

            OrchestratorError::Connection { transient: true, .. } => ErrorSeverity::Recoverable,
            OrchestratorError::Connection { transient: false, .. } => ErrorSeverity::Fatal,
            OrchestratorError::Domain { .. } => ErrorSeverity::Recoverable,
            OrchestratorError::DomainRegistration { .. } => ErrorSeverity::Recoverable,
            OrchestratorError::QueryProcessing { .. } => ErrorSeverity::Recoverable,
            OrchestratorError::NotInitialized(_) => ErrorSeverity::Recoverable,
            OrchestratorError::InitializationTimeout(_) => ErrorSeverity::Recoverable,

            // Startup runs best effort; a misaligned layer is a degraded mode, not an alert
            OrchestratorError::LayerAlignment { .. } => ErrorSeverity::Informational,
            OrchestratorError::Disposed => ErrorSeverity::Informational,
        }
    }
}
