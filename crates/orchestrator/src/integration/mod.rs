//! Service integration contract.
//!
//! A service integration is a pluggable backend adapter (language model,
//! domain specialist, ...) with a three-state lifecycle:
//! `Initializing -> Ready` on a successful handshake, `Initializing -> Error`
//! otherwise. Registries never retry an integration in `Error`; callers
//! re-run `initialize` explicitly.

pub mod language;
pub mod registry;
pub mod specialist;

pub use language::LanguageIntegration;
pub use registry::IntegrationRegistry;
pub use specialist::{SpecialistIntegration, SpecialistProfile};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::config::IntegrationConfig;
use crate::errors::{OrchestratorError, OrchestratorResult};

/// Lifecycle status of an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Initializing,
    Ready,
    Error,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Initializing => write!(f, "INITIALIZING"),
            ServiceStatus::Ready => write!(f, "READY"),
            ServiceStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// One request to an integration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    pub message: String,
    /// Opaque caller context, passed through to the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl QueryParams {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            domain: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Metadata attached to every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            fields: HashMap::new(),
        }
    }
}

impl ResponseMetadata {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Uniform result of every query or execute call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ResponseMetadata,
}

impl ApiResponse {
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata: ResponseMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata = self.metadata.with(key, value);
        self
    }
}

/// Capability contract every backend adapter implements.
///
/// `execute` reports recoverable failures as `ApiResponse { success: false }`;
/// an `Err` is reserved for misuse such as executing before `initialize`.
#[async_trait]
pub trait ServiceIntegration: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn status(&self) -> ServiceStatus;

    fn config(&self) -> &IntegrationConfig;

    /// Force the status to `Error` (registration rejection).
    fn mark_error(&self);

    /// Perform the network handshake. Leaves the status `Ready` or `Error`.
    async fn initialize(&self) -> OrchestratorResult<()>;

    /// Side-effect free health probe, safe to call concurrently.
    async fn validate(&self) -> bool;

    async fn execute(&self, params: QueryParams) -> OrchestratorResult<ApiResponse>;
}

/// Map a non-success HTTP status to a connection error. Rate limits,
/// timeouts and server errors are transient.
pub(crate) fn status_error(target: &str, status: reqwest::StatusCode) -> OrchestratorError {
    let transient = status.is_server_error()
        || status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT;
    OrchestratorError::Connection {
        target: target.to_string(),
        reason: format!("HTTP {}", status),
        transient,
    }
}

pub(crate) fn request_error(target: &str, err: reqwest::Error) -> OrchestratorError {
    OrchestratorError::Connection {
        target: target.to_string(),
        reason: err.to_string(),
        transient: err.is_timeout() || err.is_connect(),
    }
}

impl fmt::Debug for dyn ServiceIntegration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceIntegration")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}
