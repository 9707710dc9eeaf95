//! Domain-specialist backend (crypto analysis).
//!
//! Handshake: `POST {endpoint}/initialize` with the user's profile and an
//! `X-API-Key` header; only `202 Accepted` counts as ready. Queries go to
//! `GET {endpoint}/service?input=...` and must answer with a `response` field.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::{request_error, status_error, ApiResponse, QueryParams, ServiceIntegration, ServiceStatus};
use crate::config::IntegrationConfig;
use crate::errors::{OrchestratorError, OrchestratorResult};

pub const SPECIALIST_ID: &str = "metis";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialistUser {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Organization")]
    pub organization: String,
    pub interests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub currency: String,
    pub holding: f64,
}

/// Initialization payload describing the wallet being analysed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecialistProfile {
    pub public_keys: Vec<String>,
    pub user_profile: SpecialistUser,
    pub holdings: Vec<Holding>,
    pub transaction_history: Vec<Value>,
}

impl SpecialistProfile {
    pub fn with_public_key(mut self, key: impl Into<String>) -> Self {
        self.public_keys.push(key.into());
        self
    }

    pub fn with_holding(mut self, currency: impl Into<String>, holding: f64) -> Self {
        self.holdings.push(Holding {
            currency: currency.into(),
            holding,
        });
        self
    }
}

#[derive(Debug, Deserialize)]
struct ServiceReply {
    #[serde(default)]
    response: Option<String>,
}

pub struct SpecialistIntegration {
    id: String,
    name: String,
    description: String,
    config: IntegrationConfig,
    profile: SpecialistProfile,
    status: RwLock<ServiceStatus>,
    client: Client,
}

impl SpecialistIntegration {
    pub fn new(config: IntegrationConfig) -> OrchestratorResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| {
                OrchestratorError::validation("Metis AI Service", format!("HTTP client: {}", e))
            })?;

        Ok(Self {
            id: SPECIALIST_ID.to_string(),
            name: "Metis AI Service".to_string(),
            description: "Crypto Analyst Domain AI Service".to_string(),
            config,
            profile: SpecialistProfile::default(),
            status: RwLock::new(ServiceStatus::Initializing),
            client,
        })
    }

    pub fn with_profile(mut self, profile: SpecialistProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn set_status(&self, status: ServiceStatus) {
        *self.status.write() = status;
    }

    async fn query(&self, input: &str) -> OrchestratorResult<ServiceReply> {
        let url = format!("{}/service", self.config.endpoint());
        let response = self
            .client
            .get(&url)
            .query(&[("input", input)])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| request_error(&self.id, e))?;

        if !response.status().is_success() {
            return Err(status_error(&self.id, response.status()));
        }

        response
            .json::<ServiceReply>()
            .await
            .map_err(|e| request_error(&self.id, e))
    }
}

#[async_trait]
impl ServiceIntegration for SpecialistIntegration {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn status(&self) -> ServiceStatus {
        *self.status.read()
    }

    fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    fn mark_error(&self) {
        self.set_status(ServiceStatus::Error);
    }

    async fn initialize(&self) -> OrchestratorResult<()> {
        let Some(key) = self.config.api_key() else {
            self.set_status(ServiceStatus::Error);
            return Err(OrchestratorError::validation(&self.name, "API key not provided"));
        };

        let url = format!("{}/initialize", self.config.endpoint());
        let result = self
            .client
            .post(&url)
            .header("X-API-Key", key)
            .json(&self.profile)
            .send()
            .await;

        match result {
            Ok(response) if response.status() == StatusCode::ACCEPTED => {
                self.set_status(ServiceStatus::Ready);
                info!(integration_id = %self.id, "specialist initialized");
                Ok(())
            }
            Ok(response) => {
                self.set_status(ServiceStatus::Error);
                warn!(integration_id = %self.id, status = %response.status(), "specialist rejected initialization");
                Err(status_error(&self.id, response.status()))
            }
            Err(e) => {
                self.set_status(ServiceStatus::Error);
                error!(integration_id = %self.id, "specialist initialization failed: {}", e);
                Err(request_error(&self.id, e))
            }
        }
    }

    async fn validate(&self) -> bool {
        let valid = self.config.api_key().is_some();
        if !valid {
            debug!(integration_id = %self.id, "no API key configured");
        }
        valid
    }

    async fn execute(&self, params: QueryParams) -> OrchestratorResult<ApiResponse> {
        let domain = params
            .domain
            .clone()
            .unwrap_or_else(|| "crypto_analyst".to_string());

        match self.status() {
            ServiceStatus::Initializing => {
                return Err(OrchestratorError::NotInitialized(self.name.clone()))
            }
            ServiceStatus::Error => {
                return Ok(ApiResponse::failure(format!("{} is unavailable", self.name))
                    .with_metadata("domain", domain))
            }
            ServiceStatus::Ready => {}
        }

        let input = params.message.trim();
        if input.is_empty() {
            return Ok(ApiResponse::failure("Invalid input: message is required")
                .with_metadata("domain", domain));
        }

        match self.query(input).await {
            Ok(ServiceReply {
                response: Some(text),
            }) if !text.is_empty() => Ok(ApiResponse::ok(text).with_metadata("domain", domain)),
            Ok(_) => {
                warn!(integration_id = %self.id, "reply without a response field");
                Ok(ApiResponse::failure("No valid response received from specialist")
                    .with_metadata("domain", domain))
            }
            Err(e) => {
                error!(integration_id = %self.id, "query failed: {}", e);
                Ok(ApiResponse::failure(e.to_string()).with_metadata("domain", domain))
            }
        }
    }
}
