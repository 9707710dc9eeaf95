use anyhow::{anyhow, Result};
use common::TimeoutConfigBase;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

use crate::domain::Domain;

pub const DEFAULT_LANGUAGE_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_LANGUAGE_MODEL: &str = "gpt-4";
pub const DEFAULT_SPECIALIST_ENDPOINT: &str = "https://metisapi-8501e3beedcf.herokuapp.com";

/// Connection settings handed to one service integration at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout: Duration,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
    pub retry_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_connect_timeout() -> Duration {
    TimeoutConfigBase::default().connection_timeout()
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        let timeouts = TimeoutConfigBase::default();
        Self {
            api_key: None,
            endpoint: DEFAULT_LANGUAGE_ENDPOINT.to_string(),
            timeout: timeouts.operation_timeout(),
            connect_timeout: timeouts.connection_timeout(),
            retry_attempts: 3,
            model: Some(DEFAULT_LANGUAGE_MODEL.to_string()),
        }
    }
}

impl IntegrationConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: None,
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Key with blank values treated as absent
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.trim_end_matches('/')
    }
}

/// Domain-scoped credentials, looked up when switching into a domain that
/// needs a specialist backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomainCredentials(HashMap<Domain, String>);

impl DomainCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, domain: Domain, credential: impl Into<String>) -> Self {
        self.insert(domain, credential);
        self
    }

    pub fn insert(&mut self, domain: Domain, credential: impl Into<String>) {
        self.0.insert(domain, credential.into());
    }

    pub fn get(&self, domain: Domain) -> Option<&str> {
        self.0
            .get(&domain)
            .map(String::as_str)
            .filter(|c| !c.trim().is_empty())
    }
}

/// Orchestrator settings. Everything is injected; the orchestrator itself
/// never reads the process environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub init_timeout: Duration,
    pub layer_staleness: Duration,
    pub alignment_poll_interval: Duration,
    pub status_poll_interval: Duration,
    pub liveness_timeout: Duration,
    pub recommendation_limit: usize,
    pub language: IntegrationConfig,
    pub specialist_endpoint: String,
    pub domain_credentials: DomainCredentials,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        let timeouts = TimeoutConfigBase::default();
        Self {
            init_timeout: timeouts.operation_timeout(),
            layer_staleness: crate::layers::DEFAULT_LAYER_STALENESS,
            alignment_poll_interval: Duration::from_secs(60),
            status_poll_interval: Duration::from_secs(5 * 60),
            liveness_timeout: timeouts.health_check_timeout(),
            recommendation_limit: 4,
            language: IntegrationConfig::default(),
            specialist_endpoint: DEFAULT_SPECIALIST_ENDPOINT.to_string(),
            domain_credentials: DomainCredentials::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(key) = lookup("OPENAI_API_KEY") {
            config.language.api_key = Some(key);
        }
        if let Some(endpoint) = lookup("OPENAI_API_ENDPOINT") {
            config.language.endpoint = endpoint;
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            config.language.model = Some(model);
        }
        if let Some(url) = lookup("METIS_API_URL") {
            config.specialist_endpoint = url;
        }
        if let Some(key) = lookup("METIS_API_KEY") {
            config.domain_credentials.insert(Domain::CryptoAnalyst, key);
        }
        if let Some(raw) = lookup("AIGENT_INIT_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|e| anyhow!("Invalid AIGENT_INIT_TIMEOUT_SECS '{}': {}", raw, e))?;
            config.init_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_language(mut self, language: IntegrationConfig) -> Self {
        self.language = language;
        self
    }

    pub fn with_domain_credential(mut self, domain: Domain, credential: impl Into<String>) -> Self {
        self.domain_credentials.insert(domain, credential);
        self
    }

    pub fn with_specialist_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.specialist_endpoint = endpoint.into();
        self
    }
}
