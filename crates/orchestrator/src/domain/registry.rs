//! Domain to specialist-backend bindings.
//!
//! Admission runs three gates in order: shape checks on the service
//! descriptor, an optional per-domain validator, then a bounded liveness
//! probe. Only then is the backend built and initialized.

use async_trait::async_trait;
use common::TimeoutConfigBase;
use parking_lot::RwLock;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::Domain;
use crate::config::{IntegrationConfig, OrchestratorConfig};
use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::integration::{
    ApiResponse, QueryParams, ServiceIntegration, ServiceStatus, SpecialistIntegration,
};

/// Descriptor of a backend offered for a domain
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainService {
    pub name: String,
    pub url: String,
    pub key: String,
}

impl DomainService {
    pub fn new(name: impl Into<String>, url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Debug for DomainService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainService")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Domain-specific admission rule
pub trait DomainValidator: Send + Sync {
    fn check(&self, service: &DomainService) -> Result<(), String>;
}

/// Credential shape rule for a particular backend
#[derive(Debug, Clone)]
pub struct CredentialFormat {
    pub min_key_len: usize,
    pub key_prefix: Option<String>,
    pub require_https: bool,
}

impl CredentialFormat {
    /// Rule used for the crypto analyst backend
    pub fn specialist() -> Self {
        Self {
            min_key_len: 8,
            key_prefix: None,
            require_https: true,
        }
    }
}

impl DomainValidator for CredentialFormat {
    fn check(&self, service: &DomainService) -> Result<(), String> {
        let key = service.key.trim();
        if key.len() < self.min_key_len {
            return Err(format!("credential shorter than {} characters", self.min_key_len));
        }
        if let Some(prefix) = &self.key_prefix {
            if !key.starts_with(prefix.as_str()) {
                return Err(format!("credential must start with '{}'", prefix));
            }
        }
        if self.require_https && !service.url.starts_with("https://") {
            return Err("endpoint must use https".to_string());
        }
        Ok(())
    }
}

/// Reachability check run before a backend is admitted
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, url: &Url) -> OrchestratorResult<()>;
}

/// `GET {url}/health`, any 2xx is alive
pub struct HttpLivenessProbe {
    client: Client,
}

impl Default for HttpLivenessProbe {
    fn default() -> Self {
        let client = Client::builder()
            .connect_timeout(TimeoutConfigBase::default().connection_timeout())
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn probe(&self, url: &Url) -> OrchestratorResult<()> {
        let health = format!("{}/health", url.as_str().trim_end_matches('/'));
        let response = self
            .client
            .get(&health)
            .send()
            .await
            .map_err(|e| OrchestratorError::connection(&health, e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(OrchestratorError::connection(
                &health,
                format!("HTTP {}", response.status()),
            ))
        }
    }
}

/// Builds the backend for an admitted descriptor
pub type IntegrationFactory =
    Arc<dyn Fn(Domain, &DomainService) -> OrchestratorResult<Arc<dyn ServiceIntegration>> + Send + Sync>;

fn specialist_factory() -> IntegrationFactory {
    Arc::new(|_domain: Domain, service: &DomainService| -> OrchestratorResult<Arc<dyn ServiceIntegration>> {
        let config = IntegrationConfig::new(service.url.clone()).with_api_key(service.key.clone());
        let integration = SpecialistIntegration::new(config)?.with_name(service.name.clone());
        Ok(Arc::new(integration) as Arc<dyn ServiceIntegration>)
    })
}

struct Binding {
    name: String,
    integration: Arc<dyn ServiceIntegration>,
    active: bool,
}

pub struct DomainRegistry {
    bindings: RwLock<HashMap<Domain, Binding>>,
    validators: HashMap<Domain, Arc<dyn DomainValidator>>,
    probe: Option<Arc<dyn LivenessProbe>>,
    factory: IntegrationFactory,
    liveness_timeout: Duration,
    initialized: AtomicBool,
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
            validators: HashMap::new(),
            probe: Some(Arc::new(HttpLivenessProbe::default())),
            factory: specialist_factory(),
            liveness_timeout: TimeoutConfigBase::default().health_check_timeout(),
            initialized: AtomicBool::new(false),
        }
    }

    /// Registry with the built-in credential rules installed
    pub fn with_default_rules() -> Self {
        Self::new().with_validator(Domain::CryptoAnalyst, CredentialFormat::specialist())
    }

    /// Built-in rules with the liveness bound taken from `config`.
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::with_default_rules().with_liveness_timeout(config.liveness_timeout)
    }

    pub fn with_validator(mut self, domain: Domain, validator: impl DomainValidator + 'static) -> Self {
        self.validators.insert(domain, Arc::new(validator));
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Skip the liveness gate entirely.
    pub fn without_probe(mut self) -> Self {
        self.probe = None;
        self
    }

    pub fn with_factory(mut self, factory: IntegrationFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    pub async fn initialize(&self) -> OrchestratorResult<()> {
        if !self.initialized.swap(true, Ordering::SeqCst) {
            info!("domain registry initialized");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn check_shape(service: &DomainService) -> Result<Url, String> {
        if service.name.trim().is_empty() {
            return Err("service name is required".to_string());
        }
        if service.key.trim().is_empty() {
            return Err("service key is required".to_string());
        }
        if service.url.trim().is_empty() {
            return Err("service url is required".to_string());
        }
        let url = Url::parse(service.url.trim()).map_err(|e| format!("invalid url: {}", e))?;
        let well_formed = matches!(url.scheme(), "http" | "https") && url.host().is_some();
        if well_formed {
            Ok(url)
        } else {
            Err(format!("invalid url: {}", service.url))
        }
    }

    /// Validate, probe, build and initialize a backend for `domain`, then
    /// bind it as the domain's active service.
    pub async fn register_api(&self, domain: Domain, service: DomainService) -> OrchestratorResult<()> {
        let rejected = |reason: String| {
            warn!(domain = %domain, "domain service rejected: {}", reason);
            OrchestratorError::DomainRegistration {
                domain: domain.to_string(),
                reason,
            }
        };

        let url = Self::check_shape(&service).map_err(rejected)?;

        if let Some(validator) = self.validators.get(&domain) {
            validator.check(&service).map_err(rejected)?;
        }

        if let Some(probe) = &self.probe {
            match tokio::time::timeout(self.liveness_timeout, probe.probe(&url)).await {
                Ok(Ok(())) => debug!(domain = %domain, "liveness probe passed"),
                Ok(Err(err)) => return Err(rejected(err.to_string())),
                Err(_) => {
                    return Err(rejected(format!(
                        "liveness probe timed out after {:?}",
                        self.liveness_timeout
                    )))
                }
            }
        }

        let integration = (self.factory)(domain, &service).map_err(|e| rejected(e.to_string()))?;
        if integration.status() == ServiceStatus::Error {
            return Err(rejected(format!("{} is in error state", service.name)));
        }
        integration
            .initialize()
            .await
            .map_err(|e| rejected(e.to_string()))?;

        let name = service.name;
        let mut bindings = self.bindings.write();
        if let Some(previous) = bindings.get_mut(&domain) {
            previous.active = false;
        }
        bindings.insert(
            domain,
            Binding {
                name: name.clone(),
                integration,
                active: true,
            },
        );
        info!(domain = %domain, service = %name, "domain service registered");
        Ok(())
    }

    pub fn get_active_service(&self, domain: Domain) -> Option<Arc<dyn ServiceIntegration>> {
        self.bindings
            .read()
            .get(&domain)
            .filter(|b| b.active)
            .map(|b| Arc::clone(&b.integration))
    }

    /// Unbind every domain; used when leaving a specialist-backed domain.
    pub fn deactivate_all_services(&self) {
        for (domain, binding) in self.bindings.write().iter_mut() {
            if binding.active {
                binding.active = false;
                info!(domain = %domain, service = %binding.name, "deactivated domain service");
            }
        }
    }

    pub fn deactivate_service(&self, domain: Domain) {
        if let Some(binding) = self.bindings.write().get_mut(&domain) {
            if binding.active {
                binding.active = false;
                info!(domain = %domain, service = %binding.name, "deactivated domain service");
            }
        }
    }

    pub fn is_service_active(&self, domain: Domain) -> bool {
        self.bindings
            .read()
            .get(&domain)
            .map(|b| b.active)
            .unwrap_or(false)
    }

    /// Route `params` to the domain's active backend. Never fails; problems
    /// come back as `success: false`.
    pub async fn query_domain(&self, domain: Domain, params: QueryParams) -> ApiResponse {
        let Some(integration) = self.get_active_service(domain) else {
            return ApiResponse::failure(format!("No active service found for domain: {}", domain));
        };

        match integration.execute(params).await {
            Ok(response) => response,
            Err(err) => {
                warn!(domain = %domain, "domain query failed: {}", err);
                ApiResponse::failure(format!("Failed to query domain {}: {}", domain, err))
            }
        }
    }
}
