//! Shared fixtures for the orchestrator integration tests.

#![allow(dead_code)]

use aigent_orchestrator::{
    ApiResponse, IQubeData, IntegrationConfig, OrchestratorError, OrchestratorResult,
    QueryParams, ServiceIntegration, ServiceStatus,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// In-memory integration that counts every call made on it.
pub struct StubIntegration {
    id: String,
    name: String,
    config: IntegrationConfig,
    status: RwLock<ServiceStatus>,
    init_ok: bool,
    init_delay: Duration,
    valid: AtomicBool,
    pub init_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub execute_calls: AtomicUsize,
}

impl StubIntegration {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("{} stub", id),
            config: IntegrationConfig::default(),
            status: RwLock::new(ServiceStatus::Initializing),
            init_ok: true,
            init_delay: Duration::ZERO,
            valid: AtomicBool::new(true),
            init_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_init(mut self) -> Self {
        self.init_ok = false;
        self
    }

    pub fn invalid(self) -> Self {
        self.valid.store(false, Ordering::SeqCst);
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn set_valid(&self, valid: bool) {
        self.valid.store(valid, Ordering::SeqCst);
    }

    pub fn init_count(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn execute_count(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl ServiceIntegration for StubIntegration {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "test double"
    }

    fn status(&self) -> ServiceStatus {
        *self.status.read()
    }

    fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    fn mark_error(&self) {
        *self.status.write() = ServiceStatus::Error;
    }

    async fn initialize(&self) -> OrchestratorResult<()> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if self.init_ok {
            *self.status.write() = ServiceStatus::Ready;
            Ok(())
        } else {
            *self.status.write() = ServiceStatus::Error;
            Err(OrchestratorError::connection(&self.id, "handshake refused"))
        }
    }

    async fn validate(&self) -> bool {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.valid.load(Ordering::SeqCst)
    }

    async fn execute(&self, params: QueryParams) -> OrchestratorResult<ApiResponse> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        match self.status() {
            ServiceStatus::Initializing => Err(OrchestratorError::NotInitialized(self.id.clone())),
            ServiceStatus::Error => Ok(ApiResponse::failure(format!("{} unavailable", self.id))),
            ServiceStatus::Ready => Ok(ApiResponse::ok(json!({
                "handled_by": self.id,
                "echo": params.message,
                "domain": params.domain,
                "context": params.context,
            }))),
        }
    }
}

/// Telemetry with distinct values per metric group
pub fn sample_iqube() -> IQubeData {
    let mut data = IQubeData {
        token_id: "iq-42".to_string(),
        ..IQubeData::default()
    };
    data.user_profile.profession = "Researcher".to_string();
    data.performance_metrics.uptime = 99.5;
    data.performance_metrics.compute_capacity = 80.0;
    data.performance_metrics.reliability = 97.0;
    data.ai_metrics.model_accuracy = 92.0;
    data.ai_metrics.bias_score = 12.0;
    data.ai_metrics.safety_score = 88.0;
    data.ai_metrics.privacy_score = 75.0;
    data.network_metrics.connection_strength = 85.0;
    data.network_metrics.peers_connected = 24.0;
    data.network_metrics.consensus_participation = 70.0;
    data.network_metrics.reputation_score = 64.0;
    data.sovereignty_metrics.data_control_score = 90.0;
    data.sovereignty_metrics.identity_strength = 81.0;
    data.sovereignty_metrics.privacy_compliance = 95.0;
    data.financial_metrics.staking_balance = 1500.0;
    data.financial_metrics.rewards_earned = 42.5;
    data.financial_metrics.staking_efficiency = 91.0;
    data
}
