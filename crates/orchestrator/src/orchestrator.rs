//! Service Orchestrator
//!
//! Coordinates the integration registry, the optional domain registry and
//! the three readiness layers.
//!
//! # Architecture
//!
//! - Startup (`initialize`) is memoized: concurrent callers share one
//!   bring-up run. The run is spawned and raced against a timeout; a run that
//!   loses the race keeps going but its generation is stale, so none of its
//!   results are applied.
//! - Layer failures during startup are recorded and logged, never thrown.
//!   Only a primary integration that fails to come up makes `initialize`
//!   return an error, and only after the final state has been broadcast.
//! - The current domain and its context live in one value and are swapped
//!   as a unit.
//! - Periodic health polling runs on one scheduler, stopped by `dispose`.

use common::{DiagnosticLog, HasSeverity, JobId, LogLine, ScheduledJob, Scheduler, DEFAULT_CAPACITY};
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::broadcast::{SubscriberList, Subscription};
use crate::config::OrchestratorConfig;
use crate::context::{
    rank_actions, ContextInsight, DomainContext, DomainContextSource, IQubeData,
    LocalContextSource,
};
use crate::domain::{
    Domain, DomainCatalog, DomainMetadata, DomainRegistry, DomainService, RecommendedAction,
};
use crate::errors::{OrchestratorError, OrchestratorResult};
use crate::integration::{
    ApiResponse, IntegrationRegistry, LanguageIntegration, QueryParams, ServiceIntegration,
    ServiceStatus,
};
use crate::layers::{LayerKind, LayerReport, LayerStatus, OrchestrationState};
use crate::task_cache::TaskCache;

const ALIGNMENT_JOB: JobId = JobId("orchestrator.alignment");
const STATUS_JOB: JobId = JobId("orchestrator.status");

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    config: OrchestratorConfig,
    registry: Option<Arc<IntegrationRegistry>>,
    domain_registry: Option<Arc<DomainRegistry>>,
    domains_from_config: bool,
    primary: Option<Arc<dyn ServiceIntegration>>,
    integrations: Vec<Arc<dyn ServiceIntegration>>,
    catalog: Option<DomainCatalog>,
    context_source: Option<Arc<dyn DomainContextSource>>,
    log: Option<Arc<DiagnosticLog>>,
}

impl OrchestratorBuilder {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            config,
            registry: None,
            domain_registry: None,
            domains_from_config: false,
            primary: None,
            integrations: Vec::new(),
            catalog: None,
            context_source: None,
            log: None,
        }
    }

    /// Use an existing integration registry instead of an empty one.
    pub fn registry(mut self, registry: Arc<IntegrationRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Without a domain registry the state layer stays inactive and domains
    /// needing a specialist backend cannot be activated.
    pub fn domain_registry(mut self, registry: Arc<DomainRegistry>) -> Self {
        self.domain_registry = Some(registry);
        self
    }

    /// Build a domain registry with the built-in rules and the configured
    /// liveness timeout. An explicit [`Self::domain_registry`] takes
    /// precedence.
    pub fn domain_registry_from_config(mut self) -> Self {
        self.domains_from_config = true;
        self
    }

    /// Override the primary language integration built from the config.
    pub fn primary(mut self, integration: Arc<dyn ServiceIntegration>) -> Self {
        self.primary = Some(integration);
        self
    }

    /// Add an optional secondary integration.
    pub fn integration(mut self, integration: Arc<dyn ServiceIntegration>) -> Self {
        self.integrations.push(integration);
        self
    }

    pub fn catalog(mut self, catalog: DomainCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn context_source(mut self, source: Arc<dyn DomainContextSource>) -> Self {
        self.context_source = Some(source);
        self
    }

    pub fn diagnostic_log(mut self, log: Arc<DiagnosticLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn build(self) -> OrchestratorResult<Orchestrator> {
        let primary = match self.primary {
            Some(primary) => primary,
            None => Arc::new(LanguageIntegration::new(self.config.language.clone())?)
                as Arc<dyn ServiceIntegration>,
        };
        let primary_id = primary.id().to_string();
        let secondaries = self
            .integrations
            .into_iter()
            .filter(|i| i.id() != primary_id)
            .collect();

        let domain_registry = match self.domain_registry {
            Some(registry) => Some(registry),
            None if self.domains_from_config => {
                Some(Arc::new(DomainRegistry::from_config(&self.config)))
            }
            None => None,
        };

        let initial = OrchestrationState::default();
        let (state_tx, _) = watch::channel(initial.clone());

        Ok(Orchestrator {
            inner: Arc::new(Inner {
                config: self.config,
                registry: self.registry.unwrap_or_default(),
                domain_registry,
                primary,
                secondaries,
                catalog: self.catalog.unwrap_or_else(DomainCatalog::builtin),
                context_source: self
                    .context_source
                    .unwrap_or_else(|| Arc::new(LocalContextSource)),
                log: self
                    .log
                    .unwrap_or_else(|| Arc::new(DiagnosticLog::new(DEFAULT_CAPACITY))),
                layers: RwLock::new(initial),
                domain: RwLock::new(DomainContext::default()),
                initialized: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                jobs_started: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                init_task: TaskCache::new(),
                subscribers: SubscriberList::new(),
                state_tx,
                scheduler: Scheduler::new(),
            }),
        })
    }
}

/// Coordinator of integrations, domains and readiness layers.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    config: OrchestratorConfig,

    registry: Arc<IntegrationRegistry>,

    domain_registry: Option<Arc<DomainRegistry>>,

    /// Integration whose readiness decides `is_initialized`
    primary: Arc<dyn ServiceIntegration>,

    /// Optional integrations admitted best effort
    secondaries: Vec<Arc<dyn ServiceIntegration>>,

    catalog: DomainCatalog,

    context_source: Arc<dyn DomainContextSource>,

    log: Arc<DiagnosticLog>,

    layers: RwLock<OrchestrationState>,

    /// Current domain together with its context
    domain: RwLock<DomainContext>,

    initialized: AtomicBool,

    disposed: AtomicBool,

    jobs_started: AtomicBool,

    /// Bumped on every bring-up start, timeout and dispose
    generation: AtomicU64,

    init_task: TaskCache<OrchestratorResult<()>>,

    subscribers: SubscriberList<OrchestrationState>,

    state_tx: watch::Sender<OrchestrationState>,

    scheduler: Scheduler,
}

impl Orchestrator {
    pub fn builder(config: OrchestratorConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    pub fn new(config: OrchestratorConfig) -> OrchestratorResult<Self> {
        OrchestratorBuilder::new(config).build()
    }

    /// Bring the orchestrator up. Concurrent calls share one run; calls after
    /// a successful run return immediately.
    pub async fn initialize(&self) -> OrchestratorResult<()> {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return Err(OrchestratorError::Disposed);
        }
        if self.is_initialized() {
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        self.inner
            .init_task
            .run(move || async move { Inner::initialize_with_timeout(inner).await })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    pub fn get_layer_status(&self) -> OrchestrationState {
        self.inner.layers.read().clone()
    }

    /// Health poll: every layer valid and every registered integration
    /// validating true.
    pub async fn validate_layer_alignment(&self) -> OrchestratorResult<()> {
        self.inner.validate_layer_alignment().await
    }

    pub async fn validate_all_integrations(&self) -> HashMap<String, bool> {
        self.inner.registry.validate_all_integrations().await
    }

    pub fn registry(&self) -> Arc<IntegrationRegistry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn primary_id(&self) -> &str {
        self.inner.primary.id()
    }

    /// Switch by identifier or display name.
    pub async fn switch_domain(&self, domain: &str) -> OrchestratorResult<()> {
        let domain = domain.parse::<Domain>()?;
        self.activate_specialized_domain(domain).await
    }

    pub async fn activate_specialized_domain(&self, domain: Domain) -> OrchestratorResult<()> {
        self.inner.activate_domain(domain).await
    }

    pub fn get_current_domain(&self) -> Domain {
        self.inner.domain.read().specialized_state
    }

    pub fn get_domain_context(&self) -> DomainContext {
        self.inner.domain.read().clone()
    }

    pub fn get_context_insights(&self) -> Vec<ContextInsight> {
        self.inner.domain.read().insights.clone()
    }

    pub fn get_domain_metadata(&self) -> Option<DomainMetadata> {
        self.inner.catalog.metadata(self.get_current_domain()).cloned()
    }

    /// Replace telemetry and regenerate insights for the current domain.
    pub fn update_iqube_data(&self, data: IQubeData) {
        let (domain, count) = {
            let mut current = self.inner.domain.write();
            let next = DomainContext::synthesize(current.specialized_state, Some(&data));
            let summary = (next.specialized_state, next.insights.len());
            *current = next;
            summary
        };
        info!(domain = %domain, insights = count, token_id = %data.token_id, "telemetry updated");
        self.inner.set_layer(LayerKind::Context, LayerStatus::activated);
        self.inner.broadcast();
    }

    /// Top-ranked actions for the current domain, re-weighted by insights.
    pub fn get_recommended_actions(&self) -> Vec<RecommendedAction> {
        let context = self.get_domain_context();
        rank_actions(
            self.inner.catalog.actions(context.specialized_state),
            &context.insights,
            self.inner.config.recommendation_limit,
        )
    }

    /// Route a query and always answer; failures come back as
    /// `success: false`.
    pub async fn process_query(&self, text: &str, context: Option<Value>) -> ApiResponse {
        match self.try_process_query(text, context).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error_code = err.error_code(), "query failed: {}", err);
                ApiResponse::failure(err.to_string())
                    .with_metadata("error_code", err.error_code())
                    .with_metadata("severity", err.severity().to_string())
            }
        }
    }

    /// Route a query to the active specialist, or the primary integration.
    pub async fn try_process_query(
        &self,
        text: &str,
        context: Option<Value>,
    ) -> OrchestratorResult<ApiResponse> {
        self.inner.process_query(text, context).await
    }

    /// Register a state callback. No immediate call is made on subscribe.
    pub fn subscribe(
        &self,
        callback: impl Fn(&OrchestrationState) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    pub fn watch_state(&self) -> watch::Receiver<OrchestrationState> {
        self.inner.state_tx.subscribe()
    }

    /// Mark a layer freshly active and broadcast.
    pub fn update_layer(&self, kind: LayerKind) {
        self.inner.set_layer(kind, LayerStatus::activated);
        self.inner.broadcast();
    }

    /// Record `error` on a layer, deactivate it and broadcast.
    pub fn handle_error(&self, kind: LayerKind, error: &OrchestratorError) {
        self.inner.record_layer_error(kind, error);
        self.inner.broadcast();
    }

    pub fn diagnostics(&self) -> Vec<LogLine> {
        self.inner.log.history()
    }

    pub fn diagnostic_log(&self) -> Arc<DiagnosticLog> {
        Arc::clone(&self.inner.log)
    }

    /// Ids of the background polling jobs currently running.
    pub async fn scheduled_jobs(&self) -> Vec<&'static str> {
        self.inner.scheduler.jobs().await.into_iter().map(|job| job.0).collect()
    }

    /// Stop polling and invalidate any in-flight bring-up. Idempotent.
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        self.inner.init_task.clear();
        self.inner.scheduler.shutdown().await;
        self.inner.log.info("orchestrator disposed");
        info!("orchestrator disposed");
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        !self.disposed.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    fn set_layer(&self, kind: LayerKind, f: impl FnOnce(&LayerStatus) -> LayerStatus) {
        self.layers.write().update(kind, f);
    }

    fn record_layer_error(&self, kind: LayerKind, error: &OrchestratorError) {
        let message = error.to_string();
        self.set_layer(kind, |layer| layer.failed(message.clone()));
        if error.should_alert() {
            error!(layer = %kind, severity = %error.severity(), "{}", message);
            self.log.error(format!("{} layer: {}", kind, message));
        } else {
            warn!(layer = %kind, severity = %error.severity(), "{}", message);
            self.log.warn(format!("{} layer: {}", kind, message));
        }
    }

    fn broadcast(&self) {
        let snapshot = self.layers.read().clone();
        self.state_tx.send_replace(snapshot.clone());
        let delivered = self.subscribers.notify(&snapshot);
        debug!(delivered, "state broadcast");
    }

    async fn initialize_with_timeout(inner: Arc<Inner>) -> OrchestratorResult<()> {
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let timeout = inner.config.init_timeout;

        let worker = Arc::clone(&inner);
        let bring_up = tokio::spawn(async move { worker.bring_up(generation).await });

        match tokio::time::timeout(timeout, bring_up).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => {
                let err = OrchestratorError::CriticalServicesNotInitialized(format!(
                    "bring-up task failed: {}",
                    join_error
                ));
                inner.record_layer_error(LayerKind::Service, &err);
                inner.broadcast();
                Err(err)
            }
            Err(_) => {
                // Anything the abandoned run finishes later is discarded
                if inner.is_current(generation) {
                    inner.generation.fetch_add(1, Ordering::SeqCst);
                }
                let err = OrchestratorError::InitializationTimeout(timeout);
                for kind in LayerKind::ALL {
                    inner.record_layer_error(kind, &err);
                }
                inner.broadcast();
                Err(err)
            }
        }
    }

    async fn bring_up(self: Arc<Self>, generation: u64) -> OrchestratorResult<()> {
        info!(primary = %self.primary.id(), "initializing orchestrator");
        self.log.info("initializing orchestrator");

        if !self.is_current(generation) {
            return Err(OrchestratorError::InitializationTimeout(self.config.init_timeout));
        }

        // Ids this run inserted, removed again if the run goes stale
        let mut admitted: Vec<String> = Vec::new();

        let primary_known = self.registry.get(self.primary.id()).is_some();
        let registered = self.registry.register(Arc::clone(&self.primary)).await;
        if registered.is_ok() && !primary_known {
            admitted.push(self.primary.id().to_string());
        }
        if !self.is_current(generation) {
            return Err(self.discard_stale(generation, &admitted));
        }
        if let Err(err) = registered {
            let err = OrchestratorError::CriticalServicesNotInitialized(format!(
                "failed to register {}: {}",
                self.primary.name(),
                err
            ));
            self.record_layer_error(LayerKind::Service, &err);
            self.broadcast();
            return Err(err);
        }
        let primary_ready = self.primary.status() == ServiceStatus::Ready;

        for integration in &self.secondaries {
            let known = self.registry.get(integration.id()).is_some();
            let enrolled = self.registry.enroll(Arc::clone(integration)).await;
            if enrolled.is_ok() && !known {
                admitted.push(integration.id().to_string());
            }
            if !self.is_current(generation) {
                return Err(self.discard_stale(generation, &admitted));
            }
            if let Err(err) = enrolled {
                warn!(integration_id = %integration.id(), "skipping integration: {}", err);
            }
        }

        let validation = self.registry.validate_all_integrations().await;
        let mut ids: Vec<_> = validation.iter().collect();
        ids.sort();
        for (id, valid) in ids {
            if *valid {
                info!(integration_id = %id, "integration valid");
            } else {
                warn!(integration_id = %id, "integration failed validation");
                self.log.warn(format!("integration {} failed validation", id));
            }
        }

        if let Err(err) = self.init_context_layer(generation).await {
            warn!(severity = %err.severity(), "context layer: {}", err);
        }
        if let Err(err) = self.init_service_state_layers(generation).await {
            warn!(severity = %err.severity(), "state layer: {}", err);
        }

        if !self.is_current(generation) {
            return Err(self.discard_stale(generation, &admitted));
        }

        self.initialized.store(primary_ready, Ordering::SeqCst);
        if primary_ready {
            self.start_jobs().await;
        }
        self.broadcast();

        if primary_ready {
            info!("orchestrator initialized");
            self.log.info("orchestrator initialized");
            Ok(())
        } else {
            let err = OrchestratorError::CriticalServicesNotInitialized(format!(
                "{} is {}",
                self.primary.name(),
                self.primary.status()
            ));
            self.log.error(err.to_string());
            Err(err)
        }
    }

    /// Undo the registry admissions of a run that lost to a timeout or
    /// dispose.
    fn discard_stale(&self, generation: u64, admitted: &[String]) -> OrchestratorError {
        for id in admitted {
            self.registry.unregister(id);
        }
        debug!(generation, rolled_back = admitted.len(), "discarding stale bring-up");
        OrchestratorError::InitializationTimeout(self.config.init_timeout)
    }

    /// Liveness of the primary decides the context layer, the secondaries
    /// decide the service layer.
    async fn init_context_layer(&self, generation: u64) -> OrchestratorResult<()> {
        let primary = Arc::clone(&self.primary);
        let secondaries = self.secondaries.clone();

        let (primary_ok, secondary_results) = tokio::join!(
            async move { primary.validate().await },
            futures::future::join_all(secondaries.into_iter().map(|s| async move {
                let ok = s.validate().await;
                (s.id().to_string(), ok)
            }))
        );

        if !self.is_current(generation) {
            return Ok(());
        }

        if primary_ok {
            self.set_layer(LayerKind::Context, LayerStatus::activated);
        } else {
            let err = OrchestratorError::connection(self.primary.id(), "liveness check failed");
            self.record_layer_error(LayerKind::Context, &err);
        }

        let failed: Vec<String> = secondary_results
            .into_iter()
            .filter_map(|(id, ok)| (!ok).then_some(id))
            .collect();
        let service_ok = if self.secondaries.is_empty() {
            primary_ok
        } else {
            failed.is_empty()
        };
        if service_ok {
            self.set_layer(LayerKind::Service, LayerStatus::activated);
        } else {
            let target = if failed.is_empty() {
                self.primary.id().to_string()
            } else {
                failed.join(", ")
            };
            let err = OrchestratorError::connection(target, "liveness check failed");
            self.record_layer_error(LayerKind::Service, &err);
        }

        self.layers
            .read()
            .validate(&[LayerKind::Context, LayerKind::Service], self.config.layer_staleness)
    }

    async fn init_service_state_layers(&self, generation: u64) -> OrchestratorResult<()> {
        if let Some(domains) = &self.domain_registry {
            match domains.initialize().await {
                Ok(()) if self.is_current(generation) => {
                    self.set_layer(LayerKind::State, LayerStatus::activated)
                }
                Err(err) if self.is_current(generation) => {
                    self.record_layer_error(LayerKind::State, &err)
                }
                _ => return Ok(()),
            }
        } else {
            debug!("no domain registry configured, state layer stays inactive");
        }

        let (domain, data) = {
            let current = self.domain.read();
            (current.specialized_state, current.iqube_data.clone())
        };
        let context = self.fetch_context(domain, data.as_ref()).await;
        if !self.is_current(generation) {
            return Ok(());
        }
        self.commit_context(context);

        self.layers
            .read()
            .validate(&[LayerKind::State], self.config.layer_staleness)
    }

    async fn fetch_context(&self, domain: Domain, data: Option<&IQubeData>) -> DomainContext {
        match self.context_source.fetch(domain, data).await {
            Ok(context) if context.specialized_state == domain => context,
            Ok(_) => {
                warn!(domain = %domain, "context source answered for another domain, synthesizing");
                DomainContext::synthesize(domain, data)
            }
            Err(err) => {
                warn!(domain = %domain, "context fetch failed, synthesizing: {}", err);
                DomainContext::synthesize(domain, data)
            }
        }
    }

    /// Install `context` as the current domain context. Telemetry that
    /// arrived after the fetch started wins and insights are re-derived.
    fn commit_context(&self, context: DomainContext) {
        let mut current = self.domain.write();
        let next = if current.iqube_data != context.iqube_data && current.iqube_data.is_some() {
            DomainContext::synthesize(context.specialized_state, current.iqube_data.as_ref())
        } else {
            context
        };
        *current = next;
    }

    async fn activate_domain(&self, domain: Domain) -> OrchestratorResult<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(OrchestratorError::Disposed);
        }
        let previous = self.domain.read().specialized_state;
        info!(from = %previous, to = %domain, "switching domain");

        if domain.requires_specialist() {
            let credential = self
                .config
                .domain_credentials
                .get(domain)
                .ok_or_else(|| {
                    OrchestratorError::domain(domain.id(), "missing domain credential")
                })?
                .to_string();
            let registry = self.domain_registry.as_ref().ok_or_else(|| {
                OrchestratorError::domain(domain.id(), "no domain registry configured")
            })?;

            if !registry.is_service_active(domain) {
                let name = self
                    .catalog
                    .metadata(domain)
                    .map(|m| m.name.clone())
                    .unwrap_or_else(|| domain.id().to_string());
                let service =
                    DomainService::new(name, self.config.specialist_endpoint.clone(), credential);
                if let Err(err) = registry.register_api(domain, service).await {
                    self.log.error(format!("domain {} unavailable: {}", domain, err));
                    return Err(err);
                }
            }
        }

        if previous != domain && previous.requires_specialist() {
            if let Some(registry) = &self.domain_registry {
                registry.deactivate_all_services();
            }
        }

        let data = self.domain.read().iqube_data.clone();
        let context = self.fetch_context(domain, data.as_ref()).await;
        self.commit_context(context);

        {
            let mut layers = self.layers.write();
            layers.update(LayerKind::Context, LayerStatus::activated);
            layers.update(LayerKind::Service, LayerStatus::activated);
        }
        self.log.info(format!("switched domain to {}", domain));
        self.broadcast();
        Ok(())
    }

    async fn process_query(&self, text: &str, context: Option<Value>) -> OrchestratorResult<ApiResponse> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(OrchestratorError::Disposed);
        }
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(OrchestratorError::NotInitialized("Orchestrator".to_string()));
        }

        let domain = self.domain.read().specialized_state;
        let query_failed = |reason: String| OrchestratorError::QueryProcessing {
            query: text.to_string(),
            domain: domain.to_string(),
            reason,
        };

        let specialist = self
            .domain_registry
            .as_ref()
            .filter(|registry| registry.is_service_active(domain));

        let response = match specialist {
            Some(registry) => {
                let params = QueryParams {
                    message: text.to_string(),
                    context,
                    domain: Some(domain.id().to_string()),
                };
                registry.query_domain(domain, params).await
            }
            None => {
                let state = serde_json::to_value(&*self.layers.read()).unwrap_or(Value::Null);
                let merged = match context {
                    Some(Value::Object(mut extra)) => {
                        extra.insert("orchestration".to_string(), state);
                        Value::Object(extra)
                    }
                    Some(other) => json!({ "orchestration": state, "context": other }),
                    None => json!({ "orchestration": state }),
                };
                let params = QueryParams::new(text)
                    .with_context(merged)
                    .with_domain(domain.id());
                self.registry
                    .execute_api(self.primary.id(), params)
                    .await
                    .map_err(|e| query_failed(e.to_string()))?
            }
        };

        if response.success {
            Ok(response.with_metadata("domain", domain.id()))
        } else {
            let reason = response
                .error
                .clone()
                .unwrap_or_else(|| "query failed".to_string());
            Err(query_failed(reason))
        }
    }

    async fn validate_layer_alignment(&self) -> OrchestratorResult<()> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(OrchestratorError::NotInitialized("Orchestrator".to_string()));
        }

        let validation = self.registry.validate_all_integrations().await;
        let mut failing: Vec<&str> = validation
            .iter()
            .filter(|(_, valid)| !**valid)
            .map(|(id, _)| id.as_str())
            .collect();
        failing.sort();

        let staleness = self.config.layer_staleness;
        let mut layers: BTreeMap<LayerKind, LayerReport> = {
            let state = self.layers.read();
            LayerKind::ALL
                .iter()
                .map(|kind| (*kind, state.layer(*kind).report(staleness)))
                .collect()
        };
        if !failing.is_empty() {
            layers.insert(
                LayerKind::Service,
                LayerReport::new(
                    false,
                    Some(format!("integrations failing validation: {}", failing.join(", "))),
                ),
            );
        }

        if layers.values().all(|report| report.valid) {
            debug!("layers aligned");
            Ok(())
        } else {
            let err = OrchestratorError::LayerAlignment { layers };
            warn!("{}", err);
            self.log.warn(err.to_string());
            Err(err)
        }
    }

    async fn start_jobs(self: &Arc<Self>) {
        if self.jobs_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let weak: Weak<Inner> = Arc::downgrade(self);
        self.scheduler
            .spawn_periodic(
                ScheduledJob {
                    id: ALIGNMENT_JOB,
                    interval: self.config.alignment_poll_interval,
                },
                move || {
                    let weak = weak.clone();
                    async move {
                        if let Some(inner) = weak.upgrade() {
                            let _ = inner.validate_layer_alignment().await;
                        }
                    }
                },
            )
            .await;

        let weak: Weak<Inner> = Arc::downgrade(self);
        self.scheduler
            .spawn_periodic(
                ScheduledJob {
                    id: STATUS_JOB,
                    interval: self.config.status_poll_interval,
                },
                move || {
                    let weak = weak.clone();
                    async move {
                        if let Some(inner) = weak.upgrade() {
                            for integration in inner.registry.get_all_integrations() {
                                debug!(
                                    integration_id = %integration.id(),
                                    status = %integration.status(),
                                    "integration status"
                                );
                            }
                            let validation = inner.registry.validate_all_integrations().await;
                            let failing = validation.values().filter(|v| !**v).count();
                            if failing > 0 {
                                warn!(failing, "integrations failing validation");
                            }
                        }
                    }
                },
            )
            .await;
    }
}
