//! AigentQube Service Orchestration Core
//!
//! This crate coordinates pluggable backend integrations for the AigentQube
//! agent dashboard: it registers and health-checks them, tracks readiness
//! through three layers, switches between specialized domains and ranks
//! recommended actions from live telemetry.
//!
//! # Architecture
//!
//! - **ServiceIntegration**: backend adapter contract (`initialize`, `validate`, `execute`)
//! - **IntegrationRegistry**: validate-then-admit set of integrations keyed by id
//! - **DomainRegistry**: domain to specialist-backend bindings with admission gates
//! - **DomainCatalog**: display metadata and action templates per domain
//! - **Orchestrator**: startup sequencing, layer state, domain switching, pub/sub
//! - **TaskCache**: single-slot memoization of the in-flight startup
//!
//! # Usage
//!
//! ```no_run
//! use aigent_orchestrator::{Orchestrator, OrchestratorConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = OrchestratorConfig::from_env()?;
//!     let orchestrator = Orchestrator::new(config)?;
//!
//!     let _subscription = orchestrator.subscribe(|state| {
//!         println!("context layer active: {}", state.context.is_active);
//!     });
//!
//!     orchestrator.initialize().await?;
//!     orchestrator.switch_domain("Guardian").await?;
//!
//!     for action in orchestrator.get_recommended_actions() {
//!         println!("{} ({:.2})", action.action, action.priority);
//!     }
//!
//!     orchestrator.dispose().await;
//!     Ok(())
//! }
//! ```

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::new_without_default)]

pub mod broadcast;
pub mod config;
pub mod context;
pub mod domain;
pub mod errors;
pub mod integration;
pub mod layers;
pub mod orchestrator;
pub mod task_cache;

pub use broadcast::{SubscriberList, Subscription};
pub use config::{DomainCredentials, IntegrationConfig, OrchestratorConfig};
pub use context::{
    derive_insights, rank_actions, ContextInsight, DomainContext, DomainContextSource,
    IQubeData, InsightValue, LocalContextSource,
};
pub use domain::{
    CredentialFormat, Domain, DomainCatalog, DomainMetadata, DomainRegistry, DomainService,
    DomainValidator, HttpLivenessProbe, IntegrationFactory, LivenessProbe, RecommendedAction,
};
pub use errors::{OrchestratorError, OrchestratorResult};
pub use integration::{
    ApiResponse, IntegrationRegistry, LanguageIntegration, QueryParams, ResponseMetadata,
    ServiceIntegration, ServiceStatus, SpecialistIntegration, SpecialistProfile,
};
pub use layers::{LayerKind, LayerReport, LayerStatus, OrchestrationState};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use task_cache::TaskCache;
