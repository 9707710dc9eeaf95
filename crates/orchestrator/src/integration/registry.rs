//! Keyed set of admitted service integrations.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::join_all;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{ApiResponse, QueryParams, ServiceIntegration, ServiceStatus};
use crate::errors::{OrchestratorError, OrchestratorResult};

/// Registry of integrations, at most one per id.
///
/// Admission through [`IntegrationRegistry::register`] is validate-then-admit:
/// nothing is inserted unless `initialize` succeeds and `validate` passes.
#[derive(Default)]
pub struct IntegrationRegistry {
    integrations: DashMap<String, Arc<dyn ServiceIntegration>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_identity(integration: &dyn ServiceIntegration) -> OrchestratorResult<()> {
        if integration.id().trim().is_empty() {
            return Err(OrchestratorError::validation(
                integration.name(),
                "integration id is required",
            ));
        }
        if integration.name().trim().is_empty() {
            return Err(OrchestratorError::validation(
                integration.id(),
                "integration name is required",
            ));
        }
        Ok(())
    }

    /// Initialize, validate and admit `integration`.
    ///
    /// Re-registering an id that is already present is a no-op and does not
    /// re-run `initialize`.
    pub async fn register(&self, integration: Arc<dyn ServiceIntegration>) -> OrchestratorResult<()> {
        Self::check_identity(integration.as_ref())?;
        let id = integration.id().to_string();
        let name = integration.name().to_string();

        if self.integrations.contains_key(&id) {
            debug!(integration_id = %id, "integration already registered");
            return Ok(());
        }

        if integration.status() == ServiceStatus::Error {
            return Err(OrchestratorError::validation(&name, "integration is in error state"));
        }

        if let Err(err) = integration.initialize().await {
            integration.mark_error();
            warn!(integration_id = %id, "initialization failed: {}", err);
            return Err(OrchestratorError::validation(&name, format!("initialization failed: {}", err)));
        }

        if !integration.validate().await {
            integration.mark_error();
            warn!(integration_id = %id, "validation failed, not registering");
            return Err(OrchestratorError::validation(&name, "validation failed"));
        }

        // Another caller may have won the race while we were suspended
        match self.integrations.entry(id.clone()) {
            Entry::Occupied(_) => {
                debug!(integration_id = %id, "integration registered concurrently");
            }
            Entry::Vacant(slot) => {
                slot.insert(integration);
                info!(integration_id = %id, "registered integration");
            }
        }
        Ok(())
    }

    /// Best-effort admission for optional integrations: the entry is kept
    /// even when initialization fails, so diagnostics can report it.
    pub async fn enroll(&self, integration: Arc<dyn ServiceIntegration>) -> OrchestratorResult<()> {
        Self::check_identity(integration.as_ref())?;
        let id = integration.id().to_string();

        if self.integrations.contains_key(&id) {
            debug!(integration_id = %id, "integration already enrolled");
            return Ok(());
        }

        if integration.status() == ServiceStatus::Initializing {
            if let Err(err) = integration.initialize().await {
                warn!(integration_id = %id, "optional integration failed to initialize: {}", err);
            }
        }

        self.integrations.entry(id.clone()).or_insert(integration);
        info!(integration_id = %id, "enrolled integration");
        Ok(())
    }

    /// Delegate to the integration's `execute`. Fails only when `id` is
    /// unknown; every execution failure becomes `success: false`.
    pub async fn execute_api(&self, id: &str, params: QueryParams) -> OrchestratorResult<ApiResponse> {
        let integration = self
            .get(id)
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))?;

        let outcome = AssertUnwindSafe(integration.execute(params))
            .catch_unwind()
            .await;

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                error!(integration_id = %id, "execution failed: {}", err);
                ApiResponse::failure(err.to_string())
            }
            Err(_) => {
                error!(integration_id = %id, "execution panicked");
                ApiResponse::failure(format!("{} panicked during execution", id))
            }
        };

        if response.success {
            Ok(response)
        } else {
            Ok(response.with_metadata("id", Value::String(id.to_string())))
        }
    }

    /// Run every `validate` concurrently. A panicking validation counts as
    /// `false`.
    pub async fn validate_all_integrations(&self) -> HashMap<String, bool> {
        let entries: Vec<(String, Arc<dyn ServiceIntegration>)> = self
            .integrations
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let checks = entries.into_iter().map(|(id, integration)| async move {
            let valid = AssertUnwindSafe(integration.validate())
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    error!(integration_id = %id, "validation panicked");
                    false
                });
            (id, valid)
        });

        join_all(checks).await.into_iter().collect()
    }

    /// Remove `id` from the registry, returning the entry if it was present.
    pub fn unregister(&self, id: &str) -> Option<Arc<dyn ServiceIntegration>> {
        let removed = self.integrations.remove(id).map(|(_, integration)| integration);
        if removed.is_some() {
            info!(integration_id = %id, "unregistered integration");
        }
        removed
    }

    pub fn get_api_status(&self, id: &str) -> Option<ServiceStatus> {
        self.integrations.get(id).map(|entry| entry.status())
    }

    pub fn get_all_integrations(&self) -> Vec<Arc<dyn ServiceIntegration>> {
        let mut all: Vec<_> = self
            .integrations
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        all
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ServiceIntegration>> {
        self.integrations.get(id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.integrations.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.integrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty()
    }
}
