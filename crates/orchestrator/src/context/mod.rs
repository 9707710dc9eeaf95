//! Domain context: telemetry, derived insights and ranked recommendations.

pub mod insights;
pub mod recommendations;
pub mod telemetry;

pub use insights::{derive_insights, ContextInsight, InsightValue};
pub use recommendations::rank_actions;
pub use telemetry::{
    AiMetrics, FinancialMetrics, IQubeData, NetworkMetrics, PerformanceMetrics,
    SovereigntyMetrics, UserProfile,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::errors::OrchestratorResult;

/// Context of the active domain. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainContext {
    pub specialized_state: Domain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iqube_data: Option<IQubeData>,
    pub insights: Vec<ContextInsight>,
    pub last_update: DateTime<Utc>,
}

impl DomainContext {
    /// Context built locally from whatever telemetry is at hand.
    pub fn synthesize(domain: Domain, data: Option<&IQubeData>) -> Self {
        Self {
            specialized_state: domain,
            iqube_data: data.cloned(),
            insights: data
                .map(|d| derive_insights(domain, d))
                .unwrap_or_default(),
            last_update: Utc::now(),
        }
    }
}

impl Default for DomainContext {
    fn default() -> Self {
        Self::synthesize(Domain::Default, None)
    }
}

/// External provider of domain context
#[async_trait]
pub trait DomainContextSource: Send + Sync {
    async fn fetch(&self, domain: Domain, data: Option<&IQubeData>) -> OrchestratorResult<DomainContext>;
}

/// Source that derives everything locally
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalContextSource;

#[async_trait]
impl DomainContextSource for LocalContextSource {
    async fn fetch(&self, domain: Domain, data: Option<&IQubeData>) -> OrchestratorResult<DomainContext> {
        Ok(DomainContext::synthesize(domain, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_without_telemetry() {
        let ctx = DomainContext::synthesize(Domain::Guardian, None);
        assert_eq!(ctx.specialized_state, Domain::Guardian);
        assert!(ctx.insights.is_empty());
    }

    #[tokio::test]
    async fn test_local_source_derives_insights() {
        let data = IQubeData::default();
        let ctx = LocalContextSource
            .fetch(Domain::AiCoach, Some(&data))
            .await
            .unwrap();
        assert_eq!(ctx.insights.len(), 5);
        assert!(ctx.iqube_data.is_some());
    }
}
