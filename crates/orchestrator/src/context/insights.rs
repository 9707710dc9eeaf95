//! Per-domain insight rules over telemetry.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::telemetry::IQubeData;
use crate::domain::Domain;

pub const CATEGORY_PERFORMANCE: &str = "performance";
pub const CATEGORY_AI: &str = "ai";
pub const CATEGORY_NETWORK: &str = "network";
pub const CATEGORY_SOVEREIGNTY: &str = "sovereignty";
pub const CATEGORY_FINANCIAL: &str = "financial";
pub const CATEGORY_PROFILE: &str = "profile";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsightValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for InsightValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightValue::Number(n) => write!(f, "{}", n),
            InsightValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for InsightValue {
    fn from(value: f64) -> Self {
        InsightValue::Number(value)
    }
}

impl From<&str> for InsightValue {
    fn from(value: &str) -> Self {
        InsightValue::Text(value.to_string())
    }
}

impl From<String> for InsightValue {
    fn from(value: String) -> Self {
        InsightValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextInsight {
    pub label: String,
    pub value: InsightValue,
    pub category: String,
    /// Weight in [0, 1]
    pub importance: f64,
}

impl ContextInsight {
    pub fn new(
        label: impl Into<String>,
        value: impl Into<InsightValue>,
        category: impl Into<String>,
        importance: f64,
    ) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            category: category.into(),
            importance: importance.clamp(0.0, 1.0),
        }
    }
}

/// Derive the insights `domain` cares about, most important first.
pub fn derive_insights(domain: Domain, data: &IQubeData) -> Vec<ContextInsight> {
    let perf = &data.performance_metrics;
    let ai = &data.ai_metrics;
    let net = &data.network_metrics;
    let sov = &data.sovereignty_metrics;
    let fin = &data.financial_metrics;
    let profile = &data.user_profile;

    let mut insights = match domain {
        Domain::Default => vec![
            ContextInsight::new("Uptime", perf.uptime, CATEGORY_PERFORMANCE, 0.6),
            ContextInsight::new("Staking Efficiency", fin.staking_efficiency, CATEGORY_FINANCIAL, 0.5),
            ContextInsight::new("Profession", profile.profession.as_str(), CATEGORY_PROFILE, 0.4),
        ],
        Domain::CryptoAnalyst => vec![
            ContextInsight::new("Staking Efficiency", fin.staking_efficiency, CATEGORY_FINANCIAL, 0.9),
            ContextInsight::new("Rewards Earned", fin.rewards_earned, CATEGORY_FINANCIAL, 0.8),
            ContextInsight::new("Staking Balance", fin.staking_balance, CATEGORY_FINANCIAL, 0.7),
            ContextInsight::new("Reputation Score", net.reputation_score, CATEGORY_NETWORK, 0.5),
        ],
        Domain::AiCoach => vec![
            ContextInsight::new("Model Accuracy", ai.model_accuracy, CATEGORY_AI, 0.9),
            ContextInsight::new("Bias Score", ai.bias_score, CATEGORY_AI, 0.8),
            ContextInsight::new("Compute Capacity", perf.compute_capacity, CATEGORY_PERFORMANCE, 0.7),
            ContextInsight::new("Reliability", perf.reliability, CATEGORY_PERFORMANCE, 0.6),
            ContextInsight::new("Profession", profile.profession.as_str(), CATEGORY_PROFILE, 0.5),
        ],
        Domain::BlockchainAdvisor => vec![
            ContextInsight::new("Network Strength", net.connection_strength, CATEGORY_NETWORK, 0.9),
            ContextInsight::new(
                "Consensus Participation",
                net.consensus_participation,
                CATEGORY_NETWORK,
                0.85,
            ),
            ContextInsight::new("Staking Balance", fin.staking_balance, CATEGORY_FINANCIAL, 0.7),
            ContextInsight::new("Peers Connected", net.peers_connected, CATEGORY_NETWORK, 0.6),
        ],
        Domain::Guardian => vec![
            ContextInsight::new("Data Control", sov.data_control_score, CATEGORY_SOVEREIGNTY, 0.95),
            ContextInsight::new("AI Safety", ai.safety_score, CATEGORY_AI, 0.9),
            ContextInsight::new("Identity Strength", sov.identity_strength, CATEGORY_SOVEREIGNTY, 0.8),
            ContextInsight::new(
                "Privacy Compliance",
                sov.privacy_compliance,
                CATEGORY_SOVEREIGNTY,
                0.75,
            ),
            ContextInsight::new("Privacy Score", ai.privacy_score, CATEGORY_AI, 0.6),
        ],
    };

    sort_by_importance(&mut insights);
    insights
}

/// Stable sort, highest importance first.
pub fn sort_by_importance(insights: &mut [ContextInsight]) {
    insights.sort_by(|a, b| b.importance.total_cmp(&a.importance));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IQubeData {
        let mut data = IQubeData::default();
        data.network_metrics.connection_strength = 0.7;
        data.network_metrics.consensus_participation = 0.6;
        data.sovereignty_metrics.data_control_score = 0.9;
        data.ai_metrics.safety_score = 0.97;
        data.user_profile.profession = "Engineer".to_string();
        data
    }

    #[test]
    fn test_blockchain_insights() {
        let insights = derive_insights(Domain::BlockchainAdvisor, &sample());
        assert_eq!(insights[0].label, "Network Strength");
        assert_eq!(insights[0].value, InsightValue::Number(0.7));
        assert_eq!(insights[1].label, "Consensus Participation");
    }

    #[test]
    fn test_guardian_insights_cover_sovereignty_and_safety() {
        let insights = derive_insights(Domain::Guardian, &sample());
        let categories: Vec<&str> = insights.iter().map(|i| i.category.as_str()).collect();
        assert!(categories.contains(&CATEGORY_SOVEREIGNTY));
        assert!(categories.contains(&CATEGORY_AI));
    }

    #[test]
    fn test_insights_sorted_descending() {
        for domain in Domain::ALL {
            let insights = derive_insights(domain, &sample());
            assert!(insights
                .windows(2)
                .all(|pair| pair[0].importance >= pair[1].importance));
        }
    }

    #[test]
    fn test_value_display() {
        assert_eq!(InsightValue::Number(1200.0).to_string(), "1200");
        assert_eq!(InsightValue::from("Engineer").to_string(), "Engineer");
        assert_eq!(ContextInsight::new("x", 1.0, "ai", 3.0).importance, 1.0);
    }
}
