use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub profession: String,
    pub industry: String,
    pub experience: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub compute_capacity: f64,
    pub data_processed: f64,
    pub uptime: f64,
    pub reliability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMetrics {
    pub model_accuracy: f64,
    pub bias_score: f64,
    pub safety_score: f64,
    pub privacy_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkMetrics {
    pub connection_strength: f64,
    pub peers_connected: f64,
    pub consensus_participation: f64,
    pub reputation_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SovereigntyMetrics {
    pub data_control_score: f64,
    pub identity_strength: f64,
    pub governance_participation: f64,
    pub privacy_compliance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub staking_balance: f64,
    pub rewards_earned: f64,
    pub staking_efficiency: f64,
    pub network_contribution: f64,
}

/// Telemetry bundle pushed by the wallet layer once a record is activated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IQubeData {
    pub token_id: String,
    pub user_profile: UserProfile,
    pub performance_metrics: PerformanceMetrics,
    pub ai_metrics: AiMetrics,
    pub network_metrics: NetworkMetrics,
    pub sovereignty_metrics: SovereigntyMetrics,
    pub financial_metrics: FinancialMetrics,
}
