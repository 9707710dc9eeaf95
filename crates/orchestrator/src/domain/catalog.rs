use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Domain;

/// Display metadata for a domain, kept apart from the switching logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainMetadata {
    pub domain: Domain,
    pub name: String,
    pub description: String,
    pub default_instructions: String,
}

/// How strongly an action responds to insights of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRelevance {
    pub category: String,
    pub relevance_score: f64,
}

impl ContextRelevance {
    pub fn new(category: impl Into<String>, relevance_score: f64) -> Self {
        Self {
            category: category.into(),
            relevance_score,
        }
    }
}

/// A suggested next step. Catalog entries are templates; ranked copies carry
/// a recomputed `priority` and an interpolated `prompt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action: String,
    pub prompt: String,
    pub domain: Domain,
    pub priority: f64,
    pub context_relevance: Vec<ContextRelevance>,
}

impl RecommendedAction {
    pub fn new(domain: Domain, action: impl Into<String>, prompt: impl Into<String>, priority: f64) -> Self {
        Self {
            action: action.into(),
            prompt: prompt.into(),
            domain,
            priority,
            context_relevance: Vec::new(),
        }
    }

    pub fn relevant_to(mut self, category: impl Into<String>, relevance_score: f64) -> Self {
        self.context_relevance
            .push(ContextRelevance::new(category, relevance_score));
        self
    }
}

/// Lookup table of metadata and action templates per domain
#[derive(Debug, Clone, Default)]
pub struct DomainCatalog {
    metadata: HashMap<Domain, DomainMetadata>,
    actions: HashMap<Domain, Vec<RecommendedAction>>,
}

impl DomainCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn metadata(&self, domain: Domain) -> Option<&DomainMetadata> {
        self.metadata.get(&domain)
    }

    pub fn actions(&self, domain: Domain) -> &[RecommendedAction] {
        self.actions.get(&domain).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn with_metadata(
        mut self,
        domain: Domain,
        name: &str,
        description: &str,
        default_instructions: &str,
    ) -> Self {
        self.metadata.insert(
            domain,
            DomainMetadata {
                domain,
                name: name.to_string(),
                description: description.to_string(),
                default_instructions: default_instructions.to_string(),
            },
        );
        self
    }

    /// Replace the action templates for `domain`.
    pub fn with_actions(mut self, domain: Domain, actions: Vec<RecommendedAction>) -> Self {
        self.actions.insert(domain, actions);
        self
    }

    pub fn builtin() -> Self {
        use Domain::*;

        Self::empty()
            .with_metadata(
                Default,
                "Default",
                "General-purpose blockchain assistant",
                "You are an AI assistant integrated with a blockchain application. Help users \
                 manage digital assets and understand blockchain concepts with clear, concise answers.",
            )
            .with_metadata(
                CryptoAnalyst,
                "Crypto Analyst",
                "Specialized in cryptocurrency analysis and market insights",
                "You are a crypto analyst specialized in providing market insights and analysis \
                 for cryptocurrency portfolios.",
            )
            .with_metadata(
                AiCoach,
                "Agent AI Coach",
                "AI agent training and coaching specialist",
                "You are an AI coach specialized in training and guiding AI agents for optimal \
                 performance and evolution.",
            )
            .with_metadata(
                BlockchainAdvisor,
                "Bitcoin Advisor",
                "Specialized in Bitcoin and blockchain technology advisory",
                "You are a Bitcoin advisor specialized in providing guidance on blockchain \
                 technology, Bitcoin investments, and cryptocurrency strategy.",
            )
            .with_metadata(
                Guardian,
                "Guardian Aigent",
                "AI security and protection specialist",
                "You are a Guardian Aigent specialized in AI security, protection strategies, and \
                 maintaining the safety and integrity of AI systems.",
            )
            .with_actions(
                Default,
                vec![
                    RecommendedAction::new(
                        Default,
                        "Explore your iQube",
                        "Summarize what my iQube can do for me.",
                        0.6,
                    )
                    .relevant_to("profile", 0.5),
                    RecommendedAction::new(
                        Default,
                        "Check node health",
                        "My uptime is {performance}. Is my node healthy?",
                        0.5,
                    )
                    .relevant_to("performance", 0.7),
                    RecommendedAction::new(
                        Default,
                        "Review staking",
                        "My staking efficiency is {financial}. How can I improve it?",
                        0.4,
                    )
                    .relevant_to("financial", 0.6),
                ],
            )
            .with_actions(
                CryptoAnalyst,
                vec![
                    RecommendedAction::new(
                        CryptoAnalyst,
                        "Analyze portfolio",
                        "Analyze my portfolio given staking efficiency of {financial}.",
                        0.8,
                    )
                    .relevant_to("financial", 1.0),
                    RecommendedAction::new(
                        CryptoAnalyst,
                        "Market outlook",
                        "What is the current market outlook for my holdings?",
                        0.7,
                    )
                    .relevant_to("financial", 0.4),
                    RecommendedAction::new(
                        CryptoAnalyst,
                        "Optimize rewards",
                        "How do I compound the staking rewards I have earned?",
                        0.6,
                    )
                    .relevant_to("financial", 0.8),
                    RecommendedAction::new(
                        CryptoAnalyst,
                        "Assess network risk",
                        "My network reputation is {network}. Does that affect my positions?",
                        0.5,
                    )
                    .relevant_to("network", 0.6),
                    RecommendedAction::new(
                        CryptoAnalyst,
                        "Tax summary",
                        "Prepare a summary of my on-chain activity for tax reporting.",
                        0.3,
                    ),
                ],
            )
            .with_actions(
                AiCoach,
                vec![
                    RecommendedAction::new(
                        AiCoach,
                        "Improve model accuracy",
                        "My model accuracy is {ai}. Suggest a training plan.",
                        0.8,
                    )
                    .relevant_to("ai", 1.0),
                    RecommendedAction::new(
                        AiCoach,
                        "Reduce bias",
                        "How do I reduce the bias in my model?",
                        0.7,
                    )
                    .relevant_to("ai", 0.8),
                    RecommendedAction::new(
                        AiCoach,
                        "Scale compute",
                        "My compute capacity is {performance}. Should I scale up?",
                        0.6,
                    )
                    .relevant_to("performance", 0.9),
                    RecommendedAction::new(
                        AiCoach,
                        "Career alignment",
                        "Align my agent with my {profile} background.",
                        0.5,
                    )
                    .relevant_to("profile", 0.7),
                    RecommendedAction::new(
                        AiCoach,
                        "Evaluate reliability",
                        "What should I monitor to keep my agent reliable?",
                        0.4,
                    )
                    .relevant_to("performance", 0.5),
                ],
            )
            .with_actions(
                BlockchainAdvisor,
                vec![
                    RecommendedAction::new(
                        BlockchainAdvisor,
                        "Strengthen connectivity",
                        "My connection strength is {network}. How can I improve it?",
                        0.8,
                    )
                    .relevant_to("network", 1.0),
                    RecommendedAction::new(
                        BlockchainAdvisor,
                        "Increase consensus participation",
                        "How do I raise my consensus participation?",
                        0.7,
                    )
                    .relevant_to("network", 0.8),
                    RecommendedAction::new(
                        BlockchainAdvisor,
                        "Staking strategy",
                        "My staking balance is {financial}. What strategy fits?",
                        0.6,
                    )
                    .relevant_to("financial", 0.9),
                    RecommendedAction::new(
                        BlockchainAdvisor,
                        "Bitcoin fundamentals",
                        "Explain the Bitcoin security model in simple terms.",
                        0.4,
                    ),
                ],
            )
            .with_actions(
                Guardian,
                vec![
                    RecommendedAction::new(
                        Guardian,
                        "Audit data sovereignty",
                        "My data control score is {sovereignty}. What should I lock down?",
                        0.8,
                    )
                    .relevant_to("sovereignty", 1.0),
                    RecommendedAction::new(
                        Guardian,
                        "Review AI safety",
                        "My AI safety score is {ai}. Are there risks I should address?",
                        0.7,
                    )
                    .relevant_to("ai", 1.0),
                    RecommendedAction::new(
                        Guardian,
                        "Harden identity",
                        "How can I strengthen my on-chain identity?",
                        0.6,
                    )
                    .relevant_to("sovereignty", 0.8),
                    RecommendedAction::new(
                        Guardian,
                        "Privacy check",
                        "Check my privacy compliance. Am I exposed anywhere?",
                        0.5,
                    )
                    .relevant_to("sovereignty", 0.6)
                    .relevant_to("ai", 0.3),
                    RecommendedAction::new(
                        Guardian,
                        "Governance participation",
                        "How can I take part in governance votes?",
                        0.3,
                    ),
                ],
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_covers_every_domain() {
        let catalog = DomainCatalog::builtin();
        for domain in Domain::ALL {
            let meta = catalog.metadata(domain).expect("metadata");
            assert_eq!(meta.domain, domain);
            assert!(!catalog.actions(domain).is_empty());
            assert!(catalog.actions(domain).iter().all(|a| a.domain == domain));
        }
    }

    #[test]
    fn test_placeholders_name_declared_categories() {
        let catalog = DomainCatalog::builtin();
        for domain in Domain::ALL {
            for action in catalog.actions(domain) {
                for (start, _) in action.prompt.match_indices('{') {
                    let rest = &action.prompt[start + 1..];
                    let category = rest.split('}').next().unwrap_or_default();
                    assert!(
                        action.context_relevance.iter().any(|r| r.category == category),
                        "{} uses undeclared placeholder {{{}}}",
                        action.action,
                        category
                    );
                }
            }
        }
    }

    #[test]
    fn test_empty_catalog_has_no_actions() {
        let catalog = DomainCatalog::empty();
        assert!(catalog.actions(Domain::Guardian).is_empty());
        assert!(catalog.metadata(Domain::Guardian).is_none());
    }
}
