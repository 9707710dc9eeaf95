//! Specialized domains: the closed identifier set, the display catalog and
//! the registry binding domains to specialist backends.

pub mod catalog;
pub mod registry;

pub use catalog::{ContextRelevance, DomainCatalog, DomainMetadata, RecommendedAction};
pub use registry::{
    CredentialFormat, DomainRegistry, DomainService, DomainValidator, HttpLivenessProbe,
    IntegrationFactory, LivenessProbe,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::OrchestratorError;

/// Closed set of specializations the orchestrator can switch between
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    #[default]
    Default,
    CryptoAnalyst,
    AiCoach,
    BlockchainAdvisor,
    Guardian,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Default,
        Domain::CryptoAnalyst,
        Domain::AiCoach,
        Domain::BlockchainAdvisor,
        Domain::Guardian,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Domain::Default => "default",
            Domain::CryptoAnalyst => "crypto_analyst",
            Domain::AiCoach => "ai_coach",
            Domain::BlockchainAdvisor => "blockchain_advisor",
            Domain::Guardian => "guardian",
        }
    }

    /// Domains whose queries are served by a dedicated specialist backend
    /// and therefore need a domain-scoped credential.
    pub fn requires_specialist(&self) -> bool {
        matches!(self, Domain::CryptoAnalyst)
    }

    pub fn is_specialized(&self) -> bool {
        !matches!(self, Domain::Default)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Domain {
    type Err = OrchestratorError;

    /// Accepts identifiers (`crypto_analyst`) and display names
    /// (`Crypto Analyst`, `Guardian Aigent`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        match normalized.as_str() {
            "default" | "" => Ok(Domain::Default),
            "crypto_analyst" => Ok(Domain::CryptoAnalyst),
            "ai_coach" | "agent_ai_coach" => Ok(Domain::AiCoach),
            "blockchain_advisor" | "bitcoin_advisor" => Ok(Domain::BlockchainAdvisor),
            "guardian" | "guardian_aigent" => Ok(Domain::Guardian),
            _ => Err(OrchestratorError::domain(s, "unknown domain")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("crypto_analyst", Domain::CryptoAnalyst)]
    #[case("Crypto Analyst", Domain::CryptoAnalyst)]
    #[case("Agent AI Coach", Domain::AiCoach)]
    #[case("AI Coach", Domain::AiCoach)]
    #[case("Bitcoin Advisor", Domain::BlockchainAdvisor)]
    #[case("blockchain-advisor", Domain::BlockchainAdvisor)]
    #[case("Guardian Aigent", Domain::Guardian)]
    #[case("default", Domain::Default)]
    fn test_parse(#[case] input: &str, #[case] expected: Domain) {
        assert_eq!(input.parse::<Domain>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_domain_is_domain_error() {
        let err = "Astrologer".parse::<Domain>().unwrap_err();
        assert_eq!(err.error_code(), "DOMAIN_ERROR");
    }

    #[test]
    fn test_ids_round_trip() {
        for domain in Domain::ALL {
            assert_eq!(domain.id().parse::<Domain>().unwrap(), domain);
        }
        assert!(Domain::CryptoAnalyst.requires_specialist());
        assert!(!Domain::Guardian.requires_specialist());
    }
}
