//! Recommended action ranking through the orchestrator

mod support;

use aigent_orchestrator::{
    ContextInsight, Domain, DomainCatalog, Orchestrator, OrchestratorConfig, RecommendedAction,
};
use anyhow::Result;
use support::{sample_iqube, StubIntegration};

fn catalog() -> DomainCatalog {
    DomainCatalog::builtin().with_actions(
        Domain::Guardian,
        vec![
            RecommendedAction::new(Domain::Guardian, "Baseline", "Check my setup.", 0.7),
            RecommendedAction::new(
                Domain::Guardian,
                "Sovereignty review",
                "My data control score is {sovereignty}. What should change?",
                0.0,
            )
            .relevant_to("sovereignty", 1.0),
            RecommendedAction::new(Domain::Guardian, "Unrelated", "Anything new?", 0.1)
                .relevant_to("financial", 1.0),
        ],
    )
}

fn orchestrator() -> Result<Orchestrator> {
    Ok(Orchestrator::builder(OrchestratorConfig::default())
        .primary(StubIntegration::new("nlp").shared())
        .catalog(catalog())
        .build()?)
}

#[tokio::test]
async fn test_insights_lift_relevant_actions() -> Result<()> {
    let orchestrator = orchestrator()?;
    orchestrator.switch_domain("Guardian").await?;
    orchestrator.update_iqube_data(sample_iqube());

    let actions = orchestrator.get_recommended_actions();

    // 0.95 + 0.8 + 0.75 from the sovereignty insights beats the 0.7 baseline
    assert_eq!(actions[0].action, "Sovereignty review");
    assert_eq!(actions[0].prompt, "My data control score is 90. What should change?");
    assert!((actions[0].priority - 2.5).abs() < 1e-9);
    assert_eq!(actions[1].action, "Baseline");
    assert_eq!(actions[2].action, "Unrelated");
    Ok(())
}

#[tokio::test]
async fn test_without_telemetry_catalog_order_stands() -> Result<()> {
    let orchestrator = orchestrator()?;
    orchestrator.switch_domain("Guardian").await?;

    let actions = orchestrator.get_recommended_actions();

    assert_eq!(actions[0].action, "Baseline");
    assert_eq!(
        actions[1].prompt,
        "My data control score is {sovereignty}. What should change?"
    );
    Ok(())
}

#[tokio::test]
async fn test_results_are_capped() -> Result<()> {
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(StubIntegration::new("nlp").shared())
        .build()?;
    orchestrator.switch_domain("AI Coach").await?;
    orchestrator.update_iqube_data(sample_iqube());

    let actions = orchestrator.get_recommended_actions();

    assert!(actions.len() <= 4);
    assert!(actions.iter().all(|a| a.domain == Domain::AiCoach));
    assert!(actions
        .windows(2)
        .all(|pair| pair[0].priority >= pair[1].priority));
    Ok(())
}

#[test]
fn test_two_weak_insights_beat_one_strong_priority() {
    let templates = vec![
        RecommendedAction::new(Domain::Default, "Strong", "strong", 0.7),
        RecommendedAction::new(Domain::Default, "Boosted", "boosted", 0.0)
            .relevant_to("performance", 1.0),
    ];
    let insights = vec![
        ContextInsight::new("Uptime", 99.0, "performance", 0.8),
        ContextInsight::new("Reliability", 97.0, "performance", 0.9),
    ];

    let ranked = aigent_orchestrator::rank_actions(&templates, &insights, 4);

    assert_eq!(ranked[0].action, "Boosted");
    assert!((ranked[0].priority - 1.7).abs() < 1e-9);
}

#[test]
fn test_builtin_prompts_only_quote_their_own_metric() {
    let data = sample_iqube();
    let insights = aigent_orchestrator::derive_insights(Domain::CryptoAnalyst, &data);
    let catalog = DomainCatalog::builtin();

    let ranked = aigent_orchestrator::rank_actions(catalog.actions(Domain::CryptoAnalyst), &insights, 10);

    let portfolio = ranked.iter().find(|a| a.action == "Analyze portfolio");
    assert_eq!(
        portfolio.map(|a| a.prompt.as_str()),
        Some("Analyze my portfolio given staking efficiency of 91.")
    );
    let rewards = ranked.iter().find(|a| a.action == "Optimize rewards");
    assert!(rewards.is_some_and(|a| !a.prompt.contains("91") && !a.prompt.contains('{')));
    assert!(ranked.iter().all(|a| !a.prompt.contains('{')));
}
