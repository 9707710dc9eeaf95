//! Startup, layer state, broadcast and shutdown behavior

mod support;

use aigent_orchestrator::{
    DomainRegistry, IntegrationConfig, IntegrationRegistry, LayerKind, Orchestrator,
    OrchestratorConfig, OrchestratorError, SpecialistIntegration,
};
use anyhow::Result;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use support::StubIntegration;

fn unreachable_specialist() -> Arc<SpecialistIntegration> {
    Arc::new(SpecialistIntegration::new(IntegrationConfig::new("http://127.0.0.1:9")).unwrap())
}

#[tokio::test]
async fn test_initializes_with_optional_integration_down() -> Result<()> {
    let nlp = StubIntegration::new("nlp").shared();
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(nlp.clone())
        .integration(unreachable_specialist())
        .build()?;

    orchestrator.initialize().await?;

    assert!(orchestrator.is_initialized());
    let validation = orchestrator.validate_all_integrations().await;
    assert_eq!(validation.len(), 2);
    assert!(validation["nlp"]);
    assert!(!validation["metis"]);

    let state = orchestrator.get_layer_status();
    assert!(state.context.is_active);
    assert!(!state.service.is_active);
    assert!(state.service.error.as_deref().unwrap_or_default().contains("metis"));

    orchestrator.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_concurrent_initialize_runs_once() -> Result<()> {
    let nlp = StubIntegration::new("nlp")
        .with_init_delay(Duration::from_millis(50))
        .shared();
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(nlp.clone())
        .build()?;

    let (a, b, c) = tokio::join!(
        orchestrator.initialize(),
        orchestrator.initialize(),
        orchestrator.initialize()
    );

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(nlp.init_count(), 1);

    orchestrator.initialize().await?;
    assert_eq!(nlp.init_count(), 1);

    orchestrator.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_primary_failure_is_fail_closed() -> Result<()> {
    let nlp = StubIntegration::new("nlp").invalid().shared();
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(nlp)
        .build()?;

    let broadcasts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&broadcasts);
    let _sub = orchestrator.subscribe(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let err = orchestrator.initialize().await.unwrap_err();

    assert!(matches!(err, OrchestratorError::CriticalServicesNotInitialized(_)));
    assert!(!orchestrator.is_initialized());
    assert!(orchestrator.registry().is_empty());
    assert!(broadcasts.load(Ordering::SeqCst) >= 1);
    assert!(orchestrator.get_layer_status().service.error.is_some());
    Ok(())
}

#[tokio::test]
async fn test_timeout_discards_late_bring_up() -> Result<()> {
    let nlp = StubIntegration::new("nlp")
        .with_init_delay(Duration::from_millis(150))
        .shared();
    let config = OrchestratorConfig::default().with_init_timeout(Duration::from_millis(30));
    let orchestrator = Orchestrator::builder(config)
        .primary(nlp.clone())
        .build()?;

    let err = orchestrator.initialize().await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InitializationTimeout(_)));

    // The abandoned run finishes here but must not flip any state
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(!orchestrator.is_initialized());
    let state = orchestrator.get_layer_status();
    for kind in LayerKind::ALL {
        assert!(!state.layer(kind).is_active, "{} should be inactive", kind);
        assert!(state.layer(kind).error.is_some());
    }
    assert!(orchestrator.scheduled_jobs().await.is_empty());
    assert!(orchestrator.registry().is_empty());
    assert!(orchestrator.validate_all_integrations().await.is_empty());

    orchestrator.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_timed_out_run_rolls_back_its_admissions() -> Result<()> {
    let registry = Arc::new(IntegrationRegistry::new());
    registry.register(StubIntegration::new("legacy").shared()).await?;

    let nlp = StubIntegration::new("nlp").shared();
    let slow = StubIntegration::new("slow")
        .with_init_delay(Duration::from_millis(150))
        .shared();
    let config = OrchestratorConfig::default().with_init_timeout(Duration::from_millis(30));
    let orchestrator = Orchestrator::builder(config)
        .registry(Arc::clone(&registry))
        .domain_registry(Arc::new(DomainRegistry::new().without_probe()))
        .primary(nlp.clone())
        .integration(slow.clone())
        .build()?;

    let err = orchestrator.initialize().await.unwrap_err();
    assert!(matches!(err, OrchestratorError::InitializationTimeout(_)));

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(slow.init_count(), 1);
    assert_eq!(registry.ids(), vec!["legacy".to_string()]);
    assert!(registry.get_api_status("nlp").is_none());
    let state = orchestrator.get_layer_status().layer(LayerKind::State).clone();
    assert!(!state.is_active);
    assert!(state.error.is_some_and(|e| e.contains("timed out")));

    orchestrator.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_layers_go_stale() -> Result<()> {
    let mut config = OrchestratorConfig::default();
    config.layer_staleness = Duration::from_millis(200);
    let orchestrator = Orchestrator::builder(config)
        .primary(StubIntegration::new("nlp").shared())
        .domain_registry(Arc::new(DomainRegistry::new().without_probe()))
        .build()?;

    orchestrator.initialize().await?;
    orchestrator.validate_layer_alignment().await?;

    tokio::time::sleep(Duration::from_millis(300)).await;
    let err = orchestrator.validate_layer_alignment().await.unwrap_err();
    match err {
        OrchestratorError::LayerAlignment { layers } => {
            assert_eq!(layers.len(), 3);
            assert!(layers.values().all(|report| !report.valid));
        }
        other => panic!("unexpected error: {}", other),
    }

    orchestrator.update_layer(LayerKind::Context);
    let state = orchestrator.get_layer_status();
    assert!(state.context.is_valid(Duration::from_millis(200)));
    assert!(!state
        .context
        .is_valid_at(Utc::now() + chrono::Duration::seconds(1), Duration::from_millis(200)));

    orchestrator.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_alignment_flags_failing_integration() -> Result<()> {
    let nlp = StubIntegration::new("nlp").shared();
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(nlp.clone())
        .domain_registry(Arc::new(DomainRegistry::new().without_probe()))
        .build()?;
    orchestrator.initialize().await?;

    nlp.set_valid(false);
    let err = orchestrator.validate_layer_alignment().await.unwrap_err();

    assert_eq!(err.error_code(), "LAYER_ALIGNMENT_ERROR");
    assert!(err.to_string().contains("nlp"));
    orchestrator.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_state_layer_inactive_without_domain_registry() -> Result<()> {
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(StubIntegration::new("nlp").shared())
        .build()?;
    orchestrator.initialize().await?;

    let state = orchestrator.get_layer_status();
    assert!(state.context.is_active);
    assert!(state.service.is_active);
    assert!(!state.state.is_active);
    assert!(orchestrator.validate_layer_alignment().await.is_err());

    orchestrator.dispose().await;
    Ok(())
}

#[tokio::test]
async fn test_panicking_subscriber_does_not_block_others() -> Result<()> {
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(StubIntegration::new("nlp").shared())
        .build()?;

    let first = Arc::new(AtomicUsize::new(0));
    let third = Arc::new(AtomicUsize::new(0));
    let (f, t) = (Arc::clone(&first), Arc::clone(&third));
    let _a = orchestrator.subscribe(move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });
    let _b = orchestrator.subscribe(|_| panic!("subscriber bug"));
    let _c = orchestrator.subscribe(move |state| {
        assert!(state.context.is_active);
        t.fetch_add(1, Ordering::SeqCst);
    });

    orchestrator.update_layer(LayerKind::Context);

    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(third.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() -> Result<()> {
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(StubIntegration::new("nlp").shared())
        .build()?;

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let sub = orchestrator.subscribe(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    orchestrator.update_layer(LayerKind::Service);
    sub.unsubscribe();
    orchestrator.update_layer(LayerKind::Service);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn test_watch_state_sees_layer_errors() -> Result<()> {
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(StubIntegration::new("nlp").shared())
        .build()?;
    let mut rx = orchestrator.watch_state();

    orchestrator.handle_error(
        LayerKind::State,
        &OrchestratorError::connection("wallet", "unreachable"),
    );

    rx.changed().await?;
    let state = rx.borrow().clone();
    assert!(!state.state.is_active);
    assert!(state.state.error.unwrap().contains("wallet"));
    assert!(orchestrator
        .diagnostics()
        .iter()
        .any(|line| line.message.contains("wallet")));
    Ok(())
}

#[tokio::test]
async fn test_dispose_stops_polling() -> Result<()> {
    let orchestrator = Orchestrator::builder(OrchestratorConfig::default())
        .primary(StubIntegration::new("nlp").shared())
        .build()?;
    orchestrator.initialize().await?;
    assert_eq!(orchestrator.scheduled_jobs().await.len(), 2);

    orchestrator.dispose().await;

    assert!(orchestrator.is_disposed());
    assert!(orchestrator.scheduled_jobs().await.is_empty());
    assert!(matches!(
        orchestrator.initialize().await,
        Err(OrchestratorError::Disposed)
    ));
    Ok(())
}
