use aigent_common::{init_structured_logging, DiagnosticLog, LogLevel, LoggingConfig};
use std::sync::Arc;

// One test per binary: the subscriber is process-global
#[test]
fn test_init_routes_events_into_diagnostic_log() {
    let log = Arc::new(DiagnosticLog::new(5));
    let config = LoggingConfig {
        color_output: false,
        diagnostic_log: Some(Arc::clone(&log)),
        ..LoggingConfig::default()
    };

    init_structured_logging(config.clone()).expect("first init succeeds");
    assert!(init_structured_logging(config).is_err());

    tracing::info!(integration_id = "nlp", "integration registered");
    tracing::debug!("not retained");
    tracing::error!("liveness check failed");

    let history = log.history();
    assert_eq!(history.len(), 2);
    assert!(history[0].message.contains("integration registered"));
    assert!(history[0].message.contains("integration_id=nlp"));
    assert_eq!(log.history_by_level(LogLevel::Error).len(), 1);
}
