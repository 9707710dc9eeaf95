#![allow(clippy::uninlined_format_args)]
//! Dashboard Session Example
//!
//! Brings the orchestrator up from the environment (`.env` is honoured),
//! switches to a domain given on the command line and sends one query.
//!
//! ```text
//! OPENAI_API_KEY=... cargo run --example dashboard_session -- "Guardian" "How safe is my agent?"
//! ```

use aigent_orchestrator::{Orchestrator, OrchestratorConfig};
use common::{init_structured_logging, LoggingConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging(LoggingConfig::default())?;

    let mut args = std::env::args().skip(1);
    let domain = args.next().unwrap_or_else(|| "default".to_string());
    let question = args
        .next()
        .unwrap_or_else(|| "What should I look at first?".to_string());

    let config = OrchestratorConfig::from_env()?;
    let orchestrator = Orchestrator::builder(config)
        .domain_registry_from_config()
        .build()?;

    let _subscription = orchestrator.subscribe(|state| {
        info!(
            context = state.context.is_active,
            service = state.service.is_active,
            state = state.state.is_active,
            "layer state changed"
        );
    });

    if let Err(err) = orchestrator.initialize().await {
        warn!("orchestrator not ready: {}", err);
    }

    orchestrator.switch_domain(&domain).await?;
    for action in orchestrator.get_recommended_actions() {
        println!("- {} ({:.2}): {}", action.action, action.priority, action.prompt);
    }

    let reply = orchestrator.process_query(&question, None).await;
    match (reply.success, reply.data, reply.error) {
        (true, Some(data), _) => println!("{}", data),
        (_, _, error) => println!("query failed: {}", error.unwrap_or_default()),
    }

    for line in orchestrator.diagnostics() {
        println!("{}", line);
    }

    orchestrator.dispose().await;
    Ok(())
}
