use meta_supervisor::{
    api::{start_server, ApiState},
    config::Settings,
    supervisor::{agent_service_from_settings, Backends, Supervisor},
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    // Initialize tracing: RUST_LOG wins over LOG_LEVEL
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Meta Supervisor - API Server");
    info!("Market analysis API: {}", settings.market_analysis_api_url);
    info!("Trading strategy API: {}", settings.trading_strategy_api_url);

    if settings.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY not set; /api/query and /api/agent will report configuration errors");
    }

    let backends = Backends::from_settings(&settings)?;
    let supervisor = Supervisor::with_transports(
        backends.market.clone(),
        backends.trading.clone(),
        settings.request_timeout,
    )?;
    let agent_service = agent_service_from_settings(&settings, &backends)?;

    let state = ApiState {
        supervisor: Arc::new(supervisor),
        agent_service: Arc::new(agent_service),
    };

    info!("Supervisor initialized, starting API server on {}", settings.bind_address());

    start_server(state, &settings.bind_address()).await?;

    Ok(())
}
