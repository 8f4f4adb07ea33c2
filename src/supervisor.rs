//! Meta supervisor
//!
//! QUERY → EXTRACT → ROUTE (bounded by request timeout) → ENVELOPE
//!
//! Every outcome, success or failure, leaves as a `ResponseEnvelope`.

use crate::adapters::{
    MarketAnalysisAdapter, MarketQueryService, TradeChatService, TradingStrategyAdapter,
};
use crate::agent::{create_default_registry, AgentService, ChatClient, ToolCallingAgent};
use crate::classifier::IntentAnalyzer;
use crate::config::Settings;
use crate::envelope::ResponseEnvelope;
use crate::models::Query;
use crate::routing::{create_default_dispatch_table, RequestRouter};
use crate::transport::{BackendClient, HttpTransport};
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const MARKET_ANALYSIS_SERVICE: &str = "Market Analysis";
pub const TRADING_STRATEGY_SERVICE: &str = "Trading Strategy";

pub struct Supervisor {
    analyzer: IntentAnalyzer,
    router: RequestRouter,
    request_timeout: Duration,
}

impl Supervisor {
    pub fn new(analyzer: IntentAnalyzer, router: RequestRouter, request_timeout: Duration) -> Self {
        Self {
            analyzer,
            router,
            request_timeout,
        }
    }

    /// Dispatch-table supervisor wired to the configured backends
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let backends = Backends::from_settings(settings)?;
        Self::with_transports(backends.market, backends.trading, settings.request_timeout)
    }

    /// Default table over the given transports
    pub fn with_transports(
        market: Arc<dyn HttpTransport>,
        trading: Arc<dyn HttpTransport>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let table = create_default_dispatch_table(
            Arc::new(MarketAnalysisAdapter::new(market)),
            Arc::new(TradingStrategyAdapter::new(trading)),
        )?;

        Ok(Self::new(
            IntentAnalyzer::new(),
            RequestRouter::new(table),
            request_timeout,
        ))
    }

    pub fn router(&self) -> &RequestRouter {
        &self.router
    }

    /// Handle one query end to end. Never fails; errors become envelopes.
    pub async fn process(&self, query: &Query) -> ResponseEnvelope {
        let start = Instant::now();
        let analysis = self.analyzer.analyze(&query.query);

        debug!(
            intent = %analysis.intent,
            entities = ?analysis.entities,
            user_id = ?query.user_id,
            "Query analyzed"
        );

        let outcome = self
            .router
            .route_with_timeout(&analysis, self.request_timeout)
            .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => info!(intent = %analysis.intent, elapsed_ms, "Query processed"),
            Err(e) => warn!(
                intent = %analysis.intent,
                error_code = e.error_code(),
                error = %e,
                elapsed_ms,
                "Query failed"
            ),
        }

        ResponseEnvelope::from(outcome)
    }
}

/// One transport per backend service
pub struct Backends {
    pub market: Arc<dyn HttpTransport>,
    pub trading: Arc<dyn HttpTransport>,
}

impl Backends {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self {
            market: Arc::new(BackendClient::new(
                MARKET_ANALYSIS_SERVICE,
                &settings.market_analysis_api_url,
                settings.market_analysis_timeout,
            )?),
            trading: Arc::new(BackendClient::new(
                TRADING_STRATEGY_SERVICE,
                &settings.trading_strategy_api_url,
                settings.trading_strategy_timeout,
            )?),
        })
    }
}

/// Agent path wired to the configured LLM and backends
pub fn agent_service_from_settings(
    settings: &Settings,
    backends: &Backends,
) -> Result<AgentService> {
    let market = Arc::new(MarketQueryService::new(
        backends.market.clone(),
        settings.main_llm_model.clone(),
    ));
    let trading = settings
        .trading_tool_enabled
        .then(|| Arc::new(TradeChatService::new(backends.trading.clone())));

    let client = ChatClient::new(
        settings.openai_api_key.clone(),
        &settings.openai_base_url,
        &settings.main_llm_model,
        settings.llm_timeout,
    )?;

    let tools = create_default_registry(market.clone(), trading);
    info!(
        tool_count = tools.len(),
        model = %settings.main_llm_model,
        "Agent service initialized"
    );

    Ok(AgentService::new(
        Box::new(ToolCallingAgent::new(client)),
        tools,
        market,
    )
    .with_timeout(settings.agent_timeout))
}
