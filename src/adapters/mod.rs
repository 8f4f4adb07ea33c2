//! Backend operation adapters
//!
//! Each adapter owns one backend capability: its endpoint paths, field names
//! and failure policy. The router only sees `BackendRequest` in and
//! `BackendResponse` out.

use crate::error::OrchestrationError;
use crate::models::{BackendRequest, BackendResponse, DegradedResponse, Entities};
use crate::Result;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod market;
pub mod trading;

pub use market::{build_market_analysis_request, MarketAnalysisAdapter, MarketQueryService};
pub use trading::{build_strategy_request, TradeChatService, TradingStrategyAdapter};

pub const FALLBACK_ANSWER: &str =
    "Market analysis is temporarily unavailable. Please try again later.";

/// One backend capability reachable from the dispatch table
#[async_trait::async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Operation identifier referenced by dispatch entries
    fn operation(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Validate entities and build this adapter's request. Pure; no I/O.
    fn build_request(&self, entities: &Entities) -> Result<BackendRequest>;
    async fn execute(&self, request: BackendRequest) -> Result<BackendResponse>;
}

/// Parse a backend payload into its expected shape
pub(crate) fn decode<T: DeserializeOwned>(service: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| OrchestrationError::MalformedResponse {
        service: service.to_string(),
        message: e.to_string(),
    })
}

/// Guard for a request routed to the wrong adapter
pub(crate) fn mismatched(operation: &str, request: &BackendRequest) -> OrchestrationError {
    OrchestrationError::Internal(format!(
        "{} cannot handle a {} request",
        operation,
        request.kind()
    ))
}

/// Degraded answer used when a backend is unreachable
pub fn degraded(
    symbol: Option<&str>,
    query: Option<&str>,
    error: &OrchestrationError,
) -> DegradedResponse {
    DegradedResponse {
        symbol: symbol.map(str::to_string),
        query: query.map(str::to_string),
        answer: FALLBACK_ANSWER.to_string(),
        source: "fallback".to_string(),
        status: "api_unavailable".to_string(),
        error: error.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}
