//! Market analysis backend
//!
//! Two capabilities live on this service:
//! - `/analysis`: structured per-symbol report (dispatch path)
//! - `/analyze`: free-text question answering (agent tool path)
//!
//! Both degrade to a fixed answer when the service cannot be reached.

use super::{decode, degraded, mismatched, BackendAdapter};
use crate::error::OrchestrationError;
use crate::models::{
    BackendRequest, BackendResponse, Entities, MarketAnalysisRequest, MarketAnalysisResponse,
    MarketQueryRequest, MarketQueryResponse, ANALYSIS_TYPE, STOCK_CODE,
};
use crate::transport::HttpTransport;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_ANALYSIS_TYPE: &str = "technical";

/// `market_analysis` requires a stock code; analysis type defaults to technical
pub fn build_market_analysis_request(entities: &Entities) -> Result<BackendRequest> {
    let symbol = entities
        .get(STOCK_CODE)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| OrchestrationError::MissingParameter(STOCK_CODE.to_string()))?;

    let analysis_type = entities
        .get(ANALYSIS_TYPE)
        .map(String::as_str)
        .unwrap_or(DEFAULT_ANALYSIS_TYPE);

    Ok(BackendRequest::MarketAnalysis(MarketAnalysisRequest {
        symbol: symbol.clone(),
        analysis_type: analysis_type.to_string(),
    }))
}

pub struct MarketAnalysisAdapter {
    transport: Arc<dyn HttpTransport>,
}

impl MarketAnalysisAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    async fn get_analysis(&self, request: &MarketAnalysisRequest) -> Result<BackendResponse> {
        let body = serde_json::to_value(request)?;
        let response = self.transport.post_json("/analysis", &body).await?;
        let analysis: MarketAnalysisResponse = decode(self.transport.service(), response)?;
        Ok(BackendResponse::MarketAnalysis(analysis))
    }
}

#[async_trait::async_trait]
impl BackendAdapter for MarketAnalysisAdapter {
    fn operation(&self) -> &'static str {
        "get_analysis"
    }

    fn description(&self) -> &'static str {
        "Per-symbol technical or fundamental report via /analysis"
    }

    fn build_request(&self, entities: &Entities) -> Result<BackendRequest> {
        build_market_analysis_request(entities)
    }

    async fn execute(&self, request: BackendRequest) -> Result<BackendResponse> {
        let BackendRequest::MarketAnalysis(request) = &request else {
            return Err(mismatched(self.operation(), &request));
        };

        match self.get_analysis(request).await {
            Err(e) if e.is_unreachable() => {
                warn!(
                    symbol = %request.symbol,
                    error = %e,
                    "Market analysis unreachable, returning fallback"
                );
                Ok(BackendResponse::Degraded(degraded(
                    Some(&request.symbol),
                    None,
                    &e,
                )))
            }
            other => other,
        }
    }
}

/// Free-text market research used by the agent's `market_analysis` tool
pub struct MarketQueryService {
    transport: Arc<dyn HttpTransport>,
    model: String,
}

impl MarketQueryService {
    pub fn new(transport: Arc<dyn HttpTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    /// Returns `{query, answer, timestamp}`, or the fallback shape when the
    /// service is unreachable.
    pub async fn analyze_market(&self, query: &str) -> Result<Value> {
        let request = MarketQueryRequest {
            query: query.to_string(),
            model: self.model.clone(),
            temperature: 0.2,
        };

        let outcome = async {
            let body = serde_json::to_value(&request)?;
            let response = self.transport.post_json("/analyze", &body).await?;
            decode::<MarketQueryResponse>(self.transport.service(), response)
        }
        .await;

        match outcome {
            Ok(response) => {
                info!(query_len = query.len(), "Market query answered");
                Ok(json!({
                    "query": query,
                    "answer": response.answer,
                    "timestamp": response.timestamp,
                }))
            }
            Err(e) if e.is_unreachable() => {
                warn!(error = %e, "Market query unreachable, returning fallback");
                Ok(serde_json::to_value(degraded(None, Some(query), &e))?)
            }
            Err(e) => Err(e),
        }
    }
}
