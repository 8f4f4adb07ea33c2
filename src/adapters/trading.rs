//! Trading strategy backend
//!
//! Strategy creation has no fallback: every failure reaches the caller.
//! The chat endpoint used by the agent tool folds failures into an
//! `error`-role message instead.

use super::{decode, mismatched, BackendAdapter};
use crate::models::{
    BackendRequest, BackendResponse, Entities, TradeChatRequest, TradeChatResponse,
    TradingStrategyRequest, TradingStrategyResponse,
};
use crate::transport::HttpTransport;
use crate::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::warn;

/// `strategy_creation` forwards every extracted entity as a parameter
pub fn build_strategy_request(entities: &Entities) -> Result<BackendRequest> {
    let parameters: Map<String, Value> = entities
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();

    Ok(BackendRequest::StrategyCreation(TradingStrategyRequest {
        parameters,
    }))
}

pub struct TradingStrategyAdapter {
    transport: Arc<dyn HttpTransport>,
}

impl TradingStrategyAdapter {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait::async_trait]
impl BackendAdapter for TradingStrategyAdapter {
    fn operation(&self) -> &'static str {
        "create_strategy"
    }

    fn description(&self) -> &'static str {
        "Create and backtest a trading strategy via /strategies"
    }

    fn build_request(&self, entities: &Entities) -> Result<BackendRequest> {
        build_strategy_request(entities)
    }

    async fn execute(&self, request: BackendRequest) -> Result<BackendResponse> {
        let BackendRequest::StrategyCreation(request) = &request else {
            return Err(mismatched(self.operation(), &request));
        };

        let body = serde_json::to_value(request)?;
        let response = self.transport.post_json("/strategies", &body).await?;
        let strategy: TradingStrategyResponse = decode(self.transport.service(), response)?;
        Ok(BackendResponse::StrategyCreation(strategy))
    }
}

/// Message-based chat with the trading server
pub struct TradeChatService {
    transport: Arc<dyn HttpTransport>,
}

impl TradeChatService {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Never fails; errors come back as `role == "error"`
    pub async fn send_query(&self, message: &str) -> TradeChatResponse {
        let outcome = async {
            let body = serde_json::to_value(TradeChatRequest {
                message: message.to_string(),
            })?;
            let response = self
                .transport
                .post_json("/api/agent/trade/chat", &body)
                .await?;
            decode::<TradeChatResponse>(self.transport.service(), response)
        }
        .await;

        outcome.unwrap_or_else(|e| {
            warn!(error = %e, "Trading chat failed");
            TradeChatResponse {
                role: "error".to_string(),
                content: e.to_string(),
            }
        })
    }
}
