//! Core data models for the meta supervisor

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

//
// ================= Query =================
//

/// Incoming natural-language request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub query: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl Query {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            session_id: None,
        }
    }
}

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    MarketAnalysis,
    StrategyCreation,
    Backtest,
    StrategyExecution,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::MarketAnalysis => "market_analysis",
            Intent::StrategyCreation => "strategy_creation",
            Intent::Backtest => "backtest",
            Intent::StrategyExecution => "strategy_execution",
            Intent::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity name → extracted value. Ordered so results compare and print stably.
pub type Entities = BTreeMap<String, String>;

pub const STOCK_CODE: &str = "stock_code";
pub const ANALYSIS_TYPE: &str = "analysis_type";

/// Output of the extractor, consumed once by the router
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentAnalysisResult {
    pub intent: Intent,
    pub entities: Entities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl IntentAnalysisResult {
    pub fn new(intent: Intent, entities: Entities) -> Self {
        Self {
            intent,
            entities,
            confidence: None,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&str> {
        self.entities.get(name).map(String::as_str)
    }
}

//
// ================= Backend Requests =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketAnalysisRequest {
    pub symbol: String,
    pub analysis_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingStrategyRequest {
    pub parameters: Map<String, Value>,
}

/// Backend-specific request built by a dispatch entry
#[derive(Debug, Clone, PartialEq)]
pub enum BackendRequest {
    MarketAnalysis(MarketAnalysisRequest),
    StrategyCreation(TradingStrategyRequest),
}

impl BackendRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendRequest::MarketAnalysis(_) => "market_analysis",
            BackendRequest::StrategyCreation(_) => "strategy_creation",
        }
    }
}

//
// ================= Backend Responses =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketAnalysisResponse {
    pub report: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradingStrategyResponse {
    pub strategy_id: String,
    #[serde(default)]
    pub backtest_result: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_url: Option<String>,
}

/// Answer substituted when a backend with a fallback policy is unreachable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DegradedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub answer: String,
    pub source: String,
    pub status: String,
    pub error: String,
    pub timestamp: String,
}

/// Normalized backend payload; serialized as the variant's own shape
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum BackendResponse {
    MarketAnalysis(MarketAnalysisResponse),
    StrategyCreation(TradingStrategyResponse),
    Degraded(DegradedResponse),
}

impl BackendResponse {
    pub fn is_degraded(&self) -> bool {
        matches!(self, BackendResponse::Degraded(_))
    }
}

//
// ================= Agent-path Services =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQueryRequest {
    pub query: String,
    pub model: String,
    pub temperature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQueryResponse {
    pub answer: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeChatResponse {
    pub role: String,
    pub content: String,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: Value,
    pub error: Option<String>,
}

//
// ================= Answer-only Response =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerResponse {
    pub answer: String,
}
