//! Tools callable by the conversational agent
//!
//! Each tool wraps one backend service and describes its input as a JSON
//! schema so the model can call it.

use crate::adapters::{MarketQueryService, TradeChatService};
use crate::error::OrchestrationError;
use crate::models::{ToolInput, ToolOutput};
use crate::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait::async_trait]
pub trait AgentTool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of `ToolInput::parameters`
    fn parameters(&self) -> Value;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up tools by name
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn AgentTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn AgentTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn AgentTool>> {
        self.tools.get(name).cloned()
    }

    /// All tools, sorted by name
    pub fn all(&self) -> Vec<Arc<dyn AgentTool>> {
        let mut tools: Vec<_> = self.tools.values().cloned().collect();
        tools.sort_by_key(|t| t.name());
        tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn require_str<'a>(input: &'a ToolInput, key: &str) -> Result<&'a str> {
    input
        .parameters
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            OrchestrationError::Agent(format!(
                "Expected '{}' in {} tool input",
                key, input.tool_name
            ))
        })
}

pub struct MarketAnalysisTool {
    service: Arc<MarketQueryService>,
}

impl MarketAnalysisTool {
    pub fn new(service: Arc<MarketQueryService>) -> Self {
        Self { service }
    }
}

#[async_trait::async_trait]
impl AgentTool for MarketAnalysisTool {
    fn name(&self) -> &'static str {
        "market_analysis"
    }

    fn description(&self) -> &'static str {
        "시장 분석 에이전트 - company fundamentals, sector trends, economic indicators \
         and market sentiment research for investment decisions"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Market research question, e.g. '삼성전자 기업 분석', '반도체 산업 전망'"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let query = require_str(input, "query")?;
        let data = self.service.analyze_market(query).await?;
        let error = data.get("error").map(|e| match e.as_str() {
            Some(text) => text.to_string(),
            None => e.to_string(),
        });

        Ok(ToolOutput {
            success: error.is_none(),
            data,
            error,
        })
    }
}

pub struct TradingTool {
    service: Arc<TradeChatService>,
}

impl TradingTool {
    pub fn new(service: Arc<TradeChatService>) -> Self {
        Self { service }
    }
}

#[async_trait::async_trait]
impl AgentTool for TradingTool {
    fn name(&self) -> &'static str {
        "trading"
    }

    fn description(&self) -> &'static str {
        "매매 에이전트 - chart analysis, technical indicators (RSI, MACD, Bollinger Bands), \
         trading strategies and portfolio risk assessment"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Trading question or instruction, e.g. 'RSI 지표 확인', '매수 시점 분석'"
                }
            },
            "required": ["message"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let message = require_str(input, "message")?;
        let response = self.service.send_query(message).await;
        let success = response.role != "error";
        let error = (!success).then(|| response.content.clone());

        Ok(ToolOutput {
            success,
            data: json!({
                "role": response.role,
                "content": response.content,
                "success": success,
            }),
            error,
        })
    }
}

/// Registry with the market analysis tool and, when enabled, the trading tool
pub fn create_default_registry(
    market: Arc<MarketQueryService>,
    trading: Option<Arc<TradeChatService>>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(MarketAnalysisTool::new(market)));
    if let Some(trading) = trading {
        registry.register(Arc::new(TradingTool::new(trading)));
    }
    registry
}
