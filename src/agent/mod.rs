//! Conversational-agent path
//!
//! QUERY → AGENT (model + tools) → RAW RESULT
//!
//! Runs beside the dispatch-table path. The agent decides which tools to
//! call; this module only hands it the query and the registered tools.

use crate::adapters::MarketQueryService;
use crate::error::OrchestrationError;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub mod llm;
pub mod tools;

pub use llm::{ChatClient, ToolCallingAgent};
pub use tools::{create_default_registry, AgentTool, ToolRegistry};

/// Anything that can answer a free-form query with the given tools.
///
/// The result is a string, a message-bearing object, or nothing at all;
/// `envelope::extract_answer` turns any of them into display text.
#[async_trait::async_trait]
pub trait ConversationalAgent: Send + Sync {
    async fn invoke(&self, query: &str, tools: &[Arc<dyn AgentTool>]) -> Result<Option<Value>>;
}

pub struct AgentService {
    agent: Box<dyn ConversationalAgent>,
    tools: ToolRegistry,
    market: Arc<MarketQueryService>,
    timeout: Option<Duration>,
}

impl AgentService {
    pub fn new(
        agent: Box<dyn ConversationalAgent>,
        tools: ToolRegistry,
        market: Arc<MarketQueryService>,
    ) -> Self {
        Self {
            agent,
            tools,
            market,
            timeout: None,
        }
    }

    /// Bound every agent run (all model and tool rounds) by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// `{"intent": "agent_response", "result": ...}`
    pub async fn process_query(&self, query: &str) -> Result<Value> {
        let result = self.query_with_agent(query).await?;
        Ok(json!({
            "intent": "agent_response",
            "result": result,
        }))
    }

    /// Raw agent result for `query`
    pub async fn query_with_agent(&self, query: &str) -> Result<Option<Value>> {
        let start = Instant::now();
        let tools = self.tools.all();

        let invocation = self.agent.invoke(query, &tools);
        let outcome = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, invocation)
                .await
                .unwrap_or_else(|_| {
                    Err(OrchestrationError::Timeout(format!(
                        "agent did not answer within {:?}",
                        timeout
                    )))
                }),
            None => invocation.await,
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Ok(result) => info!(
                tool_count = tools.len(),
                answered = result.is_some(),
                elapsed_ms,
                "Agent query completed"
            ),
            Err(e) => warn!(error = %e, elapsed_ms, "Agent query failed"),
        }

        outcome
    }

    /// Fetch market analysis for `symbol` first, then let the agent answer
    /// `query` with that analysis as context.
    pub async fn analyze_market_with_context(
        &self,
        symbol: &str,
        query: &str,
    ) -> Result<Option<Value>> {
        let analysis = self
            .market
            .analyze_market(&format!("{} 종목 분석", symbol))
            .await?;

        let context = analysis
            .get("answer")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| analysis.to_string());

        let prompt = format!(
            "다음은 {} 종목에 대한 시장 분석 결과입니다:\n\n{}\n\n위 분석을 참고하여 질문에 답변해주세요: {}",
            symbol, context, query
        );

        self.query_with_agent(&prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::extract_answer;
    use crate::transport::testing::RecordingTransport;
    use std::sync::Mutex;

    /// Echoes a canned result and remembers what it was asked
    struct FakeAgent {
        reply: Option<Value>,
        fail: bool,
        seen: Arc<Mutex<Vec<(String, usize)>>>,
    }

    #[async_trait::async_trait]
    impl ConversationalAgent for FakeAgent {
        async fn invoke(
            &self,
            query: &str,
            tools: &[Arc<dyn AgentTool>],
        ) -> Result<Option<Value>> {
            self.seen
                .lock()
                .unwrap()
                .push((query.to_string(), tools.len()));
            if self.fail {
                return Err(OrchestrationError::Agent("model unavailable".into()));
            }
            Ok(self.reply.clone())
        }
    }

    fn service(reply: Option<Value>, fail: bool) -> (AgentService, Arc<Mutex<Vec<(String, usize)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let market = Arc::new(MarketQueryService::new(
            Arc::new(RecordingTransport::ok(
                "Market Analysis",
                json!({"answer": "반도체 업황 회복", "timestamp": "2026-10-18T09:00:00Z"}),
            )),
            "gpt-4o-mini",
        ));
        let agent = FakeAgent {
            reply,
            fail,
            seen: seen.clone(),
        };
        let tools = create_default_registry(market.clone(), None);
        (AgentService::new(Box::new(agent), tools, market), seen)
    }

    #[tokio::test]
    async fn test_process_query_wraps_result() {
        let (service, seen) = service(Some(json!({"messages": [{"content": "AI 응답"}]})), false);

        let value = service.process_query("삼성전자 전망").await.unwrap();
        assert_eq!(value["intent"], "agent_response");
        assert_eq!(extract_answer(Some(&value["result"])), "AI 응답");

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], ("삼성전자 전망".to_string(), 1));
    }

    #[tokio::test]
    async fn test_empty_agent_result() {
        let (service, _) = service(None, false);
        let result = service.query_with_agent("질문").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_agent_failure_propagates() {
        let (service, _) = service(None, true);
        let err = service.process_query("질문").await.unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_SERVER_ERROR");
        assert!(err.to_string().contains("model unavailable"));
    }

    struct StalledAgent;

    #[async_trait::async_trait]
    impl ConversationalAgent for StalledAgent {
        async fn invoke(
            &self,
            _query: &str,
            _tools: &[Arc<dyn AgentTool>],
        ) -> Result<Option<Value>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(Some(json!("too late")))
        }
    }

    #[tokio::test]
    async fn test_agent_run_is_bounded() {
        let market = Arc::new(MarketQueryService::new(
            Arc::new(RecordingTransport::ok("Market Analysis", json!({}))),
            "gpt-4o-mini",
        ));
        let service = AgentService::new(
            Box::new(StalledAgent),
            ToolRegistry::new(),
            market,
        )
        .with_timeout(Duration::from_millis(20));

        let err = service.process_query("질문").await.unwrap_err();
        assert_eq!(err.error_code(), "TIMEOUT");
    }

    #[tokio::test]
    async fn test_market_context_is_included() {
        let (service, seen) = service(Some(json!("매수 의견 유지")), false);

        let result = service
            .analyze_market_with_context("005930", "지금 매수해도 될까?")
            .await
            .unwrap();
        assert_eq!(result, Some(json!("매수 의견 유지")));

        let seen = seen.lock().unwrap();
        let prompt = &seen[0].0;
        assert!(prompt.contains("005930"));
        assert!(prompt.contains("반도체 업황 회복"));
        assert!(prompt.contains("지금 매수해도 될까?"));
    }
}
