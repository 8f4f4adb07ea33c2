//! Tests for REST API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use meta_supervisor::{
    adapters::MarketQueryService,
    agent::{create_default_registry, AgentService, AgentTool, ConversationalAgent},
    api::{create_router, ApiState},
    middleware::CORRELATION_ID_HEADER,
    supervisor::Supervisor,
    OrchestrationError, Result,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Backend double answering every call with the same payload
struct CannedTransport {
    reply: Value,
    calls: AtomicUsize,
}

impl CannedTransport {
    fn new(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl meta_supervisor::transport::HttpTransport for CannedTransport {
    fn service(&self) -> &str {
        "Canned"
    }

    async fn call(
        &self,
        _method: Method,
        _endpoint: &str,
        _params: Option<&Value>,
        _body: Option<&Value>,
    ) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.clone())
    }
}

enum AgentReply {
    Answer(Option<Value>),
    Fail,
    Crash,
}

struct ScriptedAgent(AgentReply);

#[async_trait::async_trait]
impl ConversationalAgent for ScriptedAgent {
    async fn invoke(&self, _query: &str, _tools: &[Arc<dyn AgentTool>]) -> Result<Option<Value>> {
        match &self.0 {
            AgentReply::Answer(value) => Ok(value.clone()),
            AgentReply::Fail => Err(OrchestrationError::Agent("LLM unreachable".into())),
            AgentReply::Crash => panic!("agent state corrupted"),
        }
    }
}

struct TestApp {
    router: Router,
    market: Arc<CannedTransport>,
}

/// Create test router
fn create_test_app(agent: AgentReply) -> TestApp {
    let market = CannedTransport::new(json!({
        "report": "삼성전자는 단기 상승 추세입니다.",
        "data": {"rsi": 61.2},
        "answer": "시장 분석 결과",
        "timestamp": "2026-10-18T09:00:00Z"
    }));
    let trading = CannedTransport::new(json!({"strategy_id": "st-7", "backtest_result": {}}));

    let supervisor =
        Supervisor::with_transports(market.clone(), trading, Duration::from_secs(5)).unwrap();

    let market_service = Arc::new(MarketQueryService::new(market.clone(), "gpt-4o-mini"));
    let agent_service = AgentService::new(
        Box::new(ScriptedAgent(agent)),
        create_default_registry(market_service.clone(), None),
        market_service,
    );

    TestApp {
        router: create_router(ApiState {
            supervisor: Arc::new(supervisor),
            agent_service: Arc::new(agent_service),
        }),
        market,
    }
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    let app = create_test_app(AgentReply::Answer(None));

    let response = app
        .router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(CORRELATION_ID_HEADER).is_none());
    assert_eq!(read_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(AgentReply::Answer(None));

    let response = app
        .router
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "Meta Supervisor");
    assert!(body["version"].is_string());
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_process_market_analysis() {
    let app = create_test_app(AgentReply::Answer(None));

    let response = app
        .router
        .oneshot(post_json("/api/process", json!({"query": "005930 분석해줘"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let correlation_id = response
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap();
    assert!(correlation_id.starts_with("req-"));

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["report"], "삼성전자는 단기 상승 추세입니다.");
    assert!(body["error_code"].is_null());
    assert_eq!(app.market.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_process_unknown_intent() {
    let app = create_test_app(AgentReply::Answer(None));

    let response = app
        .router
        .oneshot(post_json("/api/process", json!({"query": "오늘 날씨 어때?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    assert_eq!(body["error_code"], "UNSUPPORTED_INTENT");
    assert_eq!(app.market.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_process_missing_stock_code() {
    let app = create_test_app(AgentReply::Answer(None));

    let response = app
        .router
        .oneshot(post_json("/api/process", json!({"query": "삼성전자 차트 보여줘"})))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["error_code"], "MISSING_PARAMETER");
    assert!(body["error_message"].as_str().unwrap().contains("stock_code"));
    assert_eq!(app.market.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_process_missing_query_field() {
    let app = create_test_app(AgentReply::Answer(None));

    let response = app
        .router
        .oneshot(post_json("/api/process", json!({"user_id": "u-1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_query_extracts_last_message() {
    let app = create_test_app(AgentReply::Answer(Some(json!({
        "messages": [
            {"role": "user", "content": "삼성전자 전망은?"},
            {"role": "assistant", "content": "AI 응답"}
        ]
    }))));

    let response = app
        .router
        .oneshot(post_json("/api/query", json!({"query": "삼성전자 전망은?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!({"answer": "AI 응답"}));
}

#[tokio::test]
async fn test_query_without_agent_result() {
    let app = create_test_app(AgentReply::Answer(None));

    let response = app
        .router
        .oneshot(post_json("/api/query", json!({"query": "질문"})))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["answer"], "응답을 처리할 수 없습니다.");
}

#[tokio::test]
async fn test_query_failure_is_still_an_answer() {
    let app = create_test_app(AgentReply::Fail);

    let response = app
        .router
        .oneshot(post_json("/api/query", json!({"query": "질문"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["answer"].as_str().unwrap().contains("LLM unreachable"));
}

#[tokio::test]
async fn test_agent_endpoint_envelope() {
    let app = create_test_app(AgentReply::Answer(Some(json!("매수 의견"))));

    let response = app
        .router
        .oneshot(post_json("/api/agent", json!({"query": "삼성전자 어때?"})))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "매수 의견");

    let app = create_test_app(AgentReply::Fail);
    let response = app
        .router
        .oneshot(post_json("/api/agent", json!({"query": "삼성전자 어때?"})))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "INTERNAL_SERVER_ERROR");
}

#[tokio::test]
async fn test_agent_panic_becomes_failure_envelope() {
    let app = create_test_app(AgentReply::Crash);

    let response = app
        .router
        .oneshot(post_json("/api/agent", json!({"query": "삼성전자 어때?"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    assert_eq!(body["error_code"], "INTERNAL_SERVER_ERROR");
    assert!(body["error_message"]
        .as_str()
        .unwrap()
        .contains("agent state corrupted"));
}
