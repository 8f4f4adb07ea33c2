//! OpenAI-compatible chat client and tool-calling agent
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use super::tools::AgentTool;
use super::ConversationalAgent;
use crate::error::{excerpt, OrchestrationError};
use crate::models::ToolInput;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Upper bound on model ↔ tool round trips per query
const MAX_TOOL_ROUNDS: usize = 4;

const SYSTEM_PROMPT: &str = r#"You are a financial analysis assistant for stock market research.

Guidelines:
- Use the available tools for specific stock, sector or indicator questions
- Verify stock codes before requesting an analysis
- Explain what the tool data means instead of repeating it
- If a tool is unavailable, say what you could not check
- Answer in the language of the question (Korean or English)

Format: short sections (Overview, Analysis, Key Points) with bullet points.
Always note that this is information, not investment advice."#;

/// Reusable chat-completions client (connection-pooled)
pub struct ChatClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ChatClient {
    pub fn new(api_key: String, base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .map_err(|e| OrchestrationError::Config(format!("Failed to build LLM client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One chat completion; returns the assistant message
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatMessage> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::Config(
                "OPENAI_API_KEY not configured".to_string(),
            ));
        }

        let request = ChatRequest {
            model: &self.model,
            messages,
            tools,
            temperature: 0.2,
        };

        debug!(model = %self.model, message_count = messages.len(), "Calling chat completions");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("LLM request failed: {}", e);
                if e.is_timeout() {
                    OrchestrationError::Timeout(format!("LLM did not answer: {}", e))
                } else {
                    OrchestrationError::Agent(format!("LLM request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "LLM error response");
            return Err(OrchestrationError::Agent(format!(
                "LLM returned {}: {}",
                status,
                excerpt(&error_text, 200)
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse LLM response: {}", e);
            OrchestrationError::Agent(format!("LLM parse error: {}", e))
        })?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| OrchestrationError::Agent("No choices in LLM response".to_string()))
    }
}

/// Model-driven agent: asks, runs requested tools, asks again
pub struct ToolCallingAgent {
    client: ChatClient,
}

impl ToolCallingAgent {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }

    async fn run_tool(tools: &[Arc<dyn AgentTool>], call: &ToolCall) -> String {
        let Some(tool) = tools.iter().find(|t| t.name() == call.function.name) else {
            warn!(tool = %call.function.name, "Model requested unknown tool");
            return json!({"error": format!("Unknown tool: {}", call.function.name)}).to_string();
        };

        let parameters = match serde_json::from_str::<Value>(&call.function.arguments) {
            Ok(parameters) => parameters,
            Err(e) => {
                return json!({"error": format!("Invalid tool arguments: {}", e)}).to_string();
            }
        };

        let input = ToolInput {
            tool_name: call.function.name.clone(),
            parameters,
        };

        match tool.execute(&input).await {
            Ok(output) if output.success => output.data.to_string(),
            Ok(output) => {
                warn!(
                    tool = %call.function.name,
                    error = output.error.as_deref().unwrap_or("unknown"),
                    "Tool reported failure"
                );
                json!({"error": output.error, "data": output.data}).to_string()
            }
            Err(e) => {
                warn!(tool = %call.function.name, error = %e, "Tool execution failed");
                json!({"error": e.to_string()}).to_string()
            }
        }
    }
}

#[async_trait::async_trait]
impl ConversationalAgent for ToolCallingAgent {
    async fn invoke(&self, query: &str, tools: &[Arc<dyn AgentTool>]) -> Result<Option<Value>> {
        let specs: Vec<ToolSpec> = tools.iter().map(|t| ToolSpec::from_tool(t.as_ref())).collect();
        let mut messages = vec![
            ChatMessage::text("system", SYSTEM_PROMPT),
            ChatMessage::text("user", query),
        ];

        for round in 0..MAX_TOOL_ROUNDS {
            let reply = self.client.complete(&messages, &specs).await?;
            let calls = reply.tool_calls.clone().unwrap_or_default();
            messages.push(reply);

            if calls.is_empty() {
                info!(rounds = round + 1, model = %self.client.model(), "Agent answered");
                return Ok(Some(json!({ "messages": serde_json::to_value(&messages)? })));
            }

            for call in &calls {
                debug!(tool = %call.function.name, round, "Running tool call");
                let content = Self::run_tool(tools, call).await;
                messages.push(ChatMessage::tool_result(&call.id, content));
            }
        }

        Err(OrchestrationError::Agent(format!(
            "No final answer after {} tool rounds",
            MAX_TOOL_ROUNDS
        )))
    }
}

//
// ================= Wire Types =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: &str, content: String) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content),
            tool_calls: None,
            tool_call_id: Some(call_id.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize)]
struct FunctionSpec {
    name: &'static str,
    description: &'static str,
    parameters: Value,
}

impl ToolSpec {
    pub fn from_tool(tool: &dyn AgentTool) -> Self {
        Self {
            kind: "function",
            function: FunctionSpec {
                name: tool.name(),
                description: tool.description(),
                parameters: tool.parameters(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolSpec],
    temperature: f64,
}

fn no_tools(tools: &&[ToolSpec]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}
