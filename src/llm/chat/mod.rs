pub mod gateway;
pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use super::{ LlmConfig, LlmType };
use self::gateway::GatewayClient;
use self::ollama::OllamaClient;
use self::openai::OpenAIChatClient;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM client configuration error: {0}")]
    Config(String),
    #[error("LLM request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("LLM endpoint returned status {status}: {body}")]
    Status {
        status: u16,
        body: String,
    },
    #[error("Malformed LLM response: {0}")]
    Malformed(String),
}

/// Body of one invocation. Serialised as-is for the hosted gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvokeRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub add_context_from_internet: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_json_schema: Option<JsonValue>,
}

impl InvokeRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            add_context_from_internet: false,
            response_json_schema: None,
        }
    }

    pub fn structured(prompt: impl Into<String>, schema: JsonValue) -> Self {
        Self {
            prompt: prompt.into(),
            add_context_from_internet: false,
            response_json_schema: Some(schema),
        }
    }

    pub fn with_internet_context(mut self) -> Self {
        self.add_context_from_internet = true;
        self
    }

    pub fn wants_object(&self) -> bool {
        self.response_json_schema.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InvokeResult {
    Text(String),
    Object(JsonValue),
}

impl InvokeResult {
    pub fn into_text(self) -> String {
        match self {
            InvokeResult::Text(text) => text,
            InvokeResult::Object(value) => value.to_string(),
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResult, LlmError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

/// Turns provider text into the result shape the request asked for.
/// Structured requests must yield a JSON object or array.
pub fn shape_text_reply(request: &InvokeRequest, text: String) -> Result<InvokeResult, LlmError> {
    if !request.wants_object() {
        return Ok(InvokeResult::Text(text));
    }
    let body = strip_code_fence(&text);
    match serde_json::from_str::<JsonValue>(body) {
        Ok(value @ (JsonValue::Object(_) | JsonValue::Array(_))) => Ok(InvokeResult::Object(value)),
        Ok(other) => Err(LlmError::Malformed(format!("expected a JSON object, got {}", other))),
        Err(e) => Err(LlmError::Malformed(format!("reply is not JSON: {}", e))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn new_client(config: &LlmConfig) -> Result<Arc<dyn ChatClient>, LlmError> {
    let client: Arc<dyn ChatClient> = match config.llm_type {
        LlmType::Gateway => {
            let specific_client = GatewayClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::OpenAI => {
            let specific_client = OpenAIChatClient::from_config(config)?;
            Arc::new(specific_client)
        }
        LlmType::Ollama => {
            let specific_client = OllamaClient::from_config(config)?;
            Arc::new(specific_client)
        }
    };
    Ok(client)
}

pub(crate) async fn error_for_status(resp: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Status { status: status.as_u16(), body })
}
