use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value as JsonValue };

use super::{ error_for_status, shape_text_reply, ChatClient, InvokeRequest, InvokeResult, LlmError };
use crate::llm::LlmConfig;

pub struct OpenAIChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
}

#[derive(Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<bool>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, LlmError> {
        let chat_model = model.unwrap_or_else(|| "gpt-4o".to_string());
        let api_url = base_url.unwrap_or_else(|| "https://api.openai.com".to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| LlmError::Config(format!("Invalid API key format: {}", e)))?
        );

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LlmError::Config("OpenAI API key is required".to_string()))?;

        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }

    fn endpoint(&self) -> String {
        if self.base_url.ends_with("/chat/completions") {
            self.base_url.clone()
        } else {
            format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
        }
    }

    fn build_request(&self, request: &InvokeRequest) -> OpenAIChatRequest {
        let response_format = request.response_json_schema.as_ref().map(|schema| {
            json!({
                "type": "json_schema",
                "json_schema": { "name": "structured_response", "schema": schema }
            })
        });

        OpenAIChatRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: 1.0,
            response_format,
            max_completion_tokens: Some(2048),
            store: Some(false),
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResult, LlmError> {
        if request.add_context_from_internet {
            debug!("OpenAI provider ignores add_context_from_internet");
        }
        let req = self.build_request(request);
        let resp = self.http.post(self.endpoint()).json(&req).send().await?;
        let resp = error_for_status(resp).await?
            .json::<OpenAIResponse>().await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let content = resp.choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Malformed("No response from OpenAI API".to_string()))?
            .message.content;

        shape_text_reply(request, content)
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
