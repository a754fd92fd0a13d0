use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use serde_json::Value as JsonValue;
use async_trait::async_trait;
use super::{ error_for_status, shape_text_reply, ChatClient, InvokeRequest, InvokeResult, LlmError };
use crate::llm::LlmConfig;
use log::debug;

#[derive(Debug)]
pub struct OllamaClient {
    http: HttpClient,
    base_url: String,
    completion_model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a JsonValue>,
}

#[derive(Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, completion_model: Option<String>) -> Self {
        let model = completion_model.unwrap_or_else(|| "llama3.1".to_string());
        let url = base_url.unwrap_or_else(|| "http://localhost:11434".into());

        Self {
            http: HttpClient::new(),
            base_url: url,
            completion_model: model,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.llm_type != crate::llm::LlmType::Ollama {
            return Err(LlmError::Config("Invalid config type for OllamaClient".to_string()));
        }

        Ok(Self::new(config.base_url.clone(), config.completion_model.clone()))
    }

    pub async fn generate(&self, request: &InvokeRequest) -> Result<GenerateResponse, LlmError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let req = GenerateRequest {
            model: &self.completion_model,
            prompt: &request.prompt,
            stream: false,
            format: request.response_json_schema.as_ref(),
        };
        let resp = self.http.post(&url).json(&req).send().await?;
        let data = error_for_status(resp).await?
            .json::<GenerateResponse>().await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;
        Ok(data)
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResult, LlmError> {
        if request.add_context_from_internet {
            debug!("Ollama provider ignores add_context_from_internet");
        }
        let gen_resp = self.generate(request).await?;
        shape_text_reply(request, gen_resp.response)
    }

    fn get_model(&self) -> String {
        self.completion_model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmType;
    use serde_json::json;

    #[test]
    fn rejects_foreign_config() {
        let config = LlmConfig { llm_type: LlmType::Gateway, ..Default::default() };
        assert!(OllamaClient::from_config(&config).is_err());
    }

    #[test]
    fn schema_is_sent_as_format() {
        let schema = json!({ "type": "object" });
        let req = GenerateRequest { model: "m", prompt: "p", stream: false, format: Some(&schema) };
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(body["format"]["type"], "object");
        assert_eq!(body["stream"], false);
    }
}
