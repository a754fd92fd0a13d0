use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde_json::Value as JsonValue;

use super::{ error_for_status, shape_text_reply, ChatClient, InvokeRequest, InvokeResult, LlmError };
use crate::llm::LlmConfig;

const INVOKE_ROUTE: &str = "/integrations/Core/InvokeLLM";

/// Client for the hosted invocation endpoint. The request body is forwarded
/// unchanged; the endpoint itself handles web context and schemas.
pub struct GatewayClient {
    http: HttpClient,
    base_url: String,
    model: String,
}

impl GatewayClient {
    pub fn new(base_url: String, api_key: Option<String>, model: Option<String>) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            headers.insert(
                "api_key",
                HeaderValue::from_str(&key).map_err(|e|
                    LlmError::Config(format!("Invalid API key format: {}", e))
                )?
            );
        }

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            base_url,
            model: model.unwrap_or_else(|| "gateway-default".to_string()),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let base_url = config.base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| LlmError::Config("Gateway base URL is required".to_string()))?;
        Self::new(base_url, config.api_key.clone(), config.completion_model.clone())
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), INVOKE_ROUTE)
    }
}

/// The gateway answers free-form requests with a JSON string and structured
/// ones with the object itself.
pub(crate) fn decode_gateway_body(request: &InvokeRequest, body: JsonValue) -> Result<InvokeResult, LlmError> {
    if let JsonValue::String(text) = body {
        return shape_text_reply(request, text);
    }
    if body.is_null() {
        return Err(LlmError::Malformed("empty gateway response".to_string()));
    }
    if request.wants_object() && (body.is_object() || body.is_array()) {
        return Ok(InvokeResult::Object(body));
    }
    match body.get("response").and_then(JsonValue::as_str) {
        Some(text) => Ok(InvokeResult::Text(text.to_string())),
        None => Ok(InvokeResult::Text(body.to_string())),
    }
}

#[async_trait]
impl ChatClient for GatewayClient {
    async fn invoke(&self, request: &InvokeRequest) -> Result<InvokeResult, LlmError> {
        let url = self.endpoint();
        debug!("Invoking gateway at {} (structured: {})", url, request.wants_object());
        let resp = self.http.post(&url).json(request).send().await?;
        let resp = error_for_status(resp).await?;
        let body: JsonValue = resp
            .json().await
            .map_err(|e| LlmError::Malformed(format!("gateway body is not JSON: {}", e)))?;
        decode_gateway_body(request, body)
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requires_base_url() {
        let config = LlmConfig::default();
        assert!(matches!(GatewayClient::from_config(&config), Err(LlmError::Config(_))));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = GatewayClient::new("https://api.example.test/".into(), None, None).unwrap();
        assert_eq!(client.endpoint(), "https://api.example.test/integrations/Core/InvokeLLM");
    }

    #[test]
    fn string_body_is_text() {
        let req = InvokeRequest::text("q");
        let out = decode_gateway_body(&req, json!("Article 21 protects life")).unwrap();
        assert_eq!(out, InvokeResult::Text("Article 21 protects life".into()));
    }

    #[test]
    fn object_body_for_structured_request() {
        let req = InvokeRequest::structured("q", json!({}));
        let out = decode_gateway_body(&req, json!({ "riskLevel": "Low" })).unwrap();
        assert_eq!(out, InvokeResult::Object(json!({ "riskLevel": "Low" })));
    }

    #[test]
    fn wrapped_text_body_is_unwrapped() {
        let req = InvokeRequest::text("q");
        let out = decode_gateway_body(&req, json!({ "response": "ok" })).unwrap();
        assert_eq!(out, InvokeResult::Text("ok".into()));
    }

    #[test]
    fn null_body_is_malformed() {
        let req = InvokeRequest::text("q");
        assert!(decode_gateway_body(&req, JsonValue::Null).is_err());
    }
}
