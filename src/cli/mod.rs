use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Type of LLM provider (gateway, openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "gateway")]
    pub chat_llm_type: String,

    /// Base URL for the LLM provider API (required for the gateway provider)
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    /// API Key for the LLM provider
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-4o, llama3.1). Ignored by the gateway.
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    // --- Entity API Args ---
    /// Base URL of the entity API serving cases, news, experts and the auth endpoints
    #[arg(long, env = "ENTITY_BASE_URL", default_value = "http://127.0.0.1:8000/api")]
    pub entity_base_url: String,

    /// API Key sent to the entity API
    #[arg(long, env = "ENTITY_API_KEY")]
    pub entity_api_key: Option<String>,

    // --- Preferences Args ---
    /// Path to the JSON file holding theme and language preferences
    #[arg(long, env = "PREFERENCES_PATH", default_value = "data/preferences.json")]
    pub preferences_path: String,

    // --- Server Args ---
    /// Host address and port for the WebSocket server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Optional API Key required for clients to connect. If set, clients must provide this key.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Enable the HTTP API next to the WebSocket server
    #[arg(long, env = "ENABLE_HTTP_API", default_value_t = true, action = clap::ArgAction::Set)]
    pub enable_http_api: bool,

    /// Port for the HTTP API (same host as SERVER_ADDR)
    #[arg(long, env = "HTTP_PORT", default_value = "4001")]
    pub http_port: u16,

    /// Public URL of the assistant page. Voice transcripts are appended to it as `?voice=`.
    #[arg(long, env = "ASSISTANT_URL", default_value = "http://localhost:4000/assistant")]
    pub assistant_url: String,

    /// Allow clients to use speech recognition
    #[arg(long, env = "ENABLE_VOICE", default_value_t = true, action = clap::ArgAction::Set)]
    pub enable_voice: bool,

    /// Optional path to the TLS certificate file (PEM format) for enabling WSS. Requires --tls-key.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling WSS. Requires --tls-cert.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn chat_api_key(&self) -> Option<String> {
        if self.chat_api_key.is_empty() { None } else { Some(self.chat_api_key.clone()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_without_flags() {
        let args = Args::parse_from(["aidlex-assistant"]);
        assert_eq!(args.chat_llm_type, "gateway");
        assert_eq!(args.server_addr, "127.0.0.1:4000");
        assert!(args.chat_api_key().is_none());
        assert!(args.enable_voice);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "aidlex-assistant",
            "--chat-llm-type",
            "openai",
            "--chat-api-key",
            "sk-test",
            "--http-port",
            "9000",
            "--enable-voice",
            "false",
        ]);
        assert_eq!(args.chat_llm_type, "openai");
        assert_eq!(args.chat_api_key().as_deref(), Some("sk-test"));
        assert_eq!(args.http_port, 9000);
        assert!(!args.enable_voice);
    }
}
