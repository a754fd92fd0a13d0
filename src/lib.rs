pub mod assistant;
pub mod cli;
pub mod config;
pub mod entities;
pub mod i18n;
pub mod llm;
pub mod models;
pub mod predictor;
pub mod server;
pub mod voice;

use cli::Args;
use config::preferences::PreferenceStore;
use entities::HttpEntityStore;
use llm::{ LlmConfig, LlmType };
use llm::chat::new_client as new_chat_client;
use log::info;
use predictor::CasePredictor;
use server::{ AppState, Server };
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("HTTP API: {} (port {})", args.enable_http_api, args.http_port);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Base URL: {}", args.chat_base_url.as_deref().unwrap_or("adapter default"));
    info!("Entity API: {}", args.entity_base_url);
    info!("Preferences Path: {}", args.preferences_path);
    info!("Assistant URL: {}", args.assistant_url);
    info!("Voice Enabled: {}", args.enable_voice);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let chat_config = LlmConfig {
        llm_type: args.chat_llm_type.parse::<LlmType>()?,
        api_key: args.chat_api_key(),
        completion_model: args.chat_model.clone(),
        base_url: args.chat_base_url.clone(),
    };
    let chat_client = new_chat_client(&chat_config)?;
    info!(
        "Chat client configured: Type={}, Model={}, BaseURL={}",
        chat_config.llm_type,
        chat_client.get_model(),
        chat_client.get_base_url().as_deref().unwrap_or("adapter default")
    );

    let entity_store = Arc::new(
        HttpEntityStore::new(args.entity_base_url.clone(), args.entity_api_key.clone())
    );
    let preferences = PreferenceStore::load_or_default(&args.preferences_path);
    info!("Loaded preferences: language={}, theme={}", preferences.language(), preferences.theme());

    let state = AppState {
        chat_client: chat_client.clone(),
        predictor: Arc::new(CasePredictor::new(chat_client)),
        preferences: Arc::new(RwLock::new(preferences)),
        entities: entity_store.clone(),
        users: entity_store,
        assistant_url: Url::parse(&args.assistant_url)?,
        voice_enabled: args.enable_voice,
    };

    let addr = args.server_addr.clone();
    info!("Starting server on: {}", addr);
    let server = Server::new(addr, state, args.server_api_key.clone(), args);
    server.run().await?;

    Ok(())
}
