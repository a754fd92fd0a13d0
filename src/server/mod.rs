pub mod api;
pub mod websocket;

use crate::cli::Args;
use crate::config::preferences::PreferenceStore;
use crate::entities::{ EntityStore, UserService };
use crate::llm::chat::ChatClient;
use crate::predictor::CasePredictor;
use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;
use url::Url;

/// Everything a connection or HTTP handler needs, shared across tasks.
#[derive(Clone)]
pub struct AppState {
    pub chat_client: Arc<dyn ChatClient>,
    pub predictor: Arc<CasePredictor>,
    pub preferences: Arc<RwLock<PreferenceStore>>,
    pub entities: Arc<dyn EntityStore>,
    pub users: Arc<dyn UserService>,
    pub assistant_url: Url,
    pub voice_enabled: bool,
}

pub struct Server {
    addr: String,
    state: AppState,
    api_key: Option<String>,
    args: Args,
}

impl Server {
    pub fn new(addr: String, state: AppState, api_key: Option<String>, args: Args) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());

        if api_key.is_some() {
            info!("Server configured with API Key authentication.");
        } else {
            warn!("Server configured WITHOUT API Key authentication. Connections are open.");
        }

        Self { addr, state, api_key, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.args.enable_http_api {
            self.start_http_server(self.args.http_port).await?;
        }

        self.start_ws_server().await?;

        Ok(())
    }

    async fn start_http_server(&self, http_port: u16) -> Result<(), Box<dyn Error + Send + Sync>> {
        api::start_http_server(http_port, self.state.clone(), self.args.clone()).await
    }

    async fn start_ws_server(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        websocket::start_ws_server(
            &self.addr,
            self.state.clone(),
            self.api_key.clone(),
            self.args.clone()
        ).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::entities::mock::{ MockEntityStore, MockUserService };
    use crate::llm::chat::mock::MockChatClient;
    use tempfile::TempDir;

    pub fn state_with(
        client: MockChatClient,
        entities: MockEntityStore,
        users: MockUserService
    ) -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let prefs = PreferenceStore::load(dir.path().join("preferences.json")).unwrap();
        let client: Arc<dyn ChatClient> = Arc::new(client);
        let state = AppState {
            chat_client: client.clone(),
            predictor: Arc::new(CasePredictor::new(client)),
            preferences: Arc::new(RwLock::new(prefs)),
            entities: Arc::new(entities),
            users: Arc::new(users),
            assistant_url: Url::parse("http://localhost:4000/assistant").unwrap(),
            voice_enabled: true,
        };
        (state, dir)
    }

    pub fn state(client: MockChatClient) -> (AppState, TempDir) {
        state_with(client, MockEntityStore::default(), MockUserService::default())
    }
}
