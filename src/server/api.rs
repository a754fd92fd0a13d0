use crate::cli::Args;
use crate::config::preferences::Theme;
use crate::entities::{
    filter_documents,
    filter_experts,
    filter_news,
    list_entities,
    news_categories,
    sample_documents,
    EntityError,
    SortKey,
    ALL_CATEGORIES,
};
use crate::i18n::{ locale_bundle, Language };
use crate::models::legal::{ LegalCase, LegalExpert, LegalNews };
use crate::predictor::{ CaseDetails, PredictorError, CASE_TYPES, COURTS, SAMPLE_CASES };
use crate::server::AppState;

use std::error::Error;
use std::net::SocketAddr;
use axum::{
    routing::{ get, post },
    Json,
    Router,
    extract::{ Path, Query, State },
    response::{ IntoResponse, Redirect, Response },
    http::{ header, HeaderMap, StatusCode },
};
use serde::{ Deserialize, Serialize };
use serde_json::json;
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, error, warn };

#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    message: String,
}

fn failure(code: StatusCode, message: impl Into<String>) -> Response {
    (code, Json(ApiResponse { success: false, message: message.into() })).into_response()
}

fn entity_failure(e: EntityError) -> Response {
    match e {
        EntityError::InvalidSortKey(_) => failure(StatusCode::BAD_REQUEST, e.to_string()),
        other => {
            error!("Entity API error: {}", other);
            failure(StatusCode::BAD_GATEWAY, other.to_string())
        }
    }
}

#[derive(Deserialize, Default)]
pub struct ListQuery {
    pub sort: Option<String>,
    pub limit: Option<usize>,
    pub category: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    fn sort_key(&self) -> Result<Option<SortKey>, EntityError> {
        self.sort.as_deref().map(str::parse).transpose()
    }

    fn category(&self) -> &str {
        self.category.as_deref().unwrap_or(ALL_CATEGORIES)
    }
}

#[derive(Deserialize)]
pub struct PreferencesUpdate {
    pub theme: Option<String>,
    pub language: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub from_url: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/i18n/{lang}", get(i18n_handler))
        .route("/api/preferences", get(get_preferences_handler).put(put_preferences_handler))
        .route("/api/predict", post(predict_handler))
        .route("/api/predict/options", get(predict_options_handler))
        .route("/api/cases", get(cases_handler))
        .route("/api/news", get(news_handler))
        .route("/api/experts", get(experts_handler))
        .route("/api/documents", get(documents_handler))
        .route("/api/me", get(me_handler))
        .route("/api/login", get(login_handler))
        .route("/api/logout", post(logout_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    http_port: u16,
    state: AppState,
    args: Args
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let addr = format!("0.0.0.0:{}", http_port).parse::<SocketAddr>()?;
    info!("Starting HTTP API server on: http://{}", addr);

    let app = router(state);

    match (args.enable_tls, &args.tls_cert_path, &args.tls_key_path) {
        (true, Some(cert_path), Some(key_path)) => {
            let tls_config = axum_server::tls_rustls::RustlsConfig
                ::from_pem_file(cert_path, key_path).await?;

            tokio::spawn(async move {
                let result = axum_server
                    ::bind_rustls(addr, tls_config)
                    .serve(app.into_make_service()).await;

                if let Err(e) = result {
                    error!("HTTPS server error: {}", e);
                }
            });

            info!("HTTPS server started with TLS enabled");
        }
        _ => {
            tokio::spawn(async move {
                match tokio::net::TcpListener::bind(addr).await {
                    Ok(listener) => {
                        if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                            error!("HTTP server error: {}", e);
                        }
                    }
                    Err(e) => {
                        error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
                    }
                }
            });

            info!("HTTP server started");
        }
    }

    Ok(())
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(
        json!({
            "status": "ok",
            "model": state.chat_client.get_model(),
            "voice": state.voice_enabled,
        })
    )
}

async fn i18n_handler(Path(lang): Path<String>) -> impl IntoResponse {
    Json(locale_bundle(Language::from_code_or_default(Some(&lang))))
}

async fn get_preferences_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.preferences.read().await.get())
}

async fn put_preferences_handler(
    State(state): State<AppState>,
    Json(update): Json<PreferencesUpdate>
) -> Response {
    let mut store = state.preferences.write().await;
    if let Some(theme) = update.theme {
        let theme = theme.parse::<Theme>().unwrap_or_else(|e| {
            warn!("{}, using default", e);
            Theme::Default
        });
        if let Err(e) = store.set_theme(theme) {
            error!("Failed to save theme: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    }
    if let Some(code) = update.language {
        if let Err(e) = store.set_language(Language::from_code_or_default(Some(&code))) {
            error!("Failed to save language: {}", e);
            return failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    }
    Json(store.get()).into_response()
}

async fn predict_handler(State(state): State<AppState>, Json(details): Json<CaseDetails>) -> Response {
    match state.predictor.predict(&details).await {
        Ok(result) => Json(result).into_response(),
        Err(e @ PredictorError::MissingField(_)) => failure(StatusCode::BAD_REQUEST, e.to_string()),
        Err(e) => failure(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

async fn predict_options_handler() -> impl IntoResponse {
    Json(
        json!({
            "caseTypes": CASE_TYPES,
            "courts": COURTS,
            "sampleCases": SAMPLE_CASES,
        })
    )
}

async fn cases_handler(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let sort = match query.sort_key() {
        Ok(sort) => sort,
        Err(e) => {
            return entity_failure(e);
        }
    };
    match list_entities::<LegalCase>(state.entities.as_ref(), sort, query.limit).await {
        Ok(cases) => Json(cases).into_response(),
        Err(e) => entity_failure(e),
    }
}

async fn news_handler(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let sort = match query.sort_key() {
        Ok(sort) => sort,
        Err(e) => {
            return entity_failure(e);
        }
    };
    match list_entities::<LegalNews>(state.entities.as_ref(), sort, query.limit).await {
        Ok(news) => {
            let items = filter_news(&news, query.category());
            Json(json!({ "items": items, "categories": news_categories(&news) })).into_response()
        }
        Err(e) => entity_failure(e),
    }
}

async fn experts_handler(State(state): State<AppState>, Query(query): Query<ListQuery>) -> Response {
    let sort = match query.sort_key() {
        Ok(sort) => sort,
        Err(e) => {
            return entity_failure(e);
        }
    };
    match list_entities::<LegalExpert>(state.entities.as_ref(), sort, query.limit).await {
        Ok(experts) => {
            let items = filter_experts(&experts, query.q.as_deref().unwrap_or(""));
            Json(items).into_response()
        }
        Err(e) => entity_failure(e),
    }
}

async fn documents_handler(Query(query): Query<ListQuery>) -> impl IntoResponse {
    let documents = sample_documents();
    let items = filter_documents(&documents, query.q.as_deref().unwrap_or(""), query.category());
    Json(json!({ "items": items }))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn me_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.users.me(bearer_token(&headers)).await {
        Ok(Some(user)) => {
            let initials = user.initials();
            Json(json!({ "user": user, "initials": initials })).into_response()
        }
        Ok(None) => Json(json!({ "user": null, "initials": "AU" })).into_response(),
        Err(e) => {
            error!("Failed to load current user: {}", e);
            failure(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

async fn login_handler(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Redirect {
    let return_to = query.from_url.unwrap_or_else(|| state.assistant_url.to_string());
    Redirect::to(&state.users.login_url(&return_to))
}

async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.users.logout(bearer_token(&headers)).await {
        Ok(()) => Json(ApiResponse { success: true, message: "Logged out".into() }).into_response(),
        Err(e) => failure(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}
