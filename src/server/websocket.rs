use crate::assistant::{ AssistantError, AssistantSession, PendingQuestion };
use crate::cli::Args;
use crate::i18n::Language;
use crate::models::websocket::{ ClientMessage, ServerMessage };
use crate::server::AppState;
use crate::voice::{ query_param, voice_query, ClientRecognizer, SpeechCapability, VoiceCapture };

use std::error::Error;
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::sync::mpsc::{ unbounded_channel, UnboundedSender };

use tokio_tungstenite::{ accept_hdr_async, WebSocketStream };
use tokio_tungstenite::tungstenite::handshake::server::{ ErrorResponse, Request, Response };
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_rustls::TlsAcceptor;

use rustls::ServerConfig;
use rustls::pki_types::{ CertificateDer, PrivateKeyDer };
use rustls_pemfile::{ certs, pkcs8_private_keys };

use lazy_static::lazy_static;
use governor::{ RateLimiter, Quota, state::{ InMemoryState, NotKeyed }, clock::DefaultClock };

use futures::{ Sink, SinkExt, StreamExt };
use log::{ debug, error, info, warn };

const MAX_MESSAGE_SIZE: usize = 1 * 1024 * 1024;
const API_KEY_PARAM: &str = "api_key";
const LANG_PARAM: &str = "lang";

lazy_static! {
    static ref CONNECTION_LIMITER: RateLimiter<NotKeyed, InMemoryState, DefaultClock> =
        RateLimiter::direct(Quota::per_second(NonZeroU32::new(10).unwrap()));
}

fn load_tls_config(
    cert_path: &str,
    key_path: &str
) -> Result<Arc<ServerConfig>, Box<dyn Error + Send + Sync>> {
    let cert_file = File::open(cert_path).map_err(|e|
        format!("Failed to open TLS certificate file '{}': {}", cert_path, e)
    )?;
    let key_file = File::open(key_path).map_err(|e|
        format!("Failed to open TLS key file '{}': {}", key_path, e)
    )?;

    let mut cert_reader = BufReader::new(cert_file);
    let mut key_reader = BufReader::new(key_file);
    let cert_chain: Vec<CertificateDer<'static>> = certs(&mut cert_reader)
        .collect::<Result<_, _>>()
        .map_err(|e| format!("Failed to read certificate(s): {}", e))?;

    let key = match pkcs8_private_keys(&mut key_reader).next() {
        Some(Ok(k)) => PrivateKeyDer::Pkcs8(k),
        Some(Err(e)) => {
            return Err(format!("Error reading private key: {}", e).into());
        }
        None => {
            return Err("No PKCS8 private key found in key file".into());
        }
    };

    let config = ServerConfig::builder().with_no_client_auth().with_single_cert(cert_chain, key)?;
    Ok(Arc::new(config))
}

pub async fn start_ws_server(
    addr: &str,
    state: AppState,
    api_key: Option<String>,
    args: Args
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    let tls_acceptor = if args.enable_tls {
        match (&args.tls_cert_path, &args.tls_key_path) {
            (Some(cert_path), Some(key_path)) => {
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    cert_path,
                    key_path
                );
                let config = load_tls_config(cert_path, key_path)?;
                Some(TlsAcceptor::from(config))
            }
            (Some(_), None) | (None, Some(_)) => {
                error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                return Err("Missing TLS certificate or key path".into());
            }
            (None, None) => {
                error!("--enable-tls was set but no certificate/key paths provided.");
                return Err("TLS enabled without cert/key".into());
            }
        }
    } else {
        info!("TLS not enabled. Running plain WebSocket (WS) server.");
        None
    };
    let protocol = if tls_acceptor.is_some() { "WSS" } else { "WS" };
    info!("{} server listening on: {}", protocol, addr);

    loop {
        let (stream, peer) = listener.accept().await?;

        if CONNECTION_LIMITER.check().is_err() {
            warn!("Global connection rate limit exceeded for {}. Dropping connection.", peer);
            continue;
        }

        info!("Incoming connection from: {}", peer);
        let state_clone = state.clone();
        let required_api_key = api_key.clone();
        let tls_acceptor_clone = tls_acceptor.clone();

        tokio::spawn(async move {
            let process_result = if let Some(acceptor) = tls_acceptor_clone {
                match acceptor.accept(stream).await {
                    Ok(tls_stream) => {
                        info!("TLS handshake successful for {}", peer);
                        process_connection(peer, tls_stream, state_clone, required_api_key).await
                    }
                    Err(e) => {
                        error!("TLS handshake error for {}: {}", peer, e);
                        Err(Box::new(e) as Box<dyn Error + Send + Sync>)
                    }
                }
            } else {
                process_connection(peer, stream, state_clone, required_api_key).await
            };

            if let Err(e) = process_result {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

/// API key from the `X-API-Key` header, or the `api_key` query parameter.
fn provided_api_key(req: &Request) -> Option<String> {
    req.headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
        .or_else(|| query_param(req.uri().query(), API_KEY_PARAM))
}

fn unauthorized() -> ErrorResponse {
    let mut resp = ErrorResponse::new(Some("Unauthorized".into()));
    *resp.status_mut() = StatusCode::UNAUTHORIZED;
    resp
}

async fn process_connection<S>(
    peer: SocketAddr,
    stream: S,
    state: AppState,
    required_api_key: Option<String>
) -> Result<(), Box<dyn Error + Send + Sync>>
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    let mut handshake_query: Option<String> = None;

    let auth_callback = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        info!("Handshake from {}", peer);
        handshake_query = req.uri().query().map(str::to_owned);

        if let Some(ref required) = required_api_key {
            if provided_api_key(req).as_deref() != Some(required.as_str()) {
                warn!("{}: bad or missing API key", peer);
                return Err(unauthorized());
            }
            info!("{} authenticated", peer);
        } else {
            debug!("{} no API key required", peer);
        }

        Ok(response)
    };

    let accepted = accept_hdr_async(stream, auth_callback).await;
    match accepted {
        Ok(ws) => {
            handle_connection(peer, ws, state, handshake_query).await;
            Ok(())
        }
        Err(e) => {
            error!("Handshake failed for {}: {}", peer, e);
            Err(Box::new(e) as _)
        }
    }
}

/// `lang` in the connection query wins over the stored preference.
async fn session_language(state: &AppState, query: Option<&str>) -> Language {
    match query_param(query, LANG_PARAM) {
        Some(code) => Language::from_code_or_default(Some(&code)),
        None => state.preferences.read().await.language(),
    }
}

async fn welcome(session: &AssistantSession, voice_available: bool) -> ServerMessage {
    let language = session.language().await;
    ServerMessage::Welcome {
        session_id: session.id().to_string(),
        language,
        voice_available,
        suggestions: language
            .suggested_questions()
            .iter()
            .map(|q| q.to_string())
            .collect(),
    }
}

/// Sends `processing` for an accepted question and answers it off the read
/// loop, so the connection keeps serving while the gateway call is
/// pending. A rejected submission gets an `error` instead.
fn dispatch(
    session: &Arc<AssistantSession>,
    out: &UnboundedSender<ServerMessage>,
    accepted: Result<PendingQuestion, AssistantError>
) {
    let pending = match accepted {
        Ok(pending) => pending,
        Err(e) => {
            debug!("Session {}: submission rejected: {}", session.id(), e);
            let _ = out.send(ServerMessage::Error { message: e.to_string() });
            return;
        }
    };
    let _ = out.send(ServerMessage::Processing);

    let session = session.clone();
    let out = out.clone();
    tokio::spawn(async move {
        let turn = session.answer(pending).await;
        let reply = ServerMessage::Response { content: turn.content, timestamp: turn.timestamp };
        if out.send(reply).is_err() {
            debug!("Session {} closed before the reply was ready", session.id());
        }
    });
}

async fn handle_client_message(
    msg: ClientMessage,
    state: &AppState,
    session: &Arc<AssistantSession>,
    voice: &mut VoiceCapture,
    out: &UnboundedSender<ServerMessage>
) {
    let reply = match msg {
        ClientMessage::Chat { content, language } => {
            let language = match language {
                Some(code) => Language::from_code_or_default(Some(&code)),
                None => session.language().await,
            };
            dispatch(session, out, session.accept_question(&content, language).await);
            None
        }
        ClientMessage::SubmitDraft => {
            dispatch(session, out, session.accept_draft().await);
            None
        }
        ClientMessage::SetLanguage { language } => {
            let language = Language::from_code_or_default(Some(&language));
            session.set_language(language).await;
            if let Err(e) = state.preferences.write().await.set_language(language) {
                warn!("Failed to persist language preference: {}", e);
            }
            Some(welcome(session, voice.is_available()).await)
        }
        ClientMessage::Suggestion { index } =>
            Some(match session.use_suggestion(index).await {
                Ok(content) => ServerMessage::Draft { content },
                Err(e) => ServerMessage::Error { message: e.to_string() },
            }),
        ClientMessage::History => Some(ServerMessage::History { turns: session.turns().await }),
        ClientMessage::VoiceStart =>
            Some(match voice.start(session.language().await) {
                Ok(()) => ServerMessage::Listening { active: true },
                Err(e) => ServerMessage::Error { message: e.to_string() },
            }),
        ClientMessage::VoiceResult { transcript } =>
            match voice.on_result(&transcript) {
                Ok(Some(submission)) => {
                    let _ = out.send(ServerMessage::Listening { active: false });
                    Some(ServerMessage::Navigate { url: submission.url.to_string() })
                }
                Ok(None) => Some(ServerMessage::Listening { active: false }),
                Err(e) => Some(ServerMessage::Error { message: e.to_string() }),
            }
        ClientMessage::VoiceError { message } => {
            voice.on_error(&message);
            Some(ServerMessage::Listening { active: false })
        }
        ClientMessage::VoiceStop => {
            voice.stop();
            Some(ServerMessage::Listening { active: false })
        }
    };
    if let Some(reply) = reply {
        let _ = out.send(reply);
    }
}

async fn send_json<S>(
    tx: &mut S,
    msg: &ServerMessage
) -> Result<(), Box<dyn Error + Send + Sync>>
    where S: Sink<Message> + Unpin, S::Error: Error + Send + Sync + 'static
{
    let json = serde_json::to_string(msg)?;
    tx.send(Message::Text(json)).await?;
    Ok(())
}

pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    state: AppState,
    query: Option<String>
)
    where S: AsyncRead + AsyncWrite + Unpin
{
    info!("New WebSocket connection: {}", peer);

    let language = session_language(&state, query.as_deref()).await;
    let session = Arc::new(AssistantSession::new(state.chat_client.clone(), language));
    info!("Assigned session ID {} to {} ({})", session.id(), peer, language);

    let capability = if state.voice_enabled {
        SpeechCapability::Available(Box::new(ClientRecognizer::default()))
    } else {
        SpeechCapability::Unavailable
    };
    let mut voice = VoiceCapture::new(capability, state.assistant_url.clone());

    let (mut tx, mut rx) = websocket.split();
    let (out_tx, mut out_rx) = unbounded_channel::<ServerMessage>();

    if let Err(e) = send_json(&mut tx, &welcome(&session, voice.is_available()).await).await {
        error!("Failed to send welcome to {}: {}", peer, e);
        return;
    }

    // Accepted before the first client frame is read, so a quick `chat`
    // cannot take the voice question's place.
    if let Some(transcript) = voice_query(query.as_deref()) {
        if let Some(accepted) = session.accept_voice(&transcript).await.transpose() {
            dispatch(&session, &out_tx, accepted);
        }
    }

    loop {
        tokio::select! {
            outgoing = out_rx.recv() => {
                let Some(msg) = outgoing else { break };
                if let Err(e) = send_json(&mut tx, &msg).await {
                    error!("Error sending message to {}: {}", peer, e);
                    break;
                }
            }
            incoming = rx.next() => {
                let Some(msg) = incoming else { break };
                match msg {
                    Ok(message) => {
                        if message.len() > MAX_MESSAGE_SIZE {
                            warn!(
                                "Message from {} exceeds size limit ({} > {})",
                                peer,
                                message.len(),
                                MAX_MESSAGE_SIZE
                            );
                            let error_msg = ServerMessage::Error {
                                message: "Message too large".to_string(),
                            };
                            if send_json(&mut tx, &error_msg).await.is_err() {
                                error!("Failed to send size limit error to {}", peer);
                            }
                            break;
                        }

                        match message {
                            Message::Text(text) => {
                                match serde_json::from_str::<ClientMessage>(&text) {
                                    Ok(client_msg) => {
                                        handle_client_message(
                                            client_msg,
                                            &state,
                                            &session,
                                            &mut voice,
                                            &out_tx
                                        ).await;
                                    }
                                    Err(e) => {
                                        error!("Failed to parse message from {}: {}", peer, e);
                                        let error_msg = ServerMessage::Error {
                                            message: format!("Failed to parse message: {}", e),
                                        };
                                        if let Err(e) = send_json(&mut tx, &error_msg).await {
                                            error!("Error sending parse error to {}: {}", peer, e);
                                            break;
                                        }
                                    }
                                }
                            }
                            Message::Close(_) => {
                                info!("Received close frame from {}", peer);
                                break;
                            }
                            Message::Ping(ping_data) => {
                                if tx.send(Message::Pong(ping_data)).await.is_err() {
                                    error!("Failed to send pong to {}", peer);
                                    break;
                                }
                            }
                            Message::Pong(_) => {}
                            Message::Binary(_) => {
                                warn!("Ignoring binary message from {}", peer);
                            }
                            Message::Frame(_) => {}
                        }
                    }
                    Err(e) => {
                        match e {
                            | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                            | tokio_tungstenite::tungstenite::Error::Protocol(_)
                            | tokio_tungstenite::tungstenite::Error::Utf8 => {
                                info!("WebSocket connection closed or protocol error for {}: {}", peer, e);
                            }
                            tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                                io_err.kind() == std::io::ErrorKind::ConnectionReset
                            => {
                                info!("WebSocket connection reset by peer {}", peer);
                            }
                            _ => {
                                error!("Error receiving message from {}: {}", peer, e);
                            }
                        }
                        break;
                    }
                }
            }
        }
    }
    voice.stop();
    info!(
        "WebSocket connection closed for {} (Session ID: {}, {} turns)",
        peer,
        session.id(),
        session.turns().await.len()
    );
}
