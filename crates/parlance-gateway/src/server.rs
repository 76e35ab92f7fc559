//! Axum-based HTTP server.

use std::sync::Arc;

use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use parlance_core::types::{ChatResponse, Conversation, Message};

use crate::state::GatewayState;

/// Start the gateway HTTP server.
pub async fn start_gateway(state: Arc<GatewayState>, port: u16) -> anyhow::Result<()> {
    let bind_addr = state
        .config
        .gateway
        .as_ref()
        .and_then(|g| g.bind.clone())
        .unwrap_or_else(|| "0.0.0.0".to_string());

    let app = router(state.clone());
    let addr = format!("{bind_addr}:{port}");

    #[cfg(feature = "tls")]
    if let Some(tls) = state.config.gateway.as_ref().and_then(|g| g.tls.clone()) {
        let rustls_config =
            axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                .await?;
        info!("Gateway listening on {addr} (TLS)");
        axum_server::bind_rustls(addr.parse()?, rustls_config)
            .serve(app.into_make_service())
            .await?;
        return Ok(());
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Build the router. Separate from [`start_gateway`] so tests can drive it
/// without binding a socket.
pub fn router(state: Arc<GatewayState>) -> Router {
    let origins = state
        .config
        .gateway
        .as_ref()
        .map(|g| g.allowed_origins.clone())
        .unwrap_or_default();

    Router::new()
        .route("/", get(index_handler))
        .route("/chat/", post(chat_handler))
        .route("/tts", get(tts_handler))
        .route("/stt/", post(stt_handler))
        .layer(cors_layer(&origins))
        .with_state(state)
}

/// CORS policy: permissive when no origins are configured, otherwise the
/// configured allow-list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse::<HeaderValue>().ok())
            .collect();
        layer.allow_origin(parsed)
    }
}

/// JSON error response carrying the appropriate status code.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "status": "API online",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatApiResponse {
    /// Transcript of the uploaded audio, when audio was supplied.
    pub transcribed_message: Option<String>,
    pub response: ChatResponse,
}

fn parse_conversation(raw: &str) -> Result<Conversation, ApiError> {
    serde_json::from_str(raw)
        .map_err(|e| ApiError::bad_request(format!("invalid conversation JSON: {e}")))
}

/// `POST /chat/` — multipart form with optional `audio` bytes and a
/// `conversation` JSON history. Transcribes the audio (if any), appends it as
/// the latest user message, and runs one planner turn.
async fn chat_handler(
    State(state): State<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> Result<Json<ChatApiResponse>, ApiError> {
    let mut audio: Option<Vec<u8>> = None;
    let mut conversation_raw: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("audio") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("unreadable audio field: {e}")))?;
                audio = Some(bytes.to_vec());
            }
            Some("conversation") => {
                let text = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("unreadable conversation field: {e}"))
                })?;
                conversation_raw = Some(text);
            }
            _ => {}
        }
    }

    let conversation = match conversation_raw {
        Some(raw) => parse_conversation(&raw)?,
        None => Conversation::default(),
    };

    let transcribed_message = match audio {
        Some(bytes) => {
            let transcript = state
                .transcriber
                .transcribe(&bytes)
                .await
                .map_err(|e| ApiError::bad_gateway(e.to_string()))?;
            info!(chars = transcript.len(), "Chat request transcribed");
            Some(transcript)
        }
        None => None,
    };

    if transcribed_message.is_none() && conversation.messages.is_empty() {
        return Err(ApiError::bad_request(
            "provide audio, a non-empty conversation, or both",
        ));
    }

    let effective = match &transcribed_message {
        Some(transcript) => conversation.with_message(Message::user(transcript.clone())),
        None => conversation,
    };

    let response = state.planner.respond(effective).await;
    info!(text = %response.text, "Chat response ready");

    Ok(Json(ChatApiResponse {
        transcribed_message,
        response,
    }))
}

#[derive(Debug, Deserialize)]
struct TtsQuery {
    markup: String,
}

/// `GET /tts?markup=...` — synthesize speech for SSML markup.
async fn tts_handler(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<TtsQuery>,
) -> Result<Response, ApiError> {
    let audio = state
        .synthesizer
        .synthesize(&query.markup)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;

    Ok(([(header::CONTENT_TYPE, "audio/ogg")], audio).into_response())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SttResponse {
    pub transcript: String,
}

/// `POST /stt/` — multipart audio in, transcript out.
async fn stt_handler(
    State(state): State<Arc<GatewayState>>,
    mut multipart: Multipart,
) -> Result<Json<SttResponse>, ApiError> {
    let mut audio: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("audio") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("unreadable audio field: {e}")))?;
            audio = Some(bytes.to_vec());
        }
    }

    let Some(audio) = audio else {
        return Err(ApiError::bad_request("missing 'audio' field"));
    };

    let transcript = state
        .transcriber
        .transcribe(&audio)
        .await
        .map_err(|e| ApiError::bad_gateway(e.to_string()))?;

    Ok(Json(SttResponse { transcript }))
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance_core::types::Role;

    #[test]
    fn test_parse_conversation_valid() {
        let conversation = parse_conversation(
            r#"{"messages": [{"role": "user", "content": "hi"}, {"role": "assistant", "content": "hello"}]}"#,
        )
        .unwrap();
        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].role, Role::User);
    }

    #[test]
    fn test_parse_conversation_invalid_role_rejected() {
        assert!(parse_conversation(r#"{"messages": [{"role": "robot", "content": "hi"}]}"#).is_err());
        assert!(parse_conversation("not json").is_err());
    }

    #[test]
    fn test_chat_api_response_shape() {
        let response = ChatApiResponse {
            transcribed_message: Some("hi".into()),
            response: ChatResponse {
                text: "hello".into(),
                markup: "<speak>hello</speak>".into(),
                external_action: parlance_core::types::ExternalAction::None,
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["transcribed_message"], "hi");
        assert_eq!(json["response"]["external_action"], "none");
    }
}
