//! HTTP server exposing the chat turn endpoint.

use axum::{
    extract::{rejection::JsonRejection, State as AxumState},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use radic_chat::{ChatError, ChatReply, ChatRequest, ErrorBody, TurnOrchestrator, MESSAGE_REQUIRED};

pub const CHAT_PATH: &str = "/api/chat";

const PROCESSING_FAILED: &str = "Failed to process message";

#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<TurnOrchestrator>,
    /// Fired on shutdown so runs still being polled are cancelled upstream.
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(orchestrator: TurnOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

// ============================================================================
// Error mapping
// ============================================================================

pub struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            tracing::info!("⚠️ Rejected chat request: {}", self.0);
            return (StatusCode::BAD_REQUEST, Json(ErrorBody::new(self.0.to_string()))).into_response();
        }

        tracing::error!("❌ Chat turn failed: {}", self.0);
        let body = ErrorBody::new(PROCESSING_FAILED).with_details(self.0.to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn handle_chat(
    AxumState(state): AxumState<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!("Unreadable chat body: {}", rejection);
            return Err(ChatError::validation(MESSAGE_REQUIRED).into());
        }
    };

    let message = request.message.unwrap_or_default();
    tracing::info!(
        chars = message.chars().count(),
        thread_id = request.thread_id.as_deref().unwrap_or("-"),
        "📨 Received chat message"
    );

    let outcome = state
        .orchestrator
        .run_turn_with_cancel(&message, request.thread_id.as_deref(), &state.shutdown)
        .await?;

    tracing::info!(thread_id = %outcome.thread_id, chars = outcome.answer.chars().count(), "✅ Sent response");

    Ok(Json(ChatReply {
        response: outcome.answer,
        thread_id: outcome.thread_id,
    }))
}

async fn method_not_allowed() -> (StatusCode, Json<ErrorBody>) {
    (StatusCode::METHOD_NOT_ALLOWED, Json(ErrorBody::new("Method not allowed")))
}

// ============================================================================
// CORS
// ============================================================================

fn allowed_methods() -> [Method; 6] {
    [
        Method::GET,
        Method::OPTIONS,
        Method::PATCH,
        Method::DELETE,
        Method::POST,
        Method::PUT,
    ]
}

fn allowed_headers() -> [HeaderName; 9] {
    [
        HeaderName::from_static("x-csrf-token"),
        HeaderName::from_static("x-requested-with"),
        header::ACCEPT,
        HeaderName::from_static("accept-version"),
        header::CONTENT_LENGTH,
        HeaderName::from_static("content-md5"),
        header::CONTENT_TYPE,
        header::DATE,
        HeaderName::from_static("x-api-version"),
    ]
}

fn header_list<T: AsRef<str>>(items: &[T]) -> HeaderValue {
    let joined = items.iter().map(|i| i.as_ref()).collect::<Vec<_>>().join(",");
    HeaderValue::from_str(&joined).expect("method and header names are valid header values")
}

/// Answers every OPTIONS request itself, preflight or not, with an empty 200.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(allowed_methods())
        .allow_headers(allowed_headers())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CHAT_PATH, post(handle_chat).fallback(method_not_allowed))
        .layer(cors_layer())
        // CorsLayer only lists methods and headers on preflight; every response carries them.
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            header_list(&allowed_methods()),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            header_list(&allowed_headers()),
        ))
        .with_state(state)
}

pub async fn start_server(addr: &str, orchestrator: TurnOrchestrator) -> anyhow::Result<()> {
    let state = AppState::new(orchestrator);
    let shutdown = state.shutdown_token();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Chat API listening on http://{}{}", listener.local_addr()?, CHAT_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("🛑 Shutting down, cancelling in-flight runs");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
