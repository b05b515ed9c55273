//! HTTP front door: `/`, `/chat` and `/models`

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, ProviderSettings};
use crate::error::{ApiError, ProviderError};
use crate::models::{ApiType, ChatRequest, ChatResponse, ModelsQuery, ModelsResponse};
use crate::providers::{self, ChatTarget, HttpProviderFactory, ProviderFactory};
use crate::proxy::{EnvPlatformProxy, NoPlatformProxy, PlatformProxy};

pub const GREETING: &str = "Hello from the LLM relay!";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    providers: Arc<dyn ProviderFactory>,
    settings: Arc<ProviderSettings>,
}

impl AppState {
    pub fn new(providers: Arc<dyn ProviderFactory>, settings: ProviderSettings) -> Self {
        Self {
            providers,
            settings: Arc::new(settings),
        }
    }

    /// Production state: real providers, proxy fallback as configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let platform: Arc<dyn PlatformProxy> = if config.proxy.platform_fallback {
            Arc::new(EnvPlatformProxy)
        } else {
            Arc::new(NoPlatformProxy)
        };
        let factory = HttpProviderFactory::new(
            config.providers.clone(),
            config.request_timeout(),
            platform,
        );
        Self::new(Arc::new(factory), config.providers.clone())
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(root))
        .route("/chat", post(chat).options(preflight))
        .route("/models", get(list_models).options(preflight))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "relay listening");
    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn root() -> &'static str {
    GREETING
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let request: ChatRequest = serde_json::from_slice(&body).map_err(|err| {
        tracing::debug!(error = %err, "undecodable chat request");
        ApiError::BadRequest("Error decoding request body".to_string())
    })?;

    if request.api_key.is_empty() {
        return Err(ApiError::BadRequest("API key is missing".to_string()));
    }

    let api_type: ApiType = request
        .api_type
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid API type specified".to_string()))?;

    let target = ChatTarget {
        api_type,
        api_key: request.api_key,
        openai_hostname: request.openai_hostname,
        openai_path: request.openai_path,
    };
    let provider = state
        .providers
        .chat_provider(&target)
        .map_err(|err| client_error(api_type, err))?;

    let model = providers::select_model(&state.settings, api_type, &request.model);
    let response = provider
        .send_message(model, &request.message)
        .await
        .map_err(|err| {
            tracing::error!(%api_type, model, error = %err, "chat request failed");
            ApiError::Internal(chat_failure_message(api_type).to_string())
        })?;

    Ok(Json(ChatResponse { response }))
}

async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Result<Json<ModelsResponse>, ApiError> {
    if query.api_key.is_empty() {
        return Err(ApiError::BadRequest("API key is missing".to_string()));
    }

    let api_type = match query.api_type.as_deref() {
        None | Some("") => ApiType::OpenAi,
        Some(value) => value
            .parse()
            .map_err(|_| ApiError::BadRequest("Invalid API type specified".to_string()))?,
    };

    let lister = state
        .providers
        .model_lister(api_type, &query.api_key)
        .map_err(|err| client_error(api_type, err))?;

    let models = lister.list_models().await.map_err(|err| {
        tracing::error!(%api_type, error = %err, "model listing failed");
        ApiError::Internal(format!("Error listing {api_type} models"))
    })?;

    Ok(Json(ModelsResponse { models }))
}

fn client_error(api_type: ApiType, err: ProviderError) -> ApiError {
    tracing::error!(%api_type, error = %err, "could not create provider client");
    ApiError::Internal(format!("Error creating {api_type} client"))
}

fn chat_failure_message(api_type: ApiType) -> &'static str {
    match api_type {
        ApiType::Gemini => "Error generating content",
        ApiType::OpenAi => "Error creating OpenAI chat completion",
    }
}
