//! Upstream LLM providers and the factory that builds them per request

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use crate::config::ProviderSettings;
use crate::defaults;
use crate::error::ProviderError;
use crate::models::ApiType;
use crate::proxy::{self, PlatformProxy};

/// Sends a single user message and returns the assistant's text.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn send_message(&self, model: &str, message: &str) -> Result<String, ProviderError>;
}

/// Lists the model identifiers a provider offers.
#[async_trait]
pub trait ModelLister: Send + Sync {
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;
}

/// Who to talk to for one chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTarget {
    pub api_type: ApiType,
    pub api_key: String,
    pub openai_hostname: String,
    pub openai_path: String,
}

impl ChatTarget {
    pub fn new(api_type: ApiType, api_key: impl Into<String>) -> Self {
        Self {
            api_type,
            api_key: api_key.into(),
            openai_hostname: String::new(),
            openai_path: String::new(),
        }
    }
}

pub trait ProviderFactory: Send + Sync {
    fn chat_provider(&self, target: &ChatTarget) -> Result<Box<dyn ChatProvider>, ProviderError>;

    fn model_lister(
        &self,
        api_type: ApiType,
        api_key: &str,
    ) -> Result<Box<dyn ModelLister>, ProviderError>;
}

/// Builds providers backed by a fresh proxy-aware `reqwest` client for every call.
pub struct HttpProviderFactory {
    settings: ProviderSettings,
    timeout: Duration,
    platform: Arc<dyn PlatformProxy>,
}

impl HttpProviderFactory {
    pub fn new(
        settings: ProviderSettings,
        timeout: Duration,
        platform: Arc<dyn PlatformProxy>,
    ) -> Self {
        Self {
            settings,
            timeout,
            platform,
        }
    }

    fn http_client(&self) -> Result<Client, ProviderError> {
        proxy::build_http_client(self.platform.clone(), self.timeout).map_err(ProviderError::Client)
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn chat_provider(&self, target: &ChatTarget) -> Result<Box<dyn ChatProvider>, ProviderError> {
        let http = self.http_client()?;
        match target.api_type {
            ApiType::Gemini => Ok(Box::new(GeminiClient::new(
                http,
                &self.settings.gemini_base_url,
                &target.api_key,
            )?)),
            ApiType::OpenAi => {
                let base_url = openai_base_url(
                    &self.settings.openai_base_url,
                    &target.openai_hostname,
                    &target.openai_path,
                );
                Ok(Box::new(OpenAiClient::new(http, &base_url, &target.api_key)?))
            }
        }
    }

    fn model_lister(
        &self,
        api_type: ApiType,
        api_key: &str,
    ) -> Result<Box<dyn ModelLister>, ProviderError> {
        let http = self.http_client()?;
        match api_type {
            ApiType::Gemini => Ok(Box::new(GeminiClient::new(
                http,
                &self.settings.gemini_base_url,
                api_key,
            )?)),
            ApiType::OpenAi => Ok(Box::new(OpenAiClient::new(
                http,
                &self.settings.openai_base_url,
                api_key,
            )?)),
        }
    }
}

/// The model a chat request should use: the requested one, else the configured default.
pub fn select_model<'a>(
    settings: &'a ProviderSettings,
    api_type: ApiType,
    requested: &'a str,
) -> &'a str {
    if !requested.is_empty() {
        return requested;
    }
    match api_type {
        ApiType::Gemini => &settings.gemini_model,
        ApiType::OpenAi => &settings.openai_model,
    }
}

/// OpenAI endpoint for a request. A request-supplied hostname overrides the configured base.
pub fn openai_base_url(configured: &str, hostname: &str, path: &str) -> String {
    if hostname.is_empty() {
        return configured.to_string();
    }

    let path = if path.is_empty() {
        defaults::default_openai_path()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    let hostname = hostname.trim_end_matches('/');
    if hostname.contains("://") {
        format!("{hostname}{path}")
    } else {
        format!("https://{hostname}{path}")
    }
}

pub(crate) fn parse_base_url(provider: &'static str, value: &str) -> Result<String, ProviderError> {
    let trimmed = value.trim_end_matches('/');
    match Url::parse(trimmed) {
        Ok(url) if url.has_host() => Ok(trimmed.to_string()),
        _ => Err(ProviderError::InvalidBaseUrl {
            provider,
            url: value.to_string(),
        }),
    }
}

pub(crate) async fn read_json<T>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, ProviderError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider,
            status,
            body,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| ProviderError::Decode { provider, source })
}
