use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{parse_base_url, read_json, ChatProvider, ModelLister};
use crate::error::ProviderError;

const PROVIDER: &str = "OpenAI";
pub const EMPTY_RESPONSE: &str = "No response from OpenAI API.";

/// Client for the OpenAI chat completions API or a compatible endpoint.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(http: Client, base_url: &str, api_key: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            http,
            base_url: parse_base_url(PROVIDER, base_url)?,
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<Model>,
}

#[derive(Deserialize)]
struct Model {
    id: String,
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn send_message(&self, model: &str, message: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: message,
            }],
        };

        tracing::debug!(model, "sending OpenAI chat completion request");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let parsed: ChatCompletionResponse = read_json(PROVIDER, response).await?;
        match parsed.choices.into_iter().next() {
            Some(choice) => Ok(choice.message.content.unwrap_or_default()),
            None => Ok(EMPTY_RESPONSE.to_string()),
        }
    }
}

#[async_trait]
impl ModelLister for OpenAiClient {
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let parsed: ModelList = read_json(PROVIDER, response).await?;
        Ok(parsed.data.into_iter().map(|model| model.id).collect())
    }
}
