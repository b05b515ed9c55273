use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{parse_base_url, read_json, ChatProvider, ModelLister};
use crate::error::ProviderError;

const PROVIDER: &str = "Gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";
pub const EMPTY_RESPONSE: &str = "No response from Gemini API.";

pub struct GeminiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(http: Client, base_url: &str, api_key: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            http,
            base_url: parse_base_url(PROVIDER, base_url)?,
            api_key: api_key.to_string(),
        })
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<TextPart<'a>>,
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn send_message(&self, model: &str, message: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1beta/models/{model}:generateContent", self.base_url);
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![TextPart { text: message }],
            }],
        };

        tracing::debug!(model, "sending Gemini generateContent request");
        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let parsed: GenerateContentResponse = read_json(PROVIDER, response).await?;
        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text);

        Ok(text.unwrap_or_else(|| EMPTY_RESPONSE.to_string()))
    }
}

#[async_trait]
impl ModelLister for GeminiClient {
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER,
                source,
            })?;

        let parsed: ListModelsResponse = read_json(PROVIDER, response).await?;
        Ok(parsed
            .models
            .into_iter()
            .map(|model| match model.name.strip_prefix("models/") {
                Some(id) => id.to_string(),
                None => model.name,
            })
            .collect())
    }
}
