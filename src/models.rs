use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Body of `POST /chat`. Missing fields decode as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub api_key: String,
    pub api_type: String,
    pub model: String,
    pub openai_hostname: String,
    pub openai_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

/// Query string of `GET /models`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelsQuery {
    pub api_key: String,
    pub api_type: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiType {
    Gemini,
    OpenAi,
}

impl ApiType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiType::Gemini => "Gemini",
            ApiType::OpenAi => "OpenAI",
        }
    }
}

impl fmt::Display for ApiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown API type '{0}'")]
pub struct UnknownApiType(pub String);

impl FromStr for ApiType {
    type Err = UnknownApiType;

    /// Wire names are case-sensitive.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Gemini" => Ok(ApiType::Gemini),
            "OpenAI" => Ok(ApiType::OpenAi),
            other => Err(UnknownApiType(other.to_string())),
        }
    }
}
