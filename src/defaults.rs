use std::env;

/// Address the relay listens on.
/// Loads from DEFAULT_LISTEN_ADDR environment variable if set, otherwise binds all interfaces on 8080
pub fn default_listen_addr() -> String {
    env::var("DEFAULT_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
}

pub fn default_request_timeout_secs() -> u64 {
    env::var("DEFAULT_REQUEST_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(60)
}

pub fn default_gemini_base_url() -> String {
    env::var("DEFAULT_GEMINI_BASE_URL")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string())
}

/// Gemini model used when a chat request does not name one
pub fn default_gemini_model() -> String {
    env::var("DEFAULT_GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash-latest".to_string())
}

pub fn default_openai_base_url() -> String {
    env::var("DEFAULT_OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string())
}

/// OpenAI model used when a chat request does not name one
pub fn default_openai_model() -> String {
    env::var("DEFAULT_OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

/// Path appended to a request-supplied OpenAI hostname when no path is given
pub fn default_openai_path() -> String {
    "/v1".to_string()
}
