use httpmock::prelude::*;
use llm_relay::config::ProviderSettings;
use llm_relay::models::ApiType;
use llm_relay::providers::{
    self, gemini, openai, ChatProvider, ChatTarget, GeminiClient, HttpProviderFactory,
    ModelLister, OpenAiClient, ProviderFactory,
};
use llm_relay::proxy::NoPlatformProxy;
use llm_relay::ProviderError;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;

fn direct_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

struct EnvGuard {
    originals: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn set<I, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, V)>,
        V: Into<String>,
    {
        let lock = env_lock()
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let originals = vars
            .into_iter()
            .map(|(key, value)| {
                let original = std::env::var(key).ok();
                std::env::set_var(key, value.into());
                (key, original)
            })
            .collect();
        Self {
            originals,
            _lock: lock,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain(..) {
            if let Some(value) = original {
                std::env::set_var(key, value);
            } else {
                std::env::remove_var(key);
            }
        }
    }
}

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

#[tokio::test]
async fn test_gemini_returns_first_candidate_text() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1beta/models/gemini-1.5-flash-latest:generateContent")
                .header("x-goog-api-key", "g-key")
                .json_body(json!({
                    "contents": [{"role": "user", "parts": [{"text": "hello"}]}]
                }));
            then.status(200).json_body(json!({
                "candidates": [
                    {"content": {"role": "model", "parts": [{"text": "hi there"}, {"text": "ignored"}]}},
                    {"content": {"role": "model", "parts": [{"text": "second"}]}}
                ]
            }));
        })
        .await;

    let client = GeminiClient::new(direct_client(), &server.base_url(), "g-key").unwrap();
    let reply = client
        .send_message("gemini-1.5-flash-latest", "hello")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "hi there");
}

#[tokio::test]
async fn test_gemini_without_candidates_uses_fallback_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST);
            then.status(200).json_body(json!({"candidates": []}));
        })
        .await;

    let client = GeminiClient::new(direct_client(), &server.base_url(), "g-key").unwrap();
    let reply = client.send_message("gemini-pro", "hello").await.unwrap();
    assert_eq!(reply, gemini::EMPTY_RESPONSE);
}

#[tokio::test]
async fn test_gemini_lists_models_without_prefix() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1beta/models")
                .header("x-goog-api-key", "g-key");
            then.status(200).json_body(json!({
                "models": [
                    {"name": "models/gemini-1.5-flash-latest"},
                    {"name": "models/gemini-1.5-pro"}
                ]
            }));
        })
        .await;

    let client = GeminiClient::new(direct_client(), &server.base_url(), "g-key").unwrap();
    let models = client.list_models().await.unwrap();
    assert_eq!(models, vec!["gemini-1.5-flash-latest", "gemini-1.5-pro"]);
}

#[tokio::test]
async fn test_openai_chat_completion() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body(json!({
                    "model": "gpt-4o",
                    "messages": [{"role": "user", "content": "ping"}]
                }));
            then.status(200).json_body(json!({
                "id": "chatcmpl-1",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "pong"}}]
            }));
        })
        .await;

    let base = format!("{}/v1", server.base_url());
    let client = OpenAiClient::new(direct_client(), &base, "sk-test").unwrap();
    let reply = client.send_message("gpt-4o", "ping").await.unwrap();

    mock.assert_async().await;
    assert_eq!(reply, "pong");
}

#[tokio::test]
async fn test_openai_without_choices_uses_fallback_text() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({"choices": []}));
        })
        .await;

    let base = format!("{}/v1/", server.base_url());
    let client = OpenAiClient::new(direct_client(), &base, "sk-test").unwrap();
    let reply = client.send_message("gpt-4o", "ping").await.unwrap();
    assert_eq!(reply, openai::EMPTY_RESPONSE);
}

#[tokio::test]
async fn test_openai_error_status_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401)
                .json_body(json!({"error": {"message": "Incorrect API key provided"}}));
        })
        .await;

    let base = format!("{}/v1", server.base_url());
    let client = OpenAiClient::new(direct_client(), &base, "bad").unwrap();
    let err = client.send_message("gpt-4o", "ping").await.unwrap_err();

    match err {
        ProviderError::Status { status, body, .. } => {
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("Incorrect API key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_openai_undecodable_body_is_reported() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/models");
            then.status(200)
                .header("content-type", "application/json")
                .body("not valid json");
        })
        .await;

    let base = format!("{}/v1", server.base_url());
    let client = OpenAiClient::new(direct_client(), &base, "sk-test").unwrap();
    let err = client.list_models().await.unwrap_err();
    assert!(matches!(err, ProviderError::Decode { .. }));
}

#[tokio::test]
async fn test_openai_lists_model_ids_in_order() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/models")
                .header("authorization", "Bearer sk-test");
            then.status(200).json_body(json!({
                "object": "list",
                "data": [
                    {"id": "gpt-4o", "object": "model"},
                    {"id": "gpt-4o-mini", "object": "model"}
                ]
            }));
        })
        .await;

    let base = format!("{}/v1", server.base_url());
    let client = OpenAiClient::new(direct_client(), &base, "sk-test").unwrap();
    assert_eq!(
        client.list_models().await.unwrap(),
        vec!["gpt-4o", "gpt-4o-mini"]
    );
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let result = OpenAiClient::new(direct_client(), "not a url", "sk-test");
    assert!(matches!(
        result,
        Err(ProviderError::InvalidBaseUrl { provider: "OpenAI", .. })
    ));
}

#[test]
fn test_openai_base_url_override() {
    let configured = "https://api.openai.com/v1";
    assert_eq!(providers::openai_base_url(configured, "", ""), configured);
    assert_eq!(
        providers::openai_base_url(configured, "llm.internal", ""),
        "https://llm.internal/v1"
    );
    assert_eq!(
        providers::openai_base_url(configured, "llm.internal", "openai/v1"),
        "https://llm.internal/openai/v1"
    );
    assert_eq!(
        providers::openai_base_url(configured, "http://localhost:4000/", "/v1"),
        "http://localhost:4000/v1"
    );
}

#[test]
fn test_select_model_prefers_request() {
    let settings = ProviderSettings::default();
    assert_eq!(
        providers::select_model(&settings, ApiType::OpenAi, "gpt-4o"),
        "gpt-4o"
    );
    assert_eq!(
        providers::select_model(&settings, ApiType::Gemini, ""),
        settings.gemini_model
    );
    assert_eq!(
        providers::select_model(&settings, ApiType::OpenAi, ""),
        settings.openai_model
    );
}

#[tokio::test]
async fn test_factory_builds_proxy_aware_clients() {
    let _guard = EnvGuard::set([("NO_PROXY", "127.0.0.1")]);
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/models");
            then.status(200)
                .json_body(json!({"data": [{"id": "gpt-4o"}]}));
        })
        .await;

    let settings = ProviderSettings {
        openai_base_url: format!("{}/v1", server.base_url()),
        ..ProviderSettings::default()
    };
    let factory =
        HttpProviderFactory::new(settings, Duration::from_secs(5), Arc::new(NoPlatformProxy));

    let lister = factory.model_lister(ApiType::OpenAi, "sk-test").unwrap();
    assert_eq!(lister.list_models().await.unwrap(), vec!["gpt-4o"]);
    mock.assert_async().await;

    let target = ChatTarget {
        openai_hostname: server.base_url(),
        openai_path: "/v1".to_string(),
        ..ChatTarget::new(ApiType::OpenAi, "sk-test")
    };
    assert!(factory.chat_provider(&target).is_ok());
}
