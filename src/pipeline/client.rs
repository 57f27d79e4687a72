//! Translation backends: one paragraph in, one translation out.
//!
//! The pipeline only needs [`TranslationClient::translate`]; retries,
//! timeouts and scheduling are layered on top in [`super::retry`] and
//! [`super::dispatch`]. Two backends ship with the crate:
//!
//! * [`OpenAiClient`]: a direct chat-completions client with an explicit
//!   API key and optional proxy. Works with any OpenAI-compatible endpoint.
//! * [`ProviderClient`]: wraps any edgequake-llm provider (Anthropic,
//!   Gemini, Ollama, …).

use crate::config::{TranslationConfig, DEFAULT_MODEL};
use crate::error::{ClientError, Pdf2ZhError};
use crate::prompts::TranslationPrompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// A remote operation that translates one text unit or fails.
///
/// Implementations must be idempotent enough to be called again with the
/// same text after a failure.
#[async_trait]
pub trait TranslationClient: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, ClientError>;

    /// Short backend name for logs.
    fn name(&self) -> &str {
        "custom"
    }
}

// ── OpenAI-compatible client ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [RequestMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client for OpenAI and compatible endpoints.
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    prompt: TranslationPrompt,
}

impl OpenAiClient {
    /// Build a client from the run configuration.
    ///
    /// Requires `api_key`; applies `proxy` and `base_url` when set.
    pub fn from_config(config: &TranslationConfig) -> Result<Self, Pdf2ZhError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Pdf2ZhError::ClientNotConfigured {
                provider: "openai".into(),
                hint: "Set OPENAI_API_KEY (or pass --api-key), or choose another backend with --provider."
                    .into(),
            })?;

        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));
        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| Pdf2ZhError::InvalidConfig(format!("Invalid proxy '{proxy}': {e}")))?;
            builder = builder.proxy(proxy);
        }
        let http = builder
            .build()
            .map_err(|e| Pdf2ZhError::Internal(format!("Failed to build HTTP client: {e}")))?;

        let base = config.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: config.temperature,
            prompt: TranslationPrompt::from_config(config),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TranslationClient for OpenAiClient {
    async fn translate(&self, text: &str) -> Result<String, ClientError> {
        let user = self.prompt.user(text);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                RequestMessage {
                    role: "system",
                    content: self.prompt.system(),
                },
                RequestMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(ClientError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(match status.as_u16() {
                401 | 403 => ClientError::Auth(message),
                code => ClientError::Api {
                    status: code,
                    message,
                },
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| ClientError::Api {
            status: status.as_u16(),
            message: format!("invalid response body: {e}"),
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ClientError::EmptyResponse)?;

        debug!(model = %self.model, chars = content.len(), "translation received");
        Ok(content)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────

/// Adapter that translates through any edgequake-llm provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    name: String,
    temperature: Option<f32>,
    prompt: TranslationPrompt,
}

impl ProviderClient {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        name: impl Into<String>,
        config: &TranslationConfig,
    ) -> Self {
        Self {
            provider,
            name: name.into(),
            temperature: config.temperature,
            prompt: TranslationPrompt::from_config(config),
        }
    }

    /// Create the named provider via `ProviderFactory`, which reads the
    /// provider's own API key variable (`ANTHROPIC_API_KEY`, …).
    pub fn from_config(
        provider_name: &str,
        config: &TranslationConfig,
    ) -> Result<Self, Pdf2ZhError> {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        let provider = edgequake_llm::ProviderFactory::create_llm_provider(provider_name, model)
            .map_err(|e| Pdf2ZhError::ClientNotConfigured {
                provider: provider_name.to_string(),
                hint: format!("{e}"),
            })?;
        Ok(Self::new(provider, provider_name, config))
    }
}

#[async_trait]
impl TranslationClient for ProviderClient {
    async fn translate(&self, text: &str) -> Result<String, ClientError> {
        let messages = vec![
            ChatMessage::system(self.prompt.system()),
            ChatMessage::user(self.prompt.user(text)),
        ];
        let options = CompletionOptions {
            temperature: self.temperature,
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| ClientError::Provider(e.to_string()))?;

        debug!(
            provider = %self.name,
            input_tokens = response.prompt_tokens,
            output_tokens = response.completion_tokens,
            "translation received"
        );

        if response.content.trim().is_empty() {
            return Err(ClientError::EmptyResponse);
        }
        Ok(response.content)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edgequake_llm::{ChatRole, LLMResponse, LlmError, MockProvider};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        let config = TranslationConfig::builder()
            .api_key("sk-test")
            .base_url(server.uri())
            .model("gpt-test")
            .build()
            .unwrap();
        OpenAiClient::from_config(&config).unwrap()
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        let err = OpenAiClient::from_config(&TranslationConfig::default())
            .err()
            .expect("should fail without a key");
        assert!(err.is_config_error());
    }

    #[test]
    fn invalid_proxy_is_rejected() {
        let config = TranslationConfig::builder()
            .api_key("sk-test")
            .proxy("not a url")
            .build()
            .unwrap();
        assert!(matches!(
            OpenAiClient::from_config(&config),
            Err(Pdf2ZhError::InvalidConfig(_))
        ));
    }

    #[test]
    fn endpoint_joins_base_url() {
        let config = TranslationConfig::builder()
            .api_key("sk-test")
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        let c = OpenAiClient::from_config(&config).unwrap();
        assert_eq!(c.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[tokio::test]
    async fn translate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-test",
                "messages": [{ "role": "system", "content": "You are a professional translator." }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("你好，世界。")))
            .expect(1)
            .mount(&server)
            .await;

        let out = client_for(&server).translate("Hello, world.").await.unwrap();
        assert_eq!(out, "你好，世界。");
    }

    #[tokio::test]
    async fn rate_limit_maps_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = client_for(&server).translate("x").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::RateLimited {
                retry_after_secs: Some(7)
            }
        );
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key"))
            .mount(&server)
            .await;

        let err = client_for(&server).translate("x").await.unwrap_err();
        assert_eq!(err, ClientError::Auth("Incorrect API key".into()));
    }

    #[tokio::test]
    async fn server_error_maps_to_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client_for(&server).translate("x").await.unwrap_err();
        assert_eq!(
            err,
            ClientError::Api {
                status: 503,
                message: "overloaded".into()
            }
        );
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server).translate("x").await.unwrap_err();
        assert_eq!(err, ClientError::EmptyResponse);
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let config = TranslationConfig::builder()
            .api_key("sk-test")
            .base_url("http://127.0.0.1:1")
            .build()
            .unwrap();
        let err = OpenAiClient::from_config(&config)
            .unwrap()
            .translate("x")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Network(_)), "got {err:?}");
    }

    // ── ProviderClient ───────────────────────────────────────────────────

    fn provider_client(provider: Arc<dyn LLMProvider>) -> ProviderClient {
        let config = TranslationConfig::builder().build().unwrap();
        ProviderClient::new(provider, "mock", &config)
    }

    #[tokio::test]
    async fn provider_reply_is_the_translation() {
        let mock = MockProvider::new();
        mock.add_response("物流网络").await;
        let client = provider_client(Arc::new(mock));

        assert_eq!(client.name(), "mock");
        assert_eq!(client.translate("Logistics networks").await.unwrap(), "物流网络");
    }

    #[tokio::test]
    async fn blank_provider_reply_is_empty_response() {
        let mock = MockProvider::new();
        mock.add_response("  \n ").await;
        let err = provider_client(Arc::new(mock)).translate("x").await.unwrap_err();
        assert_eq!(err, ClientError::EmptyResponse);
    }

    /// Records the messages it receives and fails every call.
    #[derive(Default)]
    struct Unavailable {
        seen: std::sync::Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl LLMProvider for Unavailable {
        fn name(&self) -> &str {
            "unavailable"
        }

        fn model(&self) -> &str {
            "none"
        }

        fn max_context_length(&self) -> usize {
            4096
        }

        async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
            Err(LlmError::ApiError("service unavailable".into()))
        }

        async fn complete_with_options(
            &self,
            prompt: &str,
            _options: &CompletionOptions,
        ) -> edgequake_llm::Result<LLMResponse> {
            self.complete(prompt).await
        }

        async fn chat(
            &self,
            messages: &[ChatMessage],
            _options: Option<&CompletionOptions>,
        ) -> edgequake_llm::Result<LLMResponse> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.extend(messages.iter().cloned());
            }
            self.complete("").await
        }
    }

    #[tokio::test]
    async fn provider_error_maps_to_provider_variant() {
        let provider = Arc::new(Unavailable::default());
        let client = provider_client(provider.clone());

        let err = client.translate("Distribution Centres").await.unwrap_err();
        match err {
            ClientError::Provider(msg) => assert!(msg.contains("service unavailable"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0].role, ChatRole::System));
        assert!(matches!(seen[1].role, ChatRole::User));
        assert!(seen[1].content.ends_with("Distribution Centres"));
    }
}
