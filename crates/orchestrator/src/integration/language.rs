//! OpenAI-compatible chat backend, the orchestrator's primary integration.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{request_error, status_error, ApiResponse, QueryParams, ServiceIntegration, ServiceStatus};
use crate::config::{IntegrationConfig, DEFAULT_LANGUAGE_MODEL};
use crate::errors::{OrchestratorError, OrchestratorResult};

pub const LANGUAGE_ID: &str = "openai";

/// System prompt plus at most this many recent messages are sent upstream.
const MAX_HISTORY_LENGTH: usize = 10;

const SYSTEM_PROMPT: &str = "You are an AI assistant integrated with a blockchain application. \
Your role is to help users interact with the blockchain, create and manage digital assets, and \
understand complex blockchain concepts.
- Always provide clear, concise responses
- When handling blockchain operations, explain the process and any risks involved
- If you encounter an error, explain what went wrong and suggest next steps
- Keep responses focused on the current context and user's needs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    presence_penalty: f32,
    frequency_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

pub struct LanguageIntegration {
    config: IntegrationConfig,
    status: RwLock<ServiceStatus>,
    history: Mutex<Vec<ChatMessage>>,
    client: Client,
    retry_delay: Duration,
}

impl LanguageIntegration {
    pub fn new(config: IntegrationConfig) -> OrchestratorResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| OrchestratorError::validation("OpenAI", format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            status: RwLock::new(ServiceStatus::Initializing),
            history: Mutex::new(vec![ChatMessage::new("system", SYSTEM_PROMPT)]),
            client,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Base delay of the exponential backoff between chat attempts.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Drop the conversation, keeping the system prompt.
    pub fn clear_history(&self) {
        let mut history = self.history.lock();
        history.truncate(1);
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }

    fn model(&self) -> &str {
        self.config.model.as_deref().unwrap_or(DEFAULT_LANGUAGE_MODEL)
    }

    fn set_status(&self, status: ServiceStatus) {
        *self.status.write() = status;
    }

    async fn list_models(&self) -> OrchestratorResult<usize> {
        let key = self
            .config
            .api_key()
            .ok_or_else(|| OrchestratorError::validation("OpenAI", "API key not provided"))?;

        let response = self
            .client
            .get(format!("{}/models", self.config.endpoint()))
            .bearer_auth(key)
            .send()
            .await
            .map_err(|e| request_error(LANGUAGE_ID, e))?;

        if !response.status().is_success() {
            return Err(status_error(LANGUAGE_ID, response.status()));
        }

        let models = response
            .json::<ModelList>()
            .await
            .map_err(|e| request_error(LANGUAGE_ID, e))?;
        Ok(models.data.len())
    }

    fn push_trimmed(&self, message: ChatMessage) -> Vec<ChatMessage> {
        let mut history = self.history.lock();
        history.push(message);
        if history.len() > MAX_HISTORY_LENGTH {
            let excess = history.len() - MAX_HISTORY_LENGTH;
            history.drain(1..=excess);
        }
        history.clone()
    }

    async fn complete_once(&self, messages: &[ChatMessage]) -> OrchestratorResult<String> {
        let key = self
            .config
            .api_key()
            .ok_or_else(|| OrchestratorError::validation("OpenAI", "API key not provided"))?;

        let request = ChatRequest {
            model: self.model(),
            messages,
            temperature: 0.7,
            max_tokens: 500,
            presence_penalty: 0.6,
            frequency_penalty: 0.2,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.endpoint()))
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| request_error(LANGUAGE_ID, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.set_status(ServiceStatus::Error);
        }
        if !status.is_success() {
            return Err(status_error(LANGUAGE_ID, status));
        }

        let body = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| request_error(LANGUAGE_ID, e))?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.retry_delay.as_millis() as f64 * 2f64.powi(attempt as i32);
        let jitter_range = base * 0.1;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..jitter_range)
        } else {
            0.0
        };
        Duration::from_millis((base + jitter).max(0.0) as u64)
    }

    async fn complete_with_retry(&self, messages: &[ChatMessage]) -> OrchestratorResult<String> {
        let attempts = self.config.retry_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.complete_once(messages).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    let retryable = matches!(err, OrchestratorError::Connection { transient: true, .. });
                    attempt += 1;
                    if !retryable || attempt >= attempts {
                        error!(integration_id = LANGUAGE_ID, attempt, "chat completion failed: {}", err);
                        return Err(err);
                    }
                    let delay = self.backoff(attempt - 1);
                    warn!(integration_id = LANGUAGE_ID, attempt, delay_ms = delay.as_millis() as u64, "retrying chat completion: {}", err);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl ServiceIntegration for LanguageIntegration {
    fn id(&self) -> &str {
        LANGUAGE_ID
    }

    fn name(&self) -> &str {
        "OpenAI"
    }

    fn description(&self) -> &str {
        "OpenAI API integration for natural language processing"
    }

    fn status(&self) -> ServiceStatus {
        *self.status.read()
    }

    fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    fn mark_error(&self) {
        self.set_status(ServiceStatus::Error);
    }

    async fn initialize(&self) -> OrchestratorResult<()> {
        if self.status() == ServiceStatus::Ready {
            return Ok(());
        }

        match self.list_models().await {
            Ok(count) if count > 0 => {
                self.set_status(ServiceStatus::Ready);
                info!(integration_id = LANGUAGE_ID, models = count, "language integration initialized");
                Ok(())
            }
            Ok(_) => {
                self.set_status(ServiceStatus::Error);
                Err(OrchestratorError::validation("OpenAI", "API key validation failed: no models available"))
            }
            Err(err) => {
                self.set_status(ServiceStatus::Error);
                error!(integration_id = LANGUAGE_ID, "language initialization failed: {}", err);
                Err(err)
            }
        }
    }

    async fn validate(&self) -> bool {
        match self.list_models().await {
            Ok(count) => count > 0,
            Err(err) => {
                debug!(integration_id = LANGUAGE_ID, "validation failed: {}", err);
                false
            }
        }
    }

    async fn execute(&self, params: QueryParams) -> OrchestratorResult<ApiResponse> {
        match self.status() {
            ServiceStatus::Initializing => {
                return Err(OrchestratorError::NotInitialized("OpenAI".to_string()))
            }
            ServiceStatus::Error => {
                return Ok(ApiResponse::failure("OpenAI integration not ready")
                    .with_metadata("status", ServiceStatus::Error.to_string()))
            }
            ServiceStatus::Ready => {}
        }

        let content = match &params.context {
            Some(context) => format!("[Context: {}]\n{}", context, params.message),
            None => params.message.clone(),
        };
        let messages = self.push_trimmed(ChatMessage::new("user", content));

        match self.complete_with_retry(&messages).await {
            Ok(text) => {
                let count = if text.is_empty() {
                    self.history_len()
                } else {
                    self.push_trimmed(ChatMessage::new("assistant", text.clone())).len()
                };
                Ok(ApiResponse::ok(text).with_metadata("message_count", count))
            }
            Err(err) => Ok(ApiResponse::failure(err.to_string())
                .with_metadata("error_type", err.error_code())
                .with_metadata("status", self.status().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn integration(url: &str, key: Option<&str>) -> LanguageIntegration {
        let mut config = IntegrationConfig::new(url).with_retry_attempts(2);
        config.api_key = key.map(str::to_string);
        LanguageIntegration::new(config)
            .unwrap()
            .with_retry_delay(Duration::from_millis(1))
    }

    async fn ready(server: &mut mockito::ServerGuard) -> LanguageIntegration {
        server
            .mock("GET", "/models")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"id":"gpt-4"}]}"#)
            .create_async()
            .await;
        let nlp = integration(&server.url(), Some("sk-test"));
        nlp.initialize().await.unwrap();
        nlp
    }

    #[tokio::test]
    async fn test_initialize_lists_models() {
        let mut server = mockito::Server::new_async().await;
        let nlp = ready(&mut server).await;
        assert_eq!(nlp.status(), ServiceStatus::Ready);
        assert!(nlp.validate().await);
    }

    #[tokio::test]
    async fn test_initialize_without_key_fails() {
        let nlp = integration("http://127.0.0.1:9", None);
        let err = nlp.initialize().await.unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(nlp.status(), ServiceStatus::Error);
        assert!(!nlp.validate().await);
    }

    #[tokio::test]
    async fn test_execute_with_context_and_history() {
        let mut server = mockito::Server::new_async().await;
        let nlp = ready(&mut server).await;
        server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::Regex(r"\[Context: ".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Hello!"}}]}"#)
            .create_async()
            .await;

        let reply = nlp
            .execute(QueryParams::new("hi").with_context(json!({"wallet": "0xabc"})))
            .await
            .unwrap();

        assert!(reply.success);
        assert_eq!(reply.data, Some(json!("Hello!")));
        assert_eq!(reply.metadata.fields["message_count"], 3);

        nlp.clear_history();
        assert_eq!(nlp.history_len(), 1);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let mut server = mockito::Server::new_async().await;
        let nlp = ready(&mut server).await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        for i in 0..8 {
            nlp.execute(QueryParams::new(format!("message {}", i))).await.unwrap();
        }
        assert_eq!(nlp.history_len(), MAX_HISTORY_LENGTH);
        assert_eq!(nlp.history.lock()[0].role, "system");
    }

    #[tokio::test]
    async fn test_unauthorized_flips_status() {
        let mut server = mockito::Server::new_async().await;
        let nlp = ready(&mut server).await;
        let chat = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let reply = nlp.execute(QueryParams::new("hi")).await.unwrap();

        chat.assert_async().await;
        assert!(!reply.success);
        assert_eq!(nlp.status(), ServiceStatus::Error);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let nlp = ready(&mut server).await;
        let chat = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let reply = nlp.execute(QueryParams::new("hi")).await.unwrap();

        chat.assert_async().await;
        assert!(!reply.success);
        assert_eq!(nlp.status(), ServiceStatus::Ready);
    }
}
