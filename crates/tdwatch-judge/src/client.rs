//! HTTP client for an OpenAI-compatible chat-completions endpoint.
//!
//! Wraps `reqwest` with bearer auth, a per-request timeout, transient retry,
//! and JSON extraction from the first choice's message content. Use
//! [`JudgeClient::new`] with a [`JudgeConfig`]; point `base_url` at a mock
//! server in tests.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tdwatch_core::AppConfig;

use crate::error::JudgeError;
use crate::extract::parse_json_content;
use crate::retry::retry_with_backoff;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, ErrorEnvelope, ResponseFormat};

const COMPLETIONS_PATH: &str = "v1/chat/completions";
const MAX_ERROR_BODY_CHARS: usize = 500;

#[derive(Clone)]
pub struct JudgeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
}

impl std::fmt::Debug for JudgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .finish()
    }
}

impl JudgeConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            base_url: config.judge_base_url.clone(),
            api_key: config.judge_api_key.clone(),
            model: config.judge_model.clone(),
            temperature: config.judge_temperature,
            max_tokens: config.judge_max_tokens,
            timeout_secs: config.judge_timeout_secs,
            max_retries: config.judge_max_retries,
            retry_backoff_base_ms: config.judge_retry_backoff_base_ms,
        }
    }
}

/// Client for the judgment capability.
pub struct JudgeClient {
    client: Client,
    endpoint: Url,
    config: JudgeConfig,
}

impl JudgeClient {
    /// Builds a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`JudgeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`JudgeError::InvalidBaseUrl`] if
    /// `config.base_url` is not a valid URL.
    pub fn new(config: JudgeConfig) -> Result<Self, JudgeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("tdwatch/0.1 (representative-scoring)")
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|base| base.join(COMPLETIONS_PATH))
            .map_err(|_| JudgeError::InvalidBaseUrl(config.base_url.clone()))?;

        Ok(Self {
            client,
            endpoint,
            config,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.config.model
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Sends one system + user exchange and returns the raw message content.
    ///
    /// Transient failures are retried per the configured back-off.
    ///
    /// # Errors
    ///
    /// - [`JudgeError::Timeout`] if the request exceeded the timeout.
    /// - [`JudgeError::Api`] on a non-2xx status.
    /// - [`JudgeError::EmptyResponse`] if no choice carries content.
    /// - [`JudgeError::Http`] on other network failures.
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, JudgeError> {
        retry_with_backoff(
            self.config.max_retries,
            self.config.retry_backoff_base_ms,
            || self.send_once(system, user),
        )
        .await
    }

    /// Like [`JudgeClient::complete`], then extracts and deserializes the
    /// JSON document in the content.
    ///
    /// # Errors
    ///
    /// Any error from [`JudgeClient::complete`], or [`JudgeError::Malformed`]
    /// if the content does not parse as `T`.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
        context: &str,
    ) -> Result<T, JudgeError> {
        let content = self.complete(system, user).await?;
        parse_json_content(&content, context)
    }

    async fn send_once(&self, system: &str, user: &str) -> Result<String, JudgeError> {
        let request = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            response_format: ResponseFormat::json_object(),
        };

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(JudgeError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| JudgeError::Malformed {
                context: "chat completion envelope".to_string(),
                source: e,
            })?;

        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(JudgeError::EmptyResponse)
    }

    fn map_transport(&self, err: reqwest::Error) -> JudgeError {
        if err.is_timeout() {
            JudgeError::Timeout {
                secs: self.config.timeout_secs,
            }
        } else {
            JudgeError::Http(err)
        }
    }
}

/// Prefer the structured `error.message`; fall back to a bounded slice of
/// the raw body.
fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
