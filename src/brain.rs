// src/brain.rs
// GENERATIVE MODEL BRIDGE
// Chat-completions client with a bounded retry on read timeouts.
// Credentials are resolved on every call so a missing key surfaces at first
// use rather than at startup.

use std::future::Future;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ModelConfig, MAX_GENERATION_ATTEMPTS};
use crate::error::{QuizError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: usize,
    pub temperature: f32,
}

#[async_trait]
pub trait ChatBrain: Send + Sync {
    /// Raw text of the first completion choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Outcome of a single attempt, before the retry policy is applied.
#[derive(Debug)]
pub enum AttemptError {
    Timeout,
    Failed(String),
}

/// Runs `call` up to `attempts` times, retrying only on [`AttemptError::Timeout`].
/// A timeout on the final attempt becomes [`QuizError::GatewayTimeout`].
pub async fn with_timeout_retries<T, F, Fut>(attempts: u32, mut call: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(AttemptError::Timeout) if attempt < attempts => {
                warn!(attempt, attempts, "generative model read timeout, retrying");
            }
            Err(AttemptError::Timeout) => {
                return Err(QuizError::GatewayTimeout { attempts: attempt })
            }
            Err(AttemptError::Failed(message)) => return Err(QuizError::upstream(message)),
        }
    }
}

pub struct OpenAiBrain {
    client: Client,
    config: ModelConfig,
}

impl OpenAiBrain {
    pub fn new(config: ModelConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn api_key(&self) -> Result<String> {
        std::env::var(&self.config.api_key_var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| QuizError::configuration(format!("missing {}", self.config.api_key_var)))
    }

    async fn send_once(
        &self,
        api_key: &str,
        body: &ChatCompletionBody<'_>,
    ) -> std::result::Result<String, AttemptError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AttemptError::Failed(format!(
                "chat completions returned {status}: {}",
                text.trim()
            )));
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(classify)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| AttemptError::Failed("chat completions returned no choices".into()))
    }
}

#[async_trait]
impl ChatBrain for OpenAiBrain {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let api_key = self.api_key()?;
        let body = ChatCompletionBody {
            model: &self.config.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            n: 1,
            temperature: request.temperature,
        };

        debug!(model = %self.config.model, max_tokens = request.max_tokens, "calling generative model");
        let attempts = self.config.attempts.min(MAX_GENERATION_ATTEMPTS);
        with_timeout_retries(attempts, |_| self.send_once(&api_key, &body)).await
    }
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: usize,
    n: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

fn classify(err: reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Timeout
    } else {
        AttemptError::Failed(err.to_string())
    }
}
