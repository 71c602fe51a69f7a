//! OpenAI chat-completions provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::sse::pump_chunks;
use super::{ChunkStream, Provider, ProviderError};
use crate::config::ProviderConfig;
use crate::domain::{GenerateResponse, GenerationParams, StreamChunk, Usage};

const NAME: &str = "openai";
const LABEL: &str = "OpenAI";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo"];

/// OpenAI API provider.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    models: Vec<String>,
    timeout: Duration,
    stream_timeout: Duration,
    /// `None` once closed.
    client: RwLock<Option<Client>>,
}

impl OpenAiProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let models = if config.models.is_empty() {
            DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            config.models.clone()
        };

        Ok(Self {
            api_key: config.api_key.trim().to_string(),
            base_url: config
                .base_url
                .as_deref()
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            models,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(120)),
            stream_timeout: Duration::from_secs(config.stream_timeout_secs.unwrap_or(180)),
            client: RwLock::new(Some(client)),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(&self, params: &GenerationParams, stream: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = params.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: params.prompt.clone(),
        });

        ChatRequest {
            model: params.model.clone(),
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            stream,
        }
    }

    /// Credential check plus a handle on the live client.
    async fn client(&self) -> Result<Client, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::not_configured(NAME, LABEL));
        }
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::closed(NAME, LABEL))
    }

    async fn send(
        &self,
        params: &GenerationParams,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let client = self.client().await?;
        let timeout = if stream {
            self.stream_timeout
        } else {
            self.timeout
        };

        let response = client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&self.build_request(params, stream))
            .send()
            .await
            .map_err(|e| ProviderError::transport(NAME, LABEL, &e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::upstream(NAME, LABEL, status, &body));
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn supported_models(&self) -> &[String] {
        &self.models
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, params: &GenerationParams) -> Result<GenerateResponse, ProviderError> {
        let response = self.send(params, false).await?;

        let body: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::new(NAME, format!("{LABEL} returned a malformed response: {e}"))
        })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| {
            ProviderError::new(NAME, format!("{LABEL} returned a response without choices"))
        })?;

        let usage = body
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(GenerateResponse {
            content: choice.message.content.unwrap_or_default(),
            model: params.model.clone(),
            provider: NAME.to_string(),
            usage,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
        })
    }

    async fn stream(&self, params: &GenerationParams) -> Result<ChunkStream, ProviderError> {
        let response = self.send(params, true).await?;
        Ok(pump_chunks(NAME, LABEL, response, parse_stream_event))
    }

    async fn close(&self) -> Result<(), ProviderError> {
        if self.client.write().await.take().is_some() {
            tracing::debug!(provider = NAME, "HTTP client released");
        }
        Ok(())
    }
}

/// Map one streamed `data:` payload to a chunk.
fn parse_stream_event(data: &str) -> Option<StreamChunk> {
    if data == "[DONE]" {
        return Some(StreamChunk::done("", None));
    }

    let event: StreamEvent = serde_json::from_str(data).ok()?;
    let choice = event.choices.into_iter().next();
    let (content, finish_reason) = match choice {
        Some(choice) => (
            choice.delta.and_then(|d| d.content).unwrap_or_default(),
            choice.finish_reason,
        ),
        None => (String::new(), None),
    };

    if finish_reason.is_some() {
        let usage = event.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        return Some(StreamChunk::done(content, usage));
    }

    if content.is_empty() {
        None
    } else {
        Some(StreamChunk::delta(content))
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: Option<StreamDelta>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
