//! Generation requests, results and the values exchanged with providers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Token accounting for one generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Usage with `total_tokens` derived from its parts.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Parameters passed to a provider for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

/// A completed, non-streaming generation.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub provider: String,
    pub usage: Usage,
    pub finish_reason: String,
}

/// One increment of a streamed generation.
///
/// Non-terminal chunks carry text. Exactly one terminal chunk (`done`)
/// ends a sequence and carries the final usage, if the provider reported it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A non-terminal chunk.
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            done: false,
            usage: None,
        }
    }

    /// The terminal chunk.
    pub fn done(content: impl Into<String>, usage: Option<Usage>) -> Self {
        Self {
            content: content.into(),
            done: true,
            usage,
        }
    }
}

/// Caller metadata attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RequestContext {
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// strict, moderate or standard. Falls back to the deployment default.
    #[serde(default)]
    pub safety_level: Option<String>,
}

/// A client generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// Registered provider name, e.g. `openai`.
    pub provider: String,
    pub model: String,
    pub prompt: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Overrides the task-type template when present.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub task_type: Option<String>,
    #[serde(default)]
    pub context: Option<RequestContext>,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    2048
}

impl GenerateRequest {
    /// Reject requests that must never reach a provider.
    pub fn validate(&self) -> Result<(), String> {
        if self.provider.trim().is_empty() {
            return Err("provider must not be empty".to_string());
        }
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if self.prompt.trim().is_empty() {
            return Err("prompt must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.max_tokens == 0 {
            return Err("max_tokens must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.context.as_ref()?.tenant_id.as_deref()
    }

    /// Safety level named by the caller, if any.
    pub fn safety_level(&self) -> Option<&str> {
        self.context.as_ref()?.safety_level.as_deref()
    }

    /// Provider call parameters with the resolved system prompt.
    pub fn params(&self, system_prompt: Option<String>) -> GenerationParams {
        GenerationParams {
            prompt: self.prompt.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            system_prompt,
        }
    }
}

/// A completed generation as returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Generation {
    pub id: Uuid,
    pub content: String,
    pub model: String,
    pub provider: String,
    pub usage: Usage,
    pub finish_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Generation {
    pub fn new(response: GenerateResponse, content: String, task_type: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            model: response.model,
            provider: response.provider,
            usage: response.usage,
            finish_reason: response.finish_reason,
            task_type,
            created_at: Utc::now(),
        }
    }
}

/// One server-sent event of a streamed generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Chunk {
        content: String,
        done: bool,
    },
    Done {
        content: String,
        done: bool,
        usage: Option<Usage>,
        finish_reason: String,
    },
    Error {
        error: String,
    },
}

impl StreamEvent {
    pub fn chunk(content: impl Into<String>) -> Self {
        StreamEvent::Chunk {
            content: content.into(),
            done: false,
        }
    }

    pub fn done(content: impl Into<String>, usage: Option<Usage>) -> Self {
        StreamEvent::Done {
            content: content.into(),
            done: true,
            usage,
            finish_reason: "stop".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            error: message.into(),
        }
    }

    /// Whether the stream ends after this event.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamEvent::Chunk { .. })
    }
}
