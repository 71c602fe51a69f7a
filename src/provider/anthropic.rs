//! Anthropic Messages API provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::sse::pump_chunks;
use super::{ChunkStream, Provider, ProviderError};
use crate::config::ProviderConfig;
use crate::domain::{GenerateResponse, GenerationParams, StreamChunk, Usage};

const NAME: &str = "anthropic";
const LABEL: &str = "Anthropic";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MODELS: &[&str] = &["claude-sonnet-4-5-20250929", "claude-haiku-4-5-20251001"];

pub struct AnthropicProvider {
    api_key: String,
    base_url: String,
    models: Vec<String>,
    timeout: Duration,
    stream_timeout: Duration,
    client: RwLock<Option<Client>>,
}

impl AnthropicProvider {
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

    fn build_request(&self, params: &GenerationParams, stream: bool) -> MessagesRequest {
        MessagesRequest {
            model: params.model.clone(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: params
                .system_prompt
                .clone()
                .filter(|s| !s.is_empty()),
            messages: vec![Message {
                role: "user".to_string(),
                content: params.prompt.clone(),
            }],
            stream,
        }
    }

    async fn send(
        &self,
        params: &GenerationParams,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::not_configured(NAME, LABEL));
        }
        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or_else(|| ProviderError::closed(NAME, LABEL))?;

        let response = client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .timeout(if stream {
                self.stream_timeout
            } else {
                self.timeout
            })
            .json(&self.build_request(params, stream))
            .send()
            .await
            .map_err(|e| ProviderError::transport(NAME, LABEL, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::upstream(NAME, LABEL, status.as_u16(), &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn supported_models(&self) -> &[String] {
        &self.models
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate(&self, params: &GenerationParams) -> Result<GenerateResponse, ProviderError> {
        let response = self.send(params, false).await?;

        let body: MessagesResponse = response.json().await.map_err(|e| {
            ProviderError::new(NAME, format!("{LABEL} returned a malformed response: {e}"))
        })?;

        let content = body
            .content
            .into_iter()
            .find_map(|block| block.text)
            .unwrap_or_default();

        let usage = body
            .usage
            .map(|u| Usage::new(u.input_tokens, u.output_tokens))
            .unwrap_or_default();

        Ok(GenerateResponse {
            content,
            model: params.model.clone(),
            provider: NAME.to_string(),
            usage,
            finish_reason: body.stop_reason.unwrap_or_else(|| "end_turn".to_string()),
        })
    }

    async fn stream(&self, params: &GenerationParams) -> Result<ChunkStream, ProviderError> {
        let response = self.send(params, true).await?;

        let mut input_tokens = 0u32;
        let mut output_tokens = 0u32;
        let parse = move |data: &str| {
            let event: StreamEvent = serde_json::from_str(data).ok()?;
            match event.kind.as_str() {
                "message_start" => {
                    if let Some(usage) = event.message.and_then(|m| m.usage) {
                        input_tokens = usage.input_tokens;
                    }
                    None
                }
                "content_block_delta" => event
                    .delta
                    .and_then(|d| d.text)
                    .filter(|t| !t.is_empty())
                    .map(StreamChunk::delta),
                "message_delta" => {
                    if let Some(usage) = event.usage {
                        output_tokens = usage.output_tokens;
                    }
                    None
                }
                "message_stop" => Some(StreamChunk::done(
                    "",
                    Some(Usage::new(input_tokens, output_tokens)),
                )),
                _ => None,
            }
        };

        Ok(pump_chunks(NAME, LABEL, response, parse))
    }

    async fn close(&self) -> Result<(), ProviderError> {
        self.client.write().await.take();
        Ok(())
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    kind: String,
    message: Option<StreamMessage>,
    delta: Option<StreamDelta>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamMessage {
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::new(&ProviderConfig {
            api_key: "sk-ant-test".to_string(),
            base_url: Some(server.uri()),
            timeout_secs: Some(5),
            stream_timeout_secs: Some(5),
            models: Vec::new(),
        })
        .unwrap()
    }

    fn params(system_prompt: Option<&str>) -> GenerationParams {
        GenerationParams {
            prompt: "Explain fractions".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            temperature: 0.5,
            max_tokens: 256,
            system_prompt: system_prompt.map(str::to_string),
        }
    }

    #[test]
    fn test_default_models() {
        let provider = AnthropicProvider::new(&ProviderConfig::default()).unwrap();
        assert_eq!(provider.supported_models().len(), 2);
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({
                "system": "You teach math",
                "messages": [{"role": "user", "content": "Explain fractions"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "claude-sonnet-4-5",
                "content": [{"type": "text", "text": "A fraction is a part of a whole."}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 12, "output_tokens": 9}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = provider_for(&server)
            .generate(&params(Some("You teach math")))
            .await
            .unwrap();

        assert_eq!(result.content, "A fraction is a part of a whole.");
        assert_eq!(result.model, "claude-sonnet-4-5-20250929");
        assert_eq!(result.usage, Usage::new(12, 9));
        assert_eq!(result.finish_reason, "end_turn");
        assert_eq!(result.provider, "anthropic");
    }

    #[tokio::test]
    async fn test_generate_omits_missing_system_prompt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "ok"}]
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        let body = serde_json::to_value(provider.build_request(&params(None), false)).unwrap();
        assert!(body.get("system").is_none());
        assert!(body.get("stream").is_none());

        let result = provider.generate(&params(None)).await.unwrap();
        assert_eq!(result.content, "ok");
        assert_eq!(result.usage, Usage::default());
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid x-api-key"))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .generate(&params(None))
            .await
            .unwrap_err();

        assert_eq!(err.status_code, 401);
        assert_eq!(err.provider, "anthropic");
        assert!(err.message.starts_with("Anthropic API error: 401"));
    }

    #[tokio::test]
    async fn test_stream_collects_usage_across_events() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":7,\"output_tokens\":1}}}\n\n",
            "event: content_block_start\n",
            "data: {\"type\":\"content_block_start\",\"index\":0}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}\n\n",
            "event: ping\n",
            "data: {\"type\":\"ping\"}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"delta\":{\"type\":\"text_delta\",\"text\":\" there\"}}\n\n",
            "event: message_delta\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"output_tokens\":4}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        );
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let chunks: Vec<_> = provider_for(&server)
            .stream(&params(None))
            .await
            .unwrap()
            .collect()
            .await;
        let chunks: Vec<StreamChunk> = chunks.into_iter().map(Result::unwrap).collect();

        assert_eq!(
            chunks,
            vec![
                StreamChunk::delta("Hello"),
                StreamChunk::delta(" there"),
                StreamChunk::done("", Some(Usage::new(7, 4))),
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_provider_rejects_calls() {
        let server = MockServer::start().await;
        let provider = provider_for(&server);
        provider.close().await.unwrap();

        let err = provider.stream(&params(None)).await.err().unwrap();
        assert_eq!(err.status_code, 503);
        assert_eq!(err.message, "Anthropic provider is closed");
    }
}
