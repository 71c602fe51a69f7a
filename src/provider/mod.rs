//! LLM provider abstraction.
//!
//! A provider is any text-generation backend with a non-streaming call, a
//! streaming call and a shutdown hook. Concrete HTTP backends live in the
//! submodules; the registry maps configured names to instances.

mod anthropic;
mod openai;
mod registry;
mod sse;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;

use crate::domain::{GenerateResponse, GenerationParams, StreamChunk};

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use registry::*;

/// Lazy, finite, single-use sequence of chunks from one streaming call.
///
/// Ends after the terminal chunk, or after an `Err` item if the provider
/// fails mid-stream. Dropping it releases the underlying connection.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, ProviderError>> + Send>>;

/// Default status for upstream failures that carry no specific code.
pub const BAD_GATEWAY: u16 = 502;

/// Any provider-side failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
    pub provider: String,
    pub status_code: u16,
}

impl ProviderError {
    /// A failure with the default 502 status.
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            provider: provider.into(),
            status_code: BAD_GATEWAY,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    /// Credentials were never configured for this provider.
    pub fn not_configured(provider: &str, label: &str) -> Self {
        Self::new(provider, format!("{label} API key is not configured")).with_status(500)
    }

    /// The provider was closed during shutdown.
    pub fn closed(provider: &str, label: &str) -> Self {
        Self::new(provider, format!("{label} provider is closed")).with_status(503)
    }

    /// Upstream answered with a non-success status.
    pub fn upstream(provider: &str, label: &str, status: u16, body: &str) -> Self {
        let detail: String = body.chars().take(500).collect();
        Self::new(provider, format!("{label} API error: {status} {detail}").trim_end())
            .with_status(status)
    }

    /// Transport failure while sending or reading.
    pub fn transport(provider: &str, label: &str, err: &reqwest::Error) -> Self {
        tracing::warn!(provider = %provider, error = %err, "Provider transport failure");
        if err.is_timeout() {
            Self::new(provider, format!("{label} request timed out"))
        } else {
            Self::new(provider, format!("{label} request failed"))
        }
    }
}

/// Capability every LLM backend implements.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Models this backend accepts, in display order.
    fn supported_models(&self) -> &[String];

    /// Whether credentials are present.
    fn is_configured(&self) -> bool {
        true
    }

    /// Generate a complete response.
    async fn generate(&self, params: &GenerationParams) -> Result<GenerateResponse, ProviderError>;

    /// Start a streaming generation.
    ///
    /// Setup failures (credentials, handshake, non-2xx) are returned here;
    /// later failures arrive as an `Err` item in the stream.
    async fn stream(&self, params: &GenerationParams) -> Result<ChunkStream, ProviderError>;

    /// Release transport resources. Idempotent.
    async fn close(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_bad_gateway() {
        let err = ProviderError::new("openai", "boom");
        assert_eq!(err.status_code, 502);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_upstream_error_truncates_body() {
        let body = "x".repeat(2000);
        let err = ProviderError::upstream("openai", "OpenAI", 429, &body);
        assert_eq!(err.status_code, 429);
        assert!(err.message.starts_with("OpenAI API error: 429 "));
        assert!(err.message.len() < 600);
    }

    #[test]
    fn test_not_configured() {
        let err = ProviderError::not_configured("anthropic", "Anthropic");
        assert_eq!(err.status_code, 500);
        assert!(err.message.contains("not configured"));
    }

    #[tokio::test]
    async fn test_transport_error_hides_upstream_detail() {
        let source = reqwest::Client::new()
            .get("http://127.0.0.1:1/v1/secret-path")
            .send()
            .await
            .unwrap_err();

        let err = ProviderError::transport("openai", "OpenAI", &source);
        assert_eq!(err.message, "OpenAI request failed");
        assert_eq!(err.status_code, 502);
    }
}
