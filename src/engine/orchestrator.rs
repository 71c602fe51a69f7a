//! Generation orchestrator - safety pipeline around provider calls.
//!
//! Runs the input check, resolves the provider and system prompt, invokes
//! the provider, then applies the output check either to the whole
//! response or to each streamed increment.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;

use crate::domain::{
    Direction, GenerateRequest, Generation, GenerationParams, SafetyResult, StreamChunk,
    StreamEvent,
};
use crate::engine::{PiiFilter, SafetyPipeline};
use crate::error::{GatewayError, GatewayResult, INTERNAL_ERROR_MESSAGE};
use crate::logging::SAFETY_TARGET;
use crate::prompts::system_prompt_for;
use crate::provider::{ChunkStream, Provider, ProviderRegistry};

/// Detail returned when generated output fails review.
pub const OUTPUT_REJECTED: &str =
    "Generated content was flagged as unsafe and did not pass safety review";

/// Error event sent when a provider stream stops without a terminal chunk.
pub const STREAM_INCOMPLETE: &str = "Provider stream ended before completion";

/// Request fields attached to every safety event.
#[derive(Debug, Clone)]
struct SafetyScope {
    task_type: Option<String>,
    tenant_id: Option<String>,
    safety_level: String,
}

impl SafetyScope {
    fn log(&self, direction: Direction, result: &SafetyResult) {
        let category = result.category.map(|c| c.to_string());
        tracing::warn!(
            target: SAFETY_TARGET,
            direction = %direction,
            category = category.as_deref(),
            action = %result.action,
            confidence = result.confidence,
            detail = %result.detail,
            task_type = self.task_type.as_deref(),
            tenant_id = self.tenant_id.as_deref(),
            safety_level = %self.safety_level,
            "Safety event"
        );
    }
}

/// A request that passed the input check and resolved its provider.
struct Prepared {
    provider: Arc<dyn Provider>,
    params: GenerationParams,
    pipeline: SafetyPipeline,
    scope: SafetyScope,
}

/// Drives generation requests through the safety pipeline.
pub struct GenerationOrchestrator {
    registry: Arc<ProviderRegistry>,
    default_safety_level: String,
}

impl GenerationOrchestrator {
    pub fn new(registry: Arc<ProviderRegistry>, default_safety_level: impl Into<String>) -> Self {
        Self {
            registry,
            default_safety_level: default_safety_level.into(),
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Non-streaming generation.
    pub async fn generate(&self, request: &GenerateRequest) -> GatewayResult<Generation> {
        let prepared = self.prepare(request)?;

        let response = prepared.provider.generate(&prepared.params).await?;

        let verdict = prepared.pipeline.check_output(&response.content);
        let content = if verdict.passed {
            response.content.clone()
        } else if verdict.is_redaction() {
            prepared.scope.log(Direction::Output, &verdict);
            PiiFilter::new().redact(&response.content)
        } else {
            prepared.scope.log(Direction::Output, &verdict);
            return Err(GatewayError::ContentSafety {
                category: verdict.category,
                detail: OUTPUT_REJECTED.to_string(),
            });
        };

        tracing::info!(
            provider = %response.provider,
            model = %response.model,
            total_tokens = response.usage.total_tokens,
            redacted = verdict.is_redaction(),
            "Generation complete"
        );

        Ok(Generation::new(response, content, request.task_type.clone()))
    }

    /// Streaming generation.
    ///
    /// Input and provider resolution failures are returned directly. Once
    /// this returns `Ok`, every outcome arrives as events on the receiver,
    /// ending with exactly one terminal event, including when the relay
    /// task panics. Dropping the receiver stops the relay and releases the
    /// provider stream.
    pub fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> GatewayResult<mpsc::Receiver<StreamEvent>> {
        let prepared = self.prepare(request)?;
        let (tx, rx) = mpsc::channel(1);
        let fallback = tx.clone();

        let handle = tokio::spawn(relay(prepared, tx));
        tokio::spawn(async move {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Stream relay aborted");
                let _ = fallback.send(StreamEvent::error(INTERNAL_ERROR_MESSAGE)).await;
            }
        });

        Ok(rx)
    }

    fn prepare(&self, request: &GenerateRequest) -> GatewayResult<Prepared> {
        let safety_level = request
            .safety_level()
            .unwrap_or(&self.default_safety_level)
            .to_string();
        let pipeline = SafetyPipeline::standard(&safety_level);
        let scope = SafetyScope {
            task_type: request.task_type.clone(),
            tenant_id: request.tenant_id().map(str::to_string),
            safety_level,
        };

        let verdict = pipeline.check_input(&request.prompt);
        if !verdict.passed {
            scope.log(Direction::Input, &verdict);
            return Err(GatewayError::ContentSafety {
                category: verdict.category,
                detail: verdict.detail,
            });
        }

        let provider = self.registry.get(&request.provider)?;

        let system_prompt = request
            .system_prompt
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                request
                    .task_type
                    .as_deref()
                    .and_then(system_prompt_for)
                    .map(str::to_string)
            });

        Ok(Prepared {
            provider,
            params: request.params(system_prompt),
            pipeline,
            scope,
        })
    }
}

/// Pull chunks from the provider one at a time, screen each, and forward it.
async fn relay(prepared: Prepared, tx: mpsc::Sender<StreamEvent>) {
    let Prepared {
        provider,
        params,
        pipeline,
        scope,
    } = prepared;

    let mut chunks: ChunkStream = match provider.stream(&params).await {
        Ok(chunks) => chunks,
        Err(e) => {
            tracing::warn!(provider = %e.provider, error = %e.message, "Stream setup failed");
            let _ = tx.send(StreamEvent::error(e.message)).await;
            return;
        }
    };

    loop {
        let next = tokio::select! {
            next = chunks.next() => next,
            _ = tx.closed() => {
                tracing::debug!(model = %params.model, "Client disconnected, stopping stream");
                return;
            }
        };

        let event = match next {
            Some(Ok(chunk)) => screen_chunk(&pipeline, &scope, chunk),
            Some(Err(e)) => {
                tracing::warn!(provider = %e.provider, error = %e.message, "Provider failed mid-stream");
                StreamEvent::error(e.message)
            }
            None => StreamEvent::error(STREAM_INCOMPLETE),
        };

        let terminal = event.is_terminal();
        if tx.send(event).await.is_err() || terminal {
            return;
        }
    }
}

/// Check one increment on its own and turn it into the event to emit.
fn screen_chunk(pipeline: &SafetyPipeline, scope: &SafetyScope, chunk: StreamChunk) -> StreamEvent {
    let mut content = chunk.content;

    if !content.is_empty() {
        let verdict = pipeline.check_output(&content);
        if verdict.is_redaction() {
            scope.log(Direction::Output, &verdict);
            content = PiiFilter::new().redact(&content);
        } else if !verdict.passed {
            scope.log(Direction::Output, &verdict);
            return StreamEvent::error(OUTPUT_REJECTED);
        }
    }

    if chunk.done {
        StreamEvent::done(content, chunk.usage)
    } else {
        StreamEvent::chunk(content)
    }
}
