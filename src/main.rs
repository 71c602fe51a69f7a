//! AI Gateway - safety-checked access to LLM providers.
//!
//! This service mediates between client applications and LLM providers,
//! applying a content-safety pipeline to prompts and generated output.

use std::sync::Arc;

use tokio::net::TcpListener;

mod api;
mod auth;
mod config;
mod domain;
mod engine;
mod error;
mod logging;
mod prompts;
mod provider;

use crate::api::build_router;
use crate::auth::ServiceTokenValidator;
use crate::config::Config;
use crate::engine::{GenerationOrchestrator, SafetyLevel};
use crate::provider::{AnthropicProvider, OpenAiProvider, ProviderRegistry};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Runs requests through the safety pipeline and the providers.
    pub orchestrator: Arc<GenerationOrchestrator>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    logging::init();

    tracing::info!("Starting AI Gateway v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        auth_enabled = config.auth.enabled(),
        safety_level = %SafetyLevel::from_name(&config.safety.default_level),
        "Configuration loaded"
    );

    let registry = Arc::new(build_registry(&config)?);
    if registry.configured().is_empty() {
        tracing::warn!("No provider has an API key - generation requests will fail");
    }

    let orchestrator = Arc::new(GenerationOrchestrator::new(
        registry.clone(),
        config.safety.default_level.clone(),
    ));
    let state = AppState { orchestrator };

    let validator = ServiceTokenValidator::new(&config.auth.service_token);
    if validator.enabled() {
        tracing::info!("Service token authentication enabled");
    } else {
        tracing::warn!("Service token authentication is DISABLED - set auth.service_token for production");
    }

    let app = build_router(state, validator);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, closing providers");
    registry.close_all().await;

    Ok(())
}

/// Construct and register the built-in providers.
fn build_registry(config: &Config) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    let openai = OpenAiProvider::new(&config.providers.openai)?;
    registry.register("openai", Arc::new(openai))?;

    let anthropic = AnthropicProvider::new(&config.providers.anthropic)?;
    registry.register("anthropic", Arc::new(anthropic))?;

    Ok(registry)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
