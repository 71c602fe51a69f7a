//! Name-keyed provider registry.
//!
//! Built once at startup, then shared read-only behind an `Arc`.
//! `register` takes `&mut self`, so it cannot race with request handling.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::Provider;

/// Registry lookup and wiring errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Provider '{0}' already registered")]
    AlreadyRegistered(String),

    #[error("Provider '{0}' not registered")]
    NotRegistered(String),
}

/// Entry in the external provider listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProviderInfo {
    pub name: String,
    pub models: Vec<String>,
}

/// Configured providers keyed by name.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under a unique name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        provider: Arc<dyn Provider>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.providers.contains_key(&name) {
            return Err(RegistryError::AlreadyRegistered(name));
        }

        tracing::info!(
            provider = %name,
            models = provider.supported_models().len(),
            configured = provider.is_configured(),
            "Provider registered"
        );
        self.providers.insert(name, provider);
        Ok(())
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Provider>, RegistryError> {
        self.providers
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))
    }

    /// Registered providers sorted by name.
    pub fn list(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|(name, provider)| ProviderInfo {
                name: name.clone(),
                models: provider.supported_models().to_vec(),
            })
            .collect()
    }

    /// Names of providers whose credentials are present, sorted.
    pub fn configured(&self) -> Vec<String> {
        self.providers
            .iter()
            .filter(|(_, provider)| provider.is_configured())
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Close every provider. Failures are logged and do not stop the rest.
    pub async fn close_all(&self) {
        for (name, provider) in &self.providers {
            match provider.close().await {
                Ok(()) => tracing::debug!(provider = %name, "Provider closed"),
                Err(e) => tracing::warn!(provider = %name, error = %e, "Provider close failed"),
            }
        }
    }
}
