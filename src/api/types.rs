//! API response types not owned by the domain layer.

use serde::Serialize;
use utoipa::ToSchema;

/// Component checks reported by the health endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// `ok` when at least one provider has credentials, else `degraded`.
    pub providers: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Timestamp.
    pub timestamp: String,
    pub checks: HealthChecks,
    /// Providers with credentials present, sorted by name.
    pub providers_configured: Vec<String>,
}
