//! HTTP API layer for the AI Gateway.
//!
//! Provides the generation endpoints, the provider listing and health.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
