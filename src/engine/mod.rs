//! Safety engine for the AI Gateway.
//!
//! This module contains the content-safety pipeline and the orchestrator
//! that applies it around provider calls:
//! - Pattern Firewall: prompt injection on input, executable markup on output
//! - PII Filter: detects and redacts personal data in generated output
//! - Content Classifier: weighted keyword scoring per safety level
//! - Safety Pipeline: ordered filters with direction-specific short-circuit
//! - Generation Orchestrator: input check, provider call, output check

mod classifier;
mod firewall;
mod orchestrator;
mod pii;
mod pipeline;

pub use classifier::*;
pub use firewall::*;
pub use orchestrator::*;
pub use pii::*;
pub use pipeline::*;
