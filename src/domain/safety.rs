//! Safety verdict types.
//!
//! Every filter check produces a fresh [`SafetyResult`]; nothing mutates
//! it after it is returned.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Concern a failed check was raised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCategory {
    /// Prompt injection or jailbreak phrasing.
    Injection,
    /// Markup or script injection in generated output.
    Xss,
    /// Personally identifiable information.
    Pii,
    /// Weighted-keyword content classification hit.
    Inappropriate,
    Bias,
    OffTopic,
}

impl std::fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyCategory::Injection => write!(f, "injection"),
            SafetyCategory::Xss => write!(f, "xss"),
            SafetyCategory::Pii => write!(f, "pii"),
            SafetyCategory::Inappropriate => write!(f, "inappropriate"),
            SafetyCategory::Bias => write!(f, "bias"),
            SafetyCategory::OffTopic => write!(f, "off_topic"),
        }
    }
}

/// What the caller should do with the checked text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SafetyAction {
    Allowed,
    Blocked,
    /// Replace the sensitive spans and continue.
    Redacted,
}

impl std::fmt::Display for SafetyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyAction::Allowed => write!(f, "allowed"),
            SafetyAction::Blocked => write!(f, "blocked"),
            SafetyAction::Redacted => write!(f, "redacted"),
        }
    }
}

/// Which side of the provider call a text fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Input,
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Outcome of a single safety check.
///
/// A passing result is always `Allowed` with no category; a failing one is
/// either `Blocked` or `Redacted`. Use the constructors to keep that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyResult {
    pub passed: bool,
    pub category: Option<SafetyCategory>,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub detail: String,
    pub action: SafetyAction,
}

impl SafetyResult {
    /// A passing result.
    pub fn allowed() -> Self {
        Self {
            passed: true,
            category: None,
            confidence: 1.0,
            detail: "Content passed all safety checks".to_string(),
            action: SafetyAction::Allowed,
        }
    }

    /// A failing result that rejects the text outright.
    pub fn blocked(category: SafetyCategory, confidence: f32, detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            category: Some(category),
            confidence: confidence.clamp(0.0, 1.0),
            detail: detail.into(),
            action: SafetyAction::Blocked,
        }
    }

    /// A failing result whose text may be kept once sensitive spans are replaced.
    pub fn redacted(category: SafetyCategory, confidence: f32, detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            category: Some(category),
            confidence: confidence.clamp(0.0, 1.0),
            detail: detail.into(),
            action: SafetyAction::Redacted,
        }
    }

    /// Same verdict, but forced to an outright block.
    pub fn into_blocked(self) -> Self {
        if self.passed {
            return self;
        }
        Self {
            action: SafetyAction::Blocked,
            ..self
        }
    }

    pub fn is_redaction(&self) -> bool {
        !self.passed && self.action == SafetyAction::Redacted
    }
}
