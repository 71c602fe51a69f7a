//! Safety pipeline - ordered filters with direction-specific short-circuit policy.
//!
//! Input checks force any failure to a block. Output checks return the
//! failing result as-is, so a PII redaction reaches the caller as
//! "redact and continue" while every other failure means reject.

use crate::domain::{Direction, SafetyResult};
use crate::engine::{ContentClassifier, PatternFirewall, PiiFilter};

/// The closed set of filters the pipeline can run.
#[derive(Debug, Clone)]
pub enum ContentFilter {
    Pattern(PatternFirewall),
    Pii(PiiFilter),
    Classifier(ContentClassifier),
}

impl ContentFilter {
    /// Classify a text fragment for this filter's concern.
    pub fn check(&self, text: &str, direction: Direction) -> SafetyResult {
        match self {
            ContentFilter::Pattern(filter) => filter.check(text, direction),
            ContentFilter::Pii(filter) => filter.check(text, direction),
            ContentFilter::Classifier(filter) => filter.check(text, direction),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContentFilter::Pattern(_) => "pattern_firewall",
            ContentFilter::Pii(_) => "pii_filter",
            ContentFilter::Classifier(_) => "content_classifier",
        }
    }
}

/// Ordered filter chain. Order defines precedence and is preserved.
#[derive(Debug, Clone, Default)]
pub struct SafetyPipeline {
    filters: Vec<ContentFilter>,
}

impl SafetyPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard chain: pattern firewall, PII filter, content classifier.
    pub fn standard(safety_level: &str) -> Self {
        Self::new()
            .with_filter(ContentFilter::Pattern(PatternFirewall::new()))
            .with_filter(ContentFilter::Pii(PiiFilter::new()))
            .with_filter(ContentFilter::Classifier(ContentClassifier::new(
                safety_level,
            )))
    }

    /// Append a filter after the existing ones.
    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(&self) -> &[ContentFilter] {
        &self.filters
    }

    /// Check a prompt. The first failure wins and is always a block.
    pub fn check_input(&self, text: &str) -> SafetyResult {
        match self.first_failure(text, Direction::Input) {
            Some(result) => result.into_blocked(),
            None => SafetyResult::allowed(),
        }
    }

    /// Check generated text. The first failure wins with its own action.
    pub fn check_output(&self, text: &str) -> SafetyResult {
        self.first_failure(text, Direction::Output)
            .unwrap_or_else(SafetyResult::allowed)
    }

    fn first_failure(&self, text: &str, direction: Direction) -> Option<SafetyResult> {
        for filter in &self.filters {
            let result = filter.check(text, direction);
            if !result.passed {
                tracing::debug!(
                    filter = filter.name(),
                    direction = %direction,
                    category = ?result.category,
                    action = %result.action,
                    "Safety filter triggered"
                );
                return Some(result);
            }
        }
        None
    }
}
