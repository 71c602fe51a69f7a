//! PII detection and redaction for generated output.
//!
//! Prompts may legitimately mention personal details (they describe the
//! subject), so only the output direction is scanned. A hit is never a
//! rejection: the caller redacts and continues.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Direction, SafetyCategory, SafetyResult};

const PII_CONFIDENCE: f32 = 0.9;

/// A class of personal data with its detector and placeholder.
struct PiiClass {
    name: &'static str,
    pattern: Regex,
    placeholder: &'static str,
}

/// Detectors in redaction order. The order is fixed and checked first-hit-wins.
static PII_CLASSES: Lazy<Vec<PiiClass>> = Lazy::new(|| {
    [
        (
            "email",
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
            "[REDACTED EMAIL]",
        ),
        (
            "phone",
            r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)\s?|\b\d{3}[-.\s])\d{3}[-.\s]\d{4}\b",
            "[REDACTED PHONE]",
        ),
        ("ssn", r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED SSN]"),
        (
            "student_id",
            r"(?i)\b(?:student_id|sid)\s*:\s*\d{5,10}\b",
            "[REDACTED STUDENT_ID]",
        ),
    ]
    .into_iter()
    .filter_map(|(name, pattern, placeholder)| match Regex::new(pattern) {
        Ok(pattern) => Some(PiiClass {
            name,
            pattern,
            placeholder,
        }),
        Err(e) => {
            tracing::error!(class = name, error = %e, "Invalid PII pattern skipped");
            None
        }
    })
    .collect()
});

/// Detects and redacts emails, phone numbers, SSNs and student identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiiFilter;

impl PiiFilter {
    pub fn new() -> Self {
        Self
    }

    /// Check text for PII. Input always passes.
    pub fn check(&self, text: &str, direction: Direction) -> SafetyResult {
        if direction == Direction::Input {
            return SafetyResult::allowed();
        }

        for class in PII_CLASSES.iter() {
            let count = class.pattern.find_iter(text).count();
            if count > 0 {
                let noun = if count == 1 { "match" } else { "matches" };
                return SafetyResult::redacted(
                    SafetyCategory::Pii,
                    PII_CONFIDENCE,
                    format!("PII detected: {} ({} {})", class.name, count, noun),
                );
            }
        }

        SafetyResult::allowed()
    }

    /// Replace every PII span with its class placeholder.
    ///
    /// Runs all classes in order over the full text; idempotent.
    pub fn redact(&self, text: &str) -> String {
        PII_CLASSES
            .iter()
            .fold(text.to_string(), |acc, class| {
                class
                    .pattern
                    .replace_all(&acc, class.placeholder)
                    .into_owned()
            })
    }
}
