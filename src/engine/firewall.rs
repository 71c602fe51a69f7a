//! Pattern firewall - detects prompt injection and markup injection.
//!
//! This is the first filter in the safety pipeline. Prompts are scanned for
//! injection and jailbreak phrasing; generated output is scanned for script
//! and markup that would execute in a browser.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{Direction, SafetyCategory, SafetyResult};

/// Reason returned for any blocked prompt. Never names the matched rule.
const INPUT_REASON: &str = "Input rejected: potentially unsafe instructions detected";

/// Reason returned for any blocked output. Never names the matched rule.
const OUTPUT_REASON: &str = "Output flagged as unsafe: executable markup detected";

const MATCH_CONFIDENCE: f32 = 0.95;

static INPUT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        // Instruction override
        r"ignore\s+(all\s+)?(the\s+)?(previous|prior|above|earlier)\s+(instructions|prompts|rules|directions)",
        r"disregard\s+(all\s+)?(the\s+)?(previous|prior|above|your)\b",
        r"override\s+(your\s+|the\s+)?(system\s+prompt|instructions|safety\s+rules)",
        r"forget\s+(all\s+)?(your|previous|prior)\s+(instructions|rules|guidelines)",
        // Role-play hijack
        r"you\s+are\s+now\s+(a|an)\s+(malicious|evil|unrestricted|unfiltered|uncensored)",
        r"(enter|enable|activate|switch\s+to)\s+(developer|debug|god|dan)\s+mode",
        r"pretend\s+(you\s+have|there\s+are)\s+no\s+(rules|restrictions|guidelines)",
        // System prompt extraction
        r"(reveal|show|print|output|repeat|display)\s+(me\s+)?(your|the)\s+(system\s+|initial\s+|hidden\s+|original\s+)?(prompt|instructions)",
        r"what\s+(is|are)\s+your\s+(system\s+|initial\s+|hidden\s+)?(prompt|instructions)",
        // Base64 smuggling
        r"(decode|execute|run|follow)\s+(this|the\s+following)\s+base64",
        r"base64\s*[:=]\s*[a-z0-9+/]{24,}={0,2}",
        // Outbound exfiltration
        r"(send|post|upload|transmit|forward|exfiltrate)\b.{0,80}?\bto\s+https?://",
        r"\bcurl\b.{0,80}?https?://",
    ])
});

static OUTPUT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"<\s*script",
        r"javascript\s*:",
        // Inline event handler attribute inside a tag
        r"<[^>]*\bon\w+\s*=",
        r"<\s*iframe",
        r"<\s*object",
        r"<\s*embed",
        r"data\s*:\s*text/html",
    ])
});

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| match Regex::new(&format!("(?i){pattern}")) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::error!(error = %e, "Invalid firewall pattern skipped");
                None
            }
        })
        .collect()
}

/// Outcome of a firewall scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallOutcome {
    /// Text appears clean.
    Clean,
    /// Text matched a rule and must be rejected.
    Blocked { reason: &'static str },
}

impl FirewallOutcome {
    pub fn is_safe(&self) -> bool {
        matches!(self, FirewallOutcome::Clean)
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            FirewallOutcome::Clean => None,
            FirewallOutcome::Blocked { reason } => Some(reason),
        }
    }
}

/// Binary pass/fail pattern matcher with separate input and output rule sets.
///
/// The first matching pattern short-circuits; there is no partial scoring.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternFirewall;

impl PatternFirewall {
    pub fn new() -> Self {
        Self
    }

    /// Scan a prompt for injection and jailbreak phrasing.
    pub fn check_input(&self, text: &str) -> FirewallOutcome {
        Self::scan(text, &INPUT_PATTERNS, INPUT_REASON)
    }

    /// Scan generated text for script and markup injection.
    pub fn check_output(&self, text: &str) -> FirewallOutcome {
        Self::scan(text, &OUTPUT_PATTERNS, OUTPUT_REASON)
    }

    /// Pipeline entry point.
    pub fn check(&self, text: &str, direction: Direction) -> SafetyResult {
        let (outcome, category) = match direction {
            Direction::Input => (self.check_input(text), SafetyCategory::Injection),
            Direction::Output => (self.check_output(text), SafetyCategory::Xss),
        };

        match outcome.reason() {
            None => SafetyResult::allowed(),
            Some(reason) => SafetyResult::blocked(category, MATCH_CONFIDENCE, reason),
        }
    }

    fn scan(text: &str, patterns: &[Regex], reason: &'static str) -> FirewallOutcome {
        if patterns.iter().any(|pattern| pattern.is_match(text)) {
            FirewallOutcome::Blocked { reason }
        } else {
            FirewallOutcome::Clean
        }
    }
}
