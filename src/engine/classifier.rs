//! Weighted-keyword content classifier.
//!
//! Each category holds a table of keyword weights. The text is lower-cased
//! and every keyword found as a substring adds its weight; overlapping
//! keywords each count. The first category, in table order, whose score
//! reaches the safety level's threshold blocks the text.

use std::collections::BTreeMap;

use crate::domain::{Direction, SafetyCategory, SafetyResult};

/// How aggressively content is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLevel {
    Strict,
    Moderate,
    Standard,
}

impl SafetyLevel {
    /// Resolve a configured level name. Unknown names fall back to `Moderate`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "strict" => SafetyLevel::Strict,
            "moderate" => SafetyLevel::Moderate,
            "standard" => SafetyLevel::Standard,
            other => {
                tracing::debug!(level = %other, "Unknown safety level, using moderate");
                SafetyLevel::Moderate
            }
        }
    }

    /// Score at or above which a category blocks.
    pub fn threshold(&self) -> u32 {
        match self {
            SafetyLevel::Strict => 3,
            SafetyLevel::Moderate => 6,
            SafetyLevel::Standard => 10,
        }
    }
}

impl std::fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyLevel::Strict => write!(f, "strict"),
            SafetyLevel::Moderate => write!(f, "moderate"),
            SafetyLevel::Standard => write!(f, "standard"),
        }
    }
}

/// One scored category.
#[derive(Debug, Clone)]
struct CategoryTable {
    name: &'static str,
    keywords: BTreeMap<String, u32>,
}

impl CategoryTable {
    fn new(name: &'static str, keywords: &[(&str, u32)]) -> Self {
        Self {
            name,
            keywords: keywords
                .iter()
                .map(|(keyword, weight)| (keyword.to_lowercase(), *weight))
                .collect(),
        }
    }

    fn score(&self, text_lower: &str) -> u32 {
        self.keywords
            .iter()
            .filter(|(keyword, _)| text_lower.contains(keyword.as_str()))
            .map(|(_, weight)| weight)
            .sum()
    }
}

/// Keyword classifier parameterized by a [`SafetyLevel`].
#[derive(Debug, Clone)]
pub struct ContentClassifier {
    level: SafetyLevel,
    categories: Vec<CategoryTable>,
}

impl ContentClassifier {
    /// Create a classifier for the named safety level.
    pub fn new(safety_level: &str) -> Self {
        Self::with_level(SafetyLevel::from_name(safety_level))
    }

    pub fn with_level(level: SafetyLevel) -> Self {
        Self {
            level,
            categories: default_categories(),
        }
    }

    pub fn level(&self) -> SafetyLevel {
        self.level
    }

    pub fn threshold(&self) -> u32 {
        self.level.threshold()
    }

    /// Add or reweight a keyword in an existing category.
    ///
    /// Returns false if the category does not exist.
    pub fn add_keyword(&mut self, category: &str, keyword: &str, weight: u32) -> bool {
        match self.categories.iter_mut().find(|c| c.name == category) {
            Some(table) => {
                table.keywords.insert(keyword.to_lowercase(), weight);
                true
            }
            None => false,
        }
    }

    /// Score text against every category in order. Direction does not change scoring.
    pub fn check(&self, text: &str, _direction: Direction) -> SafetyResult {
        let text_lower = text.to_lowercase();
        let threshold = self.threshold();

        for table in &self.categories {
            let score = table.score(&text_lower);
            if score >= threshold {
                return SafetyResult::blocked(
                    SafetyCategory::Inappropriate,
                    (score as f32 / 10.0).min(1.0),
                    format!(
                        "Content flagged for {} (score {}, threshold {})",
                        table.name, score, threshold
                    ),
                );
            }
        }

        SafetyResult::allowed()
    }
}

/// Category tables in evaluation order.
fn default_categories() -> Vec<CategoryTable> {
    vec![
        CategoryTable::new(
            "violence",
            &[
                ("murder", 4),
                ("killing", 3),
                ("shooting", 3),
                ("stabbing", 4),
                ("bomb", 4),
                ("weapon", 3),
                ("assault", 3),
                ("torture", 4),
                ("bloodshed", 3),
                ("beat up", 3),
            ],
        ),
        CategoryTable::new(
            "self_harm",
            &[
                ("suicide", 5),
                ("self-harm", 5),
                ("self harm", 5),
                ("kill myself", 6),
                ("cut myself", 5),
                ("end my life", 6),
                ("overdose", 4),
            ],
        ),
        // Empty by default; deployments extend it with `add_keyword`.
        CategoryTable::new("explicit", &[]),
        CategoryTable::new(
            "drugs_alcohol",
            &[
                ("cocaine", 4),
                ("heroin", 4),
                ("methamphetamine", 4),
                ("marijuana", 3),
                ("get high", 3),
                ("vodka", 2),
                ("whiskey", 2),
                ("drunk", 2),
                ("beer", 1),
            ],
        ),
        CategoryTable::new(
            "bullying",
            &[
                ("kill yourself", 6),
                ("nobody likes you", 4),
                ("worthless", 3),
                ("loser", 2),
                ("idiot", 2),
                ("stupid", 1),
                ("ugly", 1),
            ],
        ),
    ]
}
