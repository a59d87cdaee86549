use tracing::debug;

use super::catalog::{ErrorPattern, PatternCatalog};
use super::context::extract_context;
use super::types::ErrorClassification;
use crate::config::ClassifierConfig;
use crate::utils::{clamp_unit, truncate_with_marker};

/// Matches failure text against the pattern catalog.
#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    catalog: PatternCatalog,
    config: ClassifierConfig,
}

impl ErrorClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            catalog: PatternCatalog::new(),
            config,
        }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn add_custom_pattern(&mut self, pattern: ErrorPattern) {
        debug!(pattern_id = %pattern.id, "Registering custom error pattern");
        self.catalog.add_custom(pattern);
    }

    /// Strategy ids the catalog suggests for a pattern.
    pub fn suggested_strategy_ids(&self, pattern_id: &str) -> Vec<String> {
        self.catalog
            .get(pattern_id)
            .map(|p| p.suggested_strategies.clone())
            .unwrap_or_default()
    }

    /// Classify failure text. At most one classification per pattern, sorted
    /// by descending confidence. Blank or unmatched text yields an empty list.
    pub fn classify(&self, text: &str) -> Vec<ErrorClassification> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let context = extract_context(text);
        let bonus = if context.has_location() {
            self.config.context_bonus
        } else {
            0.0
        };

        let mut classifications: Vec<ErrorClassification> = self
            .catalog
            .iter()
            .filter_map(|compiled| {
                let matched = compiled.find(text)?;
                Some(ErrorClassification {
                    pattern_id: compiled.pattern.id.clone(),
                    category: compiled.pattern.category,
                    confidence: clamp_unit(compiled.pattern.base_confidence + bonus),
                    matched_text: truncate_with_marker(matched, self.config.max_matched_text_len),
                    context: context.clone(),
                })
            })
            .collect();

        // Stable sort keeps catalog order among equal confidences
        classifications.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(
            matches = classifications.len(),
            file = ?context.file,
            line = ?context.line,
            "Classified failure text"
        );

        classifications
    }
}
