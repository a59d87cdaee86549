use chrono::Utc;
use tracing::{debug, info};

use super::types::{FailureAnalysis, FailureContext};
use crate::classification::{ErrorClassification, ErrorClassifier, ErrorPattern};
use crate::config::{AnalyzerConfig, TriageConfig};
use crate::strategy::{RetryStrategy, StrategyCatalog, ids, sort_by_confidence};
use crate::utils::truncate_with_marker;

/// Suggested when nothing in the catalog matched the failure text.
const FALLBACK_STRATEGIES: [&str; 3] = [
    ids::SIMPLE_REDO,
    ids::SKIP_PHASE,
    ids::REDO_WITH_ERROR_CONTEXT,
];

/// Turns one failure event into ranked, context-enriched remediation strategies.
#[derive(Debug, Clone, Default)]
pub struct FailureAnalyzer {
    classifier: ErrorClassifier,
    strategies: StrategyCatalog,
    config: AnalyzerConfig,
}

impl FailureAnalyzer {
    pub fn new(config: &TriageConfig) -> Self {
        Self {
            classifier: ErrorClassifier::new(config.classifier.clone()),
            strategies: StrategyCatalog::new(),
            config: config.analyzer.clone(),
        }
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn strategies(&self) -> &StrategyCatalog {
        &self.strategies
    }

    pub fn add_custom_pattern(&mut self, pattern: ErrorPattern) {
        self.classifier.add_custom_pattern(pattern);
    }

    pub fn add_custom_strategy(&mut self, strategy: RetryStrategy) {
        self.strategies.add_custom_strategy(strategy);
    }

    /// Never fails: unmatched or empty text still yields fallback strategies.
    pub fn analyze_failure(
        &self,
        issue_number: u32,
        phase_number: u32,
        error_text: &str,
        context: FailureContext,
    ) -> FailureAnalysis {
        let classifications = self.classifier.classify(error_text);
        // Classifications are sorted, so the first one carries the max confidence
        let primary_classification = classifications.first().cloned();
        let suggested_strategies = self.build_suggested_strategies(&classifications, &context);

        info!(
            issue_number,
            phase_number,
            classifications = classifications.len(),
            primary = primary_classification.as_ref().map(|c| c.pattern_id.as_str()),
            top_strategy = suggested_strategies.first().map(|s| s.id.as_str()),
            "Failure analyzed"
        );

        FailureAnalysis {
            issue_number,
            phase_number,
            timestamp: Utc::now(),
            error_text: error_text.to_string(),
            classifications,
            primary_classification,
            suggested_strategies,
            context,
        }
    }

    /// Catalog strategies applicable to the classification's category or
    /// marked generic, sorted by descending confidence.
    pub fn get_available_strategies(
        &self,
        classification: &ErrorClassification,
    ) -> Vec<RetryStrategy> {
        self.strategies.applicable_to(classification.category)
    }

    /// Union of the strategies available for every classification, first-seen
    /// dedup by id, re-sorted by confidence, each enriched with context hints.
    pub fn build_suggested_strategies(
        &self,
        classifications: &[ErrorClassification],
        context: &FailureContext,
    ) -> Vec<RetryStrategy> {
        if classifications.is_empty() {
            return self.fallback_strategies(context);
        }

        let mut suggested: Vec<RetryStrategy> = Vec::new();
        for classification in classifications {
            let hints = self.context_hints(Some(classification), context);
            for strategy in self.get_available_strategies(classification) {
                if suggested.iter().any(|s| s.id == strategy.id) {
                    continue;
                }
                suggested.push(strategy.with_hints(hints.clone()));
            }
        }

        sort_by_confidence(&mut suggested);
        debug!(count = suggested.len(), "Built suggested strategies");
        suggested
    }

    fn fallback_strategies(&self, context: &FailureContext) -> Vec<RetryStrategy> {
        let hints = self.context_hints(None, context);
        let mut fallback: Vec<RetryStrategy> = FALLBACK_STRATEGIES
            .iter()
            .filter_map(|id| self.strategies.get(id))
            .map(|s| s.with_hints(hints.clone()))
            .collect();
        sort_by_confidence(&mut fallback);
        debug!(count = fallback.len(), "No classification, using fallback strategies");
        fallback
    }

    fn context_hints(
        &self,
        classification: Option<&ErrorClassification>,
        context: &FailureContext,
    ) -> Vec<String> {
        let max = self.config.max_hint_len;
        let mut hints = Vec::new();

        if let Some(c) = classification {
            match (&c.context.file, c.context.line) {
                (Some(file), Some(line)) => hints.push(format!("Error location: {}:{}", file, line)),
                (Some(file), None) => hints.push(format!("Error location: {}", file)),
                (None, Some(line)) => hints.push(format!("Error line: {}", line)),
                (None, None) => {}
            }
            if !c.matched_text.is_empty() {
                hints.push(truncate_with_marker(
                    &format!("Matched error: {}", c.matched_text),
                    max,
                ));
            }
        }

        if !context.files.is_empty() {
            let shown: Vec<&str> = context
                .files
                .iter()
                .take(self.config.max_context_files)
                .map(String::as_str)
                .collect();
            let hidden = context.files.len() - shown.len();
            let mut hint = format!("Files involved: {}", shown.join(", "));
            if hidden > 0 {
                hint.push_str(&format!(" (+{} more)", hidden));
            }
            hints.push(truncate_with_marker(&hint, max));
        }

        if let Some(command) = &context.last_command {
            hints.push(truncate_with_marker(&format!("Last command: {}", command), max));
        }

        hints
    }
}
