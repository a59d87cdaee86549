//! Cluster → pattern promotion and pattern matching.

use std::collections::HashSet;

use chrono::Utc;
use regex::Regex;

use super::types::{
    FailureCluster, FailurePattern, FailureRecord, MeasureType, PatternCategory, PatternMatch,
    PreventiveMeasure,
};
use crate::classification::{ErrorCategory, compile_signature};
use crate::config::ClusteringConfig;
use crate::utils::{clamp_unit, title_case};

const MAX_NAME_TERMS: usize = 3;

fn bucket(category: ErrorCategory) -> Option<PatternCategory> {
    match category {
        ErrorCategory::Syntax | ErrorCategory::Test => Some(PatternCategory::Code),
        ErrorCategory::Dependency | ErrorCategory::Resource | ErrorCategory::Permission => {
            Some(PatternCategory::Project)
        }
        ErrorCategory::Timeout | ErrorCategory::Network => Some(PatternCategory::Workflow),
        ErrorCategory::Unknown => None,
    }
}

/// Majority vote over member categories. Ties resolve code, then project,
/// then workflow. Clusters of only unclassified failures map to `Other`.
pub fn pattern_category(failures: &[FailureRecord]) -> PatternCategory {
    let mut votes = [
        (PatternCategory::Code, 0usize),
        (PatternCategory::Project, 0),
        (PatternCategory::Workflow, 0),
    ];
    for category in failures.iter().filter_map(|f| bucket(f.error_category)) {
        if let Some(slot) = votes.iter_mut().find(|(c, _)| *c == category) {
            slot.1 += 1;
        }
    }

    let mut winner: Option<(PatternCategory, usize)> = None;
    for (category, count) in votes {
        if count > 0 && winner.is_none_or(|(_, best)| count > best) {
            winner = Some((category, count));
        }
    }
    winner.map(|(c, _)| c).unwrap_or(PatternCategory::Other)
}

/// Canned prevention advice for a pattern category.
pub fn default_measures(pattern_id: &str, category: PatternCategory) -> Vec<PreventiveMeasure> {
    let id = |suffix: &str| format!("{}-{}", pattern_id, suffix);
    match category {
        PatternCategory::Code => vec![
            PreventiveMeasure::new(
                id("verify-build"),
                "Run the type checker and linter before completing the phase",
                MeasureType::Verification,
                true,
                0.8,
                "Add a build/lint verification step to the phase plan",
            ),
            PreventiveMeasure::new(
                id("error-context"),
                "Include recent error output when re-running the phase",
                MeasureType::Context,
                true,
                0.7,
                "Attach the last failing output to the phase context",
            ),
        ],
        PatternCategory::Project => vec![
            PreventiveMeasure::new(
                id("verify-dependencies"),
                "Verify dependencies are installed before executing the phase",
                MeasureType::Verification,
                true,
                0.85,
                "Run the install command as the first phase step",
            ),
            PreventiveMeasure::new(
                id("document-setup"),
                "Document required environment setup in the plan",
                MeasureType::Manual,
                false,
                0.6,
                "List packages, permissions and resource limits the phase relies on",
            ),
        ],
        PatternCategory::Workflow => vec![
            PreventiveMeasure::new(
                id("split-phase"),
                "Split long-running work into smaller phases",
                MeasureType::PhaseStructure,
                false,
                0.6,
                "Break the phase so each step finishes well within time limits",
            ),
            PreventiveMeasure::new(
                id("transient-retry"),
                "Allow a retry for steps that depend on the network",
                MeasureType::Context,
                true,
                0.4,
                "Mark network-bound steps as retryable in the phase context",
            ),
        ],
        PatternCategory::Other => vec![PreventiveMeasure::new(
            id("review"),
            "Review the recurring failure and add guidance to the plan",
            MeasureType::Manual,
            false,
            0.5,
            "Capture what resolved previous occurrences in the plan notes",
        )],
    }
}

/// Promote a cluster to a named pattern. Returns `None` for empty clusters.
pub fn extract_pattern(
    cluster: &FailureCluster,
    id: &str,
    config: &ClusteringConfig,
) -> Option<FailurePattern> {
    let last_occurrence = cluster.failures.iter().map(|f| f.timestamp).max()?;
    let category = pattern_category(&cluster.failures);
    let terms = &cluster.common_error_terms;

    let name = if terms.is_empty() {
        format!("{} Failure Pattern", title_case(&category.to_string()))
    } else {
        let words: Vec<String> = terms
            .iter()
            .take(MAX_NAME_TERMS)
            .map(|t| title_case(t))
            .collect();
        format!("{} Pattern", words.join(" "))
    };

    let mut affected_issues = Vec::new();
    for failure in &cluster.failures {
        if !affected_issues.contains(&failure.issue_number) {
            affected_issues.push(failure.issue_number);
        }
    }

    let mut seen = HashSet::new();
    let context_indicators: Vec<String> = cluster
        .failures
        .iter()
        .map(|f| f.error_category)
        .filter(|c| *c != ErrorCategory::Unknown)
        .filter(|c| seen.insert(*c))
        .map(|c| c.as_str().to_string())
        .collect();

    let mut description = format!(
        "Recurring {} failure seen {} times across {} issue(s)",
        category,
        cluster.failures.len(),
        affected_issues.len()
    );
    if !terms.is_empty() {
        description.push_str(&format!("; common terms: {}", terms.join(", ")));
    }

    let now = Utc::now();
    Some(FailurePattern {
        id: id.to_string(),
        name,
        description,
        category,
        error_signatures: terms
            .iter()
            .take(config.max_signatures)
            .map(|t| format!(r"\b{}\b", regex::escape(t)))
            .collect(),
        file_patterns: cluster.common_files.clone(),
        context_indicators,
        occurrence_count: u32::try_from(cluster.failures.len()).unwrap_or(u32::MAX),
        last_occurrence,
        affected_issues,
        successful_fixes: Vec::new(),
        preventive_measures: default_measures(id, category),
        created_at: now,
        updated_at: now,
    })
}

/// Compile a pattern's signatures, dropping invalid ones.
pub(crate) fn compile_signatures(signatures: &[String]) -> Vec<Regex> {
    signatures.iter().filter_map(|s| compile_signature(s)).collect()
}

fn score_pattern(
    failure: &FailureRecord,
    pattern: &FailurePattern,
    matchers: &[Regex],
    config: &ClusteringConfig,
) -> (f64, Vec<String>) {
    let mut score = 0.0;
    let mut matched = Vec::new();

    for matcher in matchers {
        if matcher.is_match(&failure.error_text) {
            score += config.signature_weight;
            matched.push(matcher.as_str().to_string());
        }
    }

    for file_pattern in pattern.file_patterns.iter().filter(|p| !p.is_empty()) {
        let hit = failure
            .files
            .iter()
            .any(|f| f.contains(file_pattern.as_str()) || file_pattern.contains(f.as_str()));
        if hit {
            score += config.file_pattern_weight;
            matched.push(file_pattern.clone());
        }
    }

    let text = failure.error_text.to_lowercase();
    for indicator in pattern.context_indicators.iter().filter(|i| !i.is_empty()) {
        if text.contains(&indicator.to_lowercase()) {
            score += config.indicator_weight;
            matched.push(indicator.clone());
        }
    }

    (clamp_unit(score), matched)
}

/// Score patterns whose signatures are already compiled, strongest first.
pub(crate) fn rank_matches<'p>(
    failure: &FailureRecord,
    candidates: impl Iterator<Item = (&'p FailurePattern, &'p [Regex])>,
    config: &ClusteringConfig,
) -> Vec<PatternMatch> {
    let mut matches: Vec<PatternMatch> = candidates
        .filter_map(|(pattern, matchers)| {
            let (confidence, matched_indicators) =
                score_pattern(failure, pattern, matchers, config);
            (confidence > config.min_match_confidence).then(|| PatternMatch {
                pattern: pattern.clone(),
                confidence,
                matched_indicators,
                suggested_measures: pattern
                    .preventive_measures
                    .iter()
                    .filter(|m| m.effectiveness >= config.min_measure_effectiveness)
                    .cloned()
                    .collect(),
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches
}

/// Patterns that explain a failure, strongest first.
pub fn match_patterns(
    failure: &FailureRecord,
    patterns: &[FailurePattern],
    config: &ClusteringConfig,
) -> Vec<PatternMatch> {
    let compiled: Vec<Vec<Regex>> = patterns
        .iter()
        .map(|p| compile_signatures(&p.error_signatures))
        .collect();
    rank_matches(
        failure,
        patterns.iter().zip(compiled.iter().map(Vec::as_slice)),
        config,
    )
}
