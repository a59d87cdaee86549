use std::collections::HashMap;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, info, warn};

use super::clustering::cluster_failures;
use super::patterns::{compile_signatures, extract_pattern, rank_matches};
use super::types::{
    FailureCluster, FailurePattern, FailureRecord, FixRecord, PatternMatch, Resolution,
};
use crate::config::ClusteringConfig;
use crate::utils::clamp_unit;

const PATTERN_ID_PREFIX: &str = "pattern-";

/// In-memory failure history and pattern set.
///
/// Persistence lives in [`FailureStore`](super::FailureStore); hosts load the
/// stored state with [`restore`](Self::restore) and save it back after mutating.
#[derive(Debug, Clone)]
pub struct FailureClusteringEngine {
    config: ClusteringConfig,
    failures: Vec<FailureRecord>,
    patterns: Vec<FailurePattern>,
    /// Compiled signatures per pattern id, refreshed on every upsert.
    matchers: HashMap<String, Vec<Regex>>,
    next_pattern_id: u64,
}

impl Default for FailureClusteringEngine {
    fn default() -> Self {
        Self::new(ClusteringConfig::default())
    }
}

impl FailureClusteringEngine {
    pub fn new(config: ClusteringConfig) -> Self {
        Self {
            config,
            failures: Vec::new(),
            patterns: Vec::new(),
            matchers: HashMap::new(),
            next_pattern_id: 1,
        }
    }

    /// Replace the engine state with persisted history. Pattern ids issued
    /// afterwards continue past the highest restored `pattern-N`.
    pub fn restore(&mut self, failures: Vec<FailureRecord>, patterns: Vec<FailurePattern>) {
        let highest = patterns
            .iter()
            .filter_map(|p| p.id.strip_prefix(PATTERN_ID_PREFIX)?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        self.next_pattern_id = self.next_pattern_id.max(highest.saturating_add(1));
        self.failures = failures;
        self.patterns.clear();
        self.matchers.clear();
        for pattern in patterns {
            self.add_pattern(pattern);
        }

        info!(
            failures = self.failures.len(),
            patterns = self.patterns.len(),
            next_pattern_id = self.next_pattern_id,
            "Restored failure history"
        );
    }

    pub fn config(&self) -> &ClusteringConfig {
        &self.config
    }

    pub fn add_failure(&mut self, failure: FailureRecord) {
        debug!(
            failure_id = %failure.id,
            issue_number = failure.issue_number,
            category = %failure.error_category,
            "Recorded failure"
        );
        self.failures.push(failure);
    }

    pub fn get_failures(&self) -> Vec<FailureRecord> {
        self.failures.clone()
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn analyze_and_cluster(&self, min_similarity: f64) -> Vec<FailureCluster> {
        cluster_failures(&self.failures, min_similarity, &self.config)
    }

    /// Promote clusters to patterns with fresh `pattern-N` ids and store them.
    pub fn extract_patterns(&mut self, clusters: &[FailureCluster]) -> Vec<FailurePattern> {
        let mut extracted = Vec::new();
        for cluster in clusters {
            let id = format!("{}{}", PATTERN_ID_PREFIX, self.next_pattern_id);
            let Some(pattern) = extract_pattern(cluster, &id, &self.config) else {
                continue;
            };
            self.next_pattern_id = self.next_pattern_id.saturating_add(1);

            info!(
                pattern_id = %pattern.id,
                name = %pattern.name,
                category = %pattern.category,
                occurrences = pattern.occurrence_count,
                "Extracted failure pattern"
            );
            self.add_pattern(pattern.clone());
            extracted.push(pattern);
        }
        extracted
    }

    pub fn get_patterns(&self) -> Vec<FailurePattern> {
        self.patterns.clone()
    }

    pub fn get_pattern(&self, pattern_id: &str) -> Option<FailurePattern> {
        self.patterns.iter().find(|p| p.id == pattern_id).cloned()
    }

    /// Insert or replace by id. Measure and fix effectiveness are clamped.
    pub fn add_pattern(&mut self, mut pattern: FailurePattern) {
        for measure in &mut pattern.preventive_measures {
            measure.effectiveness = clamp_unit(measure.effectiveness);
        }
        for fix in &mut pattern.successful_fixes {
            fix.effectiveness = clamp_unit(fix.effectiveness);
        }
        self.matchers.insert(
            pattern.id.clone(),
            compile_signatures(&pattern.error_signatures),
        );
        match self.patterns.iter_mut().find(|p| p.id == pattern.id) {
            Some(existing) => *existing = pattern,
            None => self.patterns.push(pattern),
        }
    }

    pub fn match_failure(&self, failure: &FailureRecord) -> Vec<PatternMatch> {
        let candidates = self.patterns.iter().map(|p| {
            let matchers = self.matchers.get(&p.id).map(Vec::as_slice).unwrap_or_default();
            (p, matchers)
        });
        let matches = rank_matches(failure, candidates, &self.config);
        debug!(
            failure_id = %failure.id,
            matches = matches.len(),
            top = matches.first().map(|m| m.pattern.id.as_str()),
            "Matched failure against patterns"
        );
        matches
    }

    /// Count a new occurrence of a known pattern. Returns false for unknown ids.
    pub fn update_pattern_statistics(&mut self, pattern_id: &str, failure: &FailureRecord) -> bool {
        let Some(pattern) = self.patterns.iter_mut().find(|p| p.id == pattern_id) else {
            debug!(pattern_id, "Statistics update for unknown pattern");
            return false;
        };

        pattern.occurrence_count = pattern.occurrence_count.saturating_add(1);
        pattern.last_occurrence = pattern.last_occurrence.max(failure.timestamp);
        pattern.add_affected_issue(failure.issue_number);
        pattern.updated_at = Utc::now();
        true
    }

    /// Attach a fix to its pattern. Successful fixes are kept on the pattern
    /// and mark the originating failure as fixed.
    pub fn record_fix(&mut self, mut fix: FixRecord) -> bool {
        fix.effectiveness = clamp_unit(fix.effectiveness);
        let Some(pattern) = self.patterns.iter_mut().find(|p| p.id == fix.pattern_id) else {
            warn!(pattern_id = %fix.pattern_id, "Fix recorded for unknown pattern");
            return false;
        };

        if !fix.success {
            debug!(
                pattern_id = %fix.pattern_id,
                failure_id = %fix.failure_id,
                "Unsuccessful fix ignored"
            );
            return true;
        }

        pattern.updated_at = Utc::now();
        if let Some(failure) = self.failures.iter_mut().find(|f| f.id == fix.failure_id) {
            failure.resolution = Some(Resolution::Fixed);
            failure.fix_description = Some(fix.description.clone());
        }

        info!(
            pattern_id = %fix.pattern_id,
            failure_id = %fix.failure_id,
            effectiveness = fix.effectiveness,
            "Recorded successful fix"
        );
        pattern.successful_fixes.push(fix);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::ErrorCategory;

    fn failure(id: &str, issue: u32, text: &str) -> FailureRecord {
        FailureRecord::new(id, issue, 1, text, ErrorCategory::Dependency)
    }

    fn engine_with_modules() -> FailureClusteringEngine {
        let mut engine = FailureClusteringEngine::new(ClusteringConfig::default());
        engine.add_failure(failure("f-1", 1, "Cannot find module 'lodash'"));
        engine.add_failure(failure("f-2", 2, "Cannot find module 'chalk'"));
        engine.add_failure(failure("f-3", 2, "Cannot find module 'zod'"));
        engine
    }

    #[test]
    fn test_get_failures_is_a_copy() {
        let engine = engine_with_modules();
        let mut copy = engine.get_failures();
        copy.clear();
        assert_eq!(engine.get_failures().len(), 3);
    }

    #[test]
    fn test_clear_failures() {
        let mut engine = engine_with_modules();
        engine.clear_failures();
        assert!(engine.get_failures().is_empty());
        assert!(engine.analyze_and_cluster(0.6).is_empty());
    }

    #[test]
    fn test_pattern_ids_increase() {
        let mut engine = engine_with_modules();
        let clusters = engine.analyze_and_cluster(0.6);
        assert_eq!(clusters.len(), 1);

        let first = engine.extract_patterns(&clusters);
        let second = engine.extract_patterns(&clusters);
        assert_eq!(first[0].id, "pattern-1");
        assert_eq!(second[0].id, "pattern-2");
        assert_eq!(engine.get_patterns().len(), 2);
        assert!(engine.get_pattern("pattern-1").is_some());
        assert!(engine.get_pattern("pattern-9").is_none());
    }

    #[test]
    fn test_add_pattern_upserts() {
        let mut engine = engine_with_modules();
        let clusters = engine.analyze_and_cluster(0.6);
        let mut pattern = engine.extract_patterns(&clusters).remove(0);

        pattern.name = "Renamed".into();
        engine.add_pattern(pattern);
        assert_eq!(engine.get_patterns().len(), 1);
        assert_eq!(engine.get_pattern("pattern-1").unwrap().name, "Renamed");
    }

    #[test]
    fn test_add_pattern_clamps_effectiveness() {
        let mut engine = engine_with_modules();
        let clusters = engine.analyze_and_cluster(0.6);
        let mut pattern = engine.extract_patterns(&clusters).remove(0);

        pattern.preventive_measures[0].effectiveness = 3.0;
        pattern.preventive_measures[1].effectiveness = -1.0;
        engine.add_pattern(pattern);

        let stored = engine.get_pattern("pattern-1").unwrap();
        assert_eq!(stored.preventive_measures[0].effectiveness, 1.0);
        assert_eq!(stored.preventive_measures[1].effectiveness, 0.0);

        let mut fix = FixRecord::new("f-1", "pattern-1", "npm ci", 0.5, true);
        fix.effectiveness = 2.5;
        assert!(engine.record_fix(fix));
        let stored = engine.get_pattern("pattern-1").unwrap();
        assert_eq!(stored.successful_fixes[0].effectiveness, 1.0);
    }

    #[test]
    fn test_restore_with_max_pattern_id() {
        let mut source = engine_with_modules();
        let clusters = source.analyze_and_cluster(0.6);
        let mut pattern = source.extract_patterns(&clusters).remove(0);
        pattern.id = format!("pattern-{}", u64::MAX);

        let mut restored = FailureClusteringEngine::default();
        restored.restore(source.get_failures(), vec![pattern]);
        assert_eq!(restored.get_patterns().len(), 1);

        let clusters = restored.analyze_and_cluster(0.6);
        let next = restored.extract_patterns(&clusters);
        assert_eq!(next[0].id, format!("pattern-{}", u64::MAX));
    }

    #[test]
    fn test_update_statistics() {
        let mut engine = engine_with_modules();
        let clusters = engine.analyze_and_cluster(0.6);
        engine.extract_patterns(&clusters);

        let newer = failure("f-4", 5, "Cannot find module 'react'");
        assert!(engine.update_pattern_statistics("pattern-1", &newer));
        assert!(!engine.update_pattern_statistics("pattern-9", &newer));

        let pattern = engine.get_pattern("pattern-1").unwrap();
        assert_eq!(pattern.occurrence_count, 4);
        assert_eq!(pattern.affected_issues, vec![1, 2, 5]);
        assert_eq!(pattern.last_occurrence, newer.timestamp);

        assert!(engine.update_pattern_statistics("pattern-1", &newer));
        assert_eq!(engine.get_pattern("pattern-1").unwrap().affected_issues.len(), 3);
    }

    #[test]
    fn test_record_fix() {
        let mut engine = engine_with_modules();
        let clusters = engine.analyze_and_cluster(0.6);
        engine.extract_patterns(&clusters);

        assert!(engine.record_fix(FixRecord::new("f-1", "pattern-1", "npm install", 0.9, true)));
        assert!(engine.record_fix(FixRecord::new("f-2", "pattern-1", "retry", 0.1, false)));
        assert!(!engine.record_fix(FixRecord::new("f-1", "pattern-7", "noop", 0.5, true)));

        let pattern = engine.get_pattern("pattern-1").unwrap();
        assert_eq!(pattern.successful_fixes.len(), 1);

        let fixed = engine.get_failures().into_iter().find(|f| f.id == "f-1").unwrap();
        assert_eq!(fixed.resolution, Some(Resolution::Fixed));
        assert_eq!(fixed.fix_description.as_deref(), Some("npm install"));
    }

    #[test]
    fn test_restore_continues_ids() {
        let mut source = engine_with_modules();
        let clusters = source.analyze_and_cluster(0.6);
        source.extract_patterns(&clusters);
        source.extract_patterns(&clusters);

        let mut restored = FailureClusteringEngine::new(ClusteringConfig::default());
        restored.restore(source.get_failures(), source.get_patterns());
        let clusters = restored.analyze_and_cluster(0.6);
        let next = restored.extract_patterns(&clusters);
        assert_eq!(next[0].id, "pattern-3");
    }

    #[test]
    fn test_match_failure() {
        let mut engine = engine_with_modules();
        let clusters = engine.analyze_and_cluster(0.6);
        engine.extract_patterns(&clusters);

        let matches = engine.match_failure(&failure("f-9", 9, "Cannot find module 'ws'"));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].pattern.id, "pattern-1");
    }

    #[test]
    fn test_match_failure_follows_replaced_signatures() {
        let mut engine = engine_with_modules();
        let clusters = engine.analyze_and_cluster(0.6);
        let mut pattern = engine.extract_patterns(&clusters).remove(0);
        let incoming = failure("f-9", 9, "Cannot find module 'ws'");
        assert_eq!(engine.match_failure(&incoming).len(), 1);

        pattern.error_signatures = vec![r"\bsegfault\b".into(), "([unclosed".into()];
        pattern.file_patterns.clear();
        pattern.context_indicators.clear();
        engine.add_pattern(pattern.clone());
        assert!(engine.match_failure(&incoming).is_empty());

        let crash = failure("f-10", 10, "SEGFAULT in worker");
        let matches = engine.match_failure(&crash);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].matched_indicators, vec![r"\bsegfault\b".to_string()]);

        let mut restored = FailureClusteringEngine::default();
        restored.restore(Vec::new(), vec![pattern]);
        assert_eq!(restored.match_failure(&crash).len(), 1);
        assert!(restored.match_failure(&incoming).is_empty());
    }
}
