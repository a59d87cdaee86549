//! Weighted similarity between failure records.
//!
//! `sim(a, b) = (wt·J(terms) + wf·J(files) + wc·[category equal]) / (wt + wf + wc)`
//!
//! With the default weights (0.5 / 0.3 / 0.2) the divisor is 1. Dividing keeps
//! `sim(x, x) == 1` exactly even when configured weights drift from 1.

use std::collections::HashSet;
use std::hash::Hash;

use super::types::FailureRecord;
use crate::classification::ErrorCategory;
use crate::config::ClusteringConfig;
use crate::utils::clamp_unit;

const MIN_TOKEN_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "from", "are", "was", "were", "has", "have",
    "had", "but", "not", "you", "your", "its", "into", "onto", "when", "then", "than", "there",
    "their", "been", "will", "would", "could", "should", "can", "may", "might", "all", "any",
    "some", "which", "while", "where", "what", "who", "how", "also", "only", "just", "over",
    "out", "our", "use", "used", "does", "did", "done", "here", "such", "via", "per",
];

/// Lower-cased error words with stop words and short tokens removed.
/// Order of first appearance is kept, duplicates dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .filter(|word| !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

/// Jaccard index. Two empty sets are identical (1.0).
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Precomputed similarity inputs for one record.
#[derive(Debug, Clone)]
pub(crate) struct Fingerprint {
    terms: HashSet<String>,
    files: HashSet<String>,
    category: ErrorCategory,
}

impl Fingerprint {
    pub(crate) fn of(record: &FailureRecord) -> Self {
        Self {
            terms: tokenize(&record.error_text).into_iter().collect(),
            files: record.files.iter().cloned().collect(),
            category: record.error_category,
        }
    }

    pub(crate) fn similarity(&self, other: &Self, config: &ClusteringConfig) -> f64 {
        let total = config.text_weight + config.file_weight + config.category_weight;
        if total <= 0.0 {
            return 0.0;
        }

        let category_match = if self.category == other.category { 1.0 } else { 0.0 };
        let score = config.text_weight * jaccard(&self.terms, &other.terms)
            + config.file_weight * jaccard(&self.files, &other.files)
            + config.category_weight * category_match;

        clamp_unit(score / total)
    }
}

pub fn similarity(a: &FailureRecord, b: &FailureRecord, config: &ClusteringConfig) -> f64 {
    Fingerprint::of(a).similarity(&Fingerprint::of(b), config)
}
