//! Cross-failure learning.
//!
//! Tracks historical failures and mines recurring patterns from them:
//! - Weighted similarity and greedy clustering of failure records
//! - Promotion of clusters to named patterns with preventive measures
//! - Matching new failures against known patterns
//! - JSONL/JSON persistence of history and patterns

mod clustering;
mod engine;
mod patterns;
mod similarity;
mod store;
mod types;

pub use clustering::{cluster_failures, common_files, common_terms};
pub use engine::FailureClusteringEngine;
pub use patterns::{default_measures, extract_pattern, match_patterns, pattern_category};
pub use similarity::{jaccard, similarity, tokenize};
pub use store::FailureStore;
pub use types::{
    FailureCluster, FailurePattern, FailureRecord, FixRecord, MeasureType, PatternCategory,
    PatternMatch, PreventiveMeasure, Resolution,
};
