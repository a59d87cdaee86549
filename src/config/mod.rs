//! Configuration types and loading.
//!
//! `TriageConfig` is the top-level configuration, read from `triage.toml`:
//! - `ClassifierConfig`: context bonus and matched-text limits
//! - `AnalyzerConfig`: context hint shaping
//! - `ExecutorConfig`: generated command templates
//! - `ClusteringConfig`: similarity weights, clustering and matching thresholds
//! - `StoreConfig`: failure history retention

mod settings;

pub use settings::{
    AnalyzerConfig, ClassifierConfig, ClusteringConfig, ExecutorConfig, StoreConfig,
    TriageConfig,
};
