pub mod classification;
pub mod config;
pub mod error;
pub mod learning;
pub mod recovery;
pub mod strategy;
pub mod utils;

pub use classification::{ErrorCategory, ErrorClassification, ErrorClassifier, ErrorPattern};
pub use config::TriageConfig;
pub use error::{Result, TriageError};
pub use learning::{
    FailureCluster, FailureClusteringEngine, FailurePattern, FailureRecord, FailureStore,
    FixRecord, PatternMatch,
};
pub use recovery::{
    ExecutionOutcome, FailureAnalysis, FailureAnalyzer, FailureContext, PhaseStatus,
    StrategyExecution, StrategyExecutor,
};
pub use strategy::{ActionKind, RetryStrategy, StrategyCatalog};
