//! Per-failure remediation.
//!
//! This module handles:
//! - Failure analysis: classification + ranked, context-enriched strategies
//! - Command generation per strategy action kind
//! - Execution lifecycle tracking (pending → success | failure | cancelled)

mod analyzer;
mod commands;
mod executor;
mod types;

pub use analyzer::FailureAnalyzer;
pub use commands::{CommandTarget, generate_commands, manual_notes};
pub use executor::StrategyExecutor;
pub use types::{
    ExecutionOutcome, FailureAnalysis, FailureContext, GeneratedCommand, PhaseStatus,
    StrategyExecution,
};
