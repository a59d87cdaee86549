use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::ErrorClassification;
use crate::strategy::RetryStrategy;

/// Context supplied by the host alongside the failure text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureContext {
    pub files: Vec<String>,
    pub last_command: Option<String>,
    pub terminal_output: Option<String>,
}

impl FailureContext {
    pub fn new(files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_last_command(mut self, command: impl Into<String>) -> Self {
        self.last_command = Some(command.into());
        self
    }

    pub fn with_terminal_output(mut self, output: impl Into<String>) -> Self {
        self.terminal_output = Some(output.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub issue_number: u32,
    pub phase_number: u32,
    pub timestamp: DateTime<Utc>,
    pub error_text: String,
    pub classifications: Vec<ErrorClassification>,
    pub primary_classification: Option<ErrorClassification>,
    pub suggested_strategies: Vec<RetryStrategy>,
    pub context: FailureContext,
}

impl FailureAnalysis {
    pub fn top_strategy(&self) -> Option<&RetryStrategy> {
        self.suggested_strategies.first()
    }

    pub fn strategy(&self, id: &str) -> Option<&RetryStrategy> {
        self.suggested_strategies.iter().find(|s| s.id == id)
    }
}

/// One command of a generated remediation sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedCommand {
    pub command: String,
    /// 1-based position in the sequence.
    pub sequence: u32,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Pending,
    Success,
    Failure,
    Cancelled,
}

impl ExecutionOutcome {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Phase status reported back by the host once commands have run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

/// Tracked lifecycle of the commands generated for one chosen strategy.
///
/// `completed_at` is set exactly when `outcome` is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyExecution {
    pub id: String,
    pub strategy_id: String,
    pub issue_number: u32,
    pub phase_number: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: ExecutionOutcome,
    pub result_phase_status: Option<PhaseStatus>,
    pub notes: Option<String>,
    pub commands: Vec<GeneratedCommand>,
}

impl StrategyExecution {
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_terminal()
    }

    /// Move to `outcome`, keeping `completed_at` consistent with it.
    pub(crate) fn set_outcome(&mut self, outcome: ExecutionOutcome) {
        self.outcome = outcome;
        self.completed_at = outcome.is_terminal().then(Utc::now);
    }
}
