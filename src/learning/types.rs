use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::ErrorCategory;
use crate::recovery::FailureAnalysis;
use crate::utils::clamp_unit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Fixed,
    Skipped,
    Pending,
}

/// One historical failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub id: String,
    pub issue_number: u32,
    pub phase_number: u32,
    pub error_text: String,
    pub error_category: ErrorCategory,
    pub files: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub resolution: Option<Resolution>,
    pub fix_description: Option<String>,
}

impl FailureRecord {
    pub fn new(
        id: impl Into<String>,
        issue_number: u32,
        phase_number: u32,
        error_text: impl Into<String>,
        error_category: ErrorCategory,
    ) -> Self {
        Self {
            id: id.into(),
            issue_number,
            phase_number,
            error_text: error_text.into(),
            error_category,
            files: Vec::new(),
            timestamp: Utc::now(),
            resolution: None,
            fix_description: None,
        }
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    /// History record for an analyzed failure, pending resolution.
    pub fn from_analysis(id: impl Into<String>, analysis: &FailureAnalysis) -> Self {
        let category = analysis
            .primary_classification
            .as_ref()
            .map(|c| c.category)
            .unwrap_or(ErrorCategory::Unknown);

        Self {
            id: id.into(),
            issue_number: analysis.issue_number,
            phase_number: analysis.phase_number,
            error_text: analysis.error_text.clone(),
            error_category: category,
            files: analysis.context.files.clone(),
            timestamp: analysis.timestamp,
            resolution: Some(Resolution::Pending),
            fix_description: None,
        }
    }
}

/// Ephemeral grouping of similar failures. Always has at least two members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCluster {
    pub failures: Vec<FailureRecord>,
    /// Average pairwise similarity of the members.
    pub similarity: f64,
    pub common_error_terms: Vec<String>,
    pub common_files: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    Code,
    Project,
    Workflow,
    /// Category names this build does not know, e.g. from newer snapshots.
    #[serde(other)]
    Other,
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Project => write!(f, "project"),
            Self::Workflow => write!(f, "workflow"),
            Self::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureType {
    Context,
    Verification,
    PhaseStructure,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreventiveMeasure {
    pub id: String,
    pub description: String,
    #[serde(rename = "type")]
    pub measure_type: MeasureType,
    pub automatic: bool,
    pub effectiveness: f64,
    pub application: String,
}

impl PreventiveMeasure {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        measure_type: MeasureType,
        automatic: bool,
        effectiveness: f64,
        application: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            measure_type,
            automatic,
            effectiveness: clamp_unit(effectiveness),
            application: application.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub failure_id: String,
    pub pattern_id: String,
    pub description: String,
    pub effectiveness: f64,
    pub applied_at: DateTime<Utc>,
    pub success: bool,
}

impl FixRecord {
    pub fn new(
        failure_id: impl Into<String>,
        pattern_id: impl Into<String>,
        description: impl Into<String>,
        effectiveness: f64,
        success: bool,
    ) -> Self {
        Self {
            failure_id: failure_id.into(),
            pattern_id: pattern_id.into(),
            description: description.into(),
            effectiveness: clamp_unit(effectiveness),
            applied_at: Utc::now(),
            success,
        }
    }
}

/// Persisted, named generalization of a failure cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailurePattern {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: PatternCategory,
    pub error_signatures: Vec<String>,
    pub file_patterns: Vec<String>,
    pub context_indicators: Vec<String>,
    pub occurrence_count: u32,
    pub last_occurrence: DateTime<Utc>,
    /// Issue numbers without duplicates, in first-seen order.
    pub affected_issues: Vec<u32>,
    pub successful_fixes: Vec<FixRecord>,
    pub preventive_measures: Vec<PreventiveMeasure>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FailurePattern {
    pub(crate) fn add_affected_issue(&mut self, issue_number: u32) {
        if !self.affected_issues.contains(&issue_number) {
            self.affected_issues.push(issue_number);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub pattern: FailurePattern,
    pub confidence: f64,
    pub matched_indicators: Vec<String>,
    pub suggested_measures: Vec<PreventiveMeasure>,
}
