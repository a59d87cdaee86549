use serde::{Deserialize, Serialize};

/// Failure category assigned by the classifier.
///
/// `Unknown` doubles as the generic applicability marker of the strategy
/// catalog and absorbs unrecognised category names on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Syntax,
    Test,
    Dependency,
    Resource,
    Permission,
    Timeout,
    Network,
    #[serde(other)]
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::Test => "test",
            Self::Dependency => "dependency",
            Self::Resource => "resource",
            Self::Permission => "permission",
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location context pulled out of the failure text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl ErrorContext {
    pub fn has_location(&self) -> bool {
        self.file.is_some() || self.line.is_some()
    }
}

/// Result of matching failure text against one catalog pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub pattern_id: String,
    pub category: ErrorCategory,
    pub confidence: f64,
    pub matched_text: String,
    pub context: ErrorContext,
}
