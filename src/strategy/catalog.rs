use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classification::ErrorCategory;
use crate::utils::clamp_unit;

/// Built-in strategy ids. Callers key on these; they must not change.
pub mod ids {
    pub const SIMPLE_REDO: &str = "simple-redo";
    pub const REDO_WITH_ERROR_CONTEXT: &str = "redo-with-error-context";
    pub const FIX_AND_REDO: &str = "fix-and-redo";
    pub const ROLLBACK_AND_REDO: &str = "rollback-and-redo";
    pub const SKIP_PHASE: &str = "skip-phase";
    pub const INSTALL_DEPENDENCIES: &str = "install-dependencies";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Redo,
    RedoWithContext,
    Skip,
    RollbackAndRedo,
    Manual,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Redo => write!(f, "redo"),
            Self::RedoWithContext => write!(f, "redo-with-context"),
            Self::Skip => write!(f, "skip"),
            Self::RollbackAndRedo => write!(f, "rollback-and-redo"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// A named remediation template with applicability metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryStrategy {
    pub id: String,
    pub name: String,
    pub description: String,
    pub confidence: f64,
    /// `ErrorCategory::Unknown` marks a generic strategy applicable to anything.
    pub applicable_categories: Vec<ErrorCategory>,
    pub action: ActionKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_hints: Vec<String>,
}

impl RetryStrategy {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        action: ActionKind,
        confidence: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            confidence: clamp_unit(confidence),
            applicable_categories: Vec::new(),
            action,
            context_hints: Vec::new(),
        }
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = ErrorCategory>) -> Self {
        self.applicable_categories = categories.into_iter().collect();
        self
    }

    pub fn is_generic(&self) -> bool {
        self.applicable_categories.contains(&ErrorCategory::Unknown)
    }

    pub fn applies_to(&self, category: ErrorCategory) -> bool {
        self.is_generic() || self.applicable_categories.contains(&category)
    }

    /// Copy of this strategy with extra hints appended (duplicates dropped).
    pub fn with_hints<I>(&self, hints: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut enhanced = self.clone();
        for hint in hints {
            if !enhanced.context_hints.contains(&hint) {
                enhanced.context_hints.push(hint);
            }
        }
        enhanced
    }
}

static BUILTIN_STRATEGIES: LazyLock<Vec<RetryStrategy>> = LazyLock::new(|| {
    use ErrorCategory::*;

    vec![
        RetryStrategy::new(
            ids::SIMPLE_REDO,
            "Simple Redo",
            "Re-run the failed phase unchanged; suited to transient failures",
            ActionKind::Redo,
            0.5,
        )
        .with_categories([Unknown, Timeout, Network]),
        RetryStrategy::new(
            ids::REDO_WITH_ERROR_CONTEXT,
            "Redo With Error Context",
            "Re-run the phase with the error output and location attached as context",
            ActionKind::RedoWithContext,
            0.7,
        )
        .with_categories([Unknown]),
        RetryStrategy::new(
            ids::FIX_AND_REDO,
            "Fix and Redo",
            "Fix the reported code or test problem first, then re-run the phase",
            ActionKind::RedoWithContext,
            0.8,
        )
        .with_categories([Syntax, Test]),
        RetryStrategy::new(
            ids::ROLLBACK_AND_REDO,
            "Rollback and Redo",
            "Revert the phase's changes and execute it again from a clean state",
            ActionKind::RollbackAndRedo,
            0.6,
        )
        .with_categories([Syntax, Test, Dependency, Resource]),
        RetryStrategy::new(
            ids::SKIP_PHASE,
            "Skip Phase",
            "Mark the phase as skipped and continue with the next one",
            ActionKind::Skip,
            0.3,
        )
        .with_categories([Unknown]),
        RetryStrategy::new(
            ids::INSTALL_DEPENDENCIES,
            "Install Dependencies",
            "Install missing project dependencies, then re-run the phase with context",
            ActionKind::RedoWithContext,
            0.85,
        )
        .with_categories([Dependency]),
    ]
});

/// Built-in strategies plus an upsert-by-id overlay of custom strategies.
#[derive(Debug, Clone, Default)]
pub struct StrategyCatalog {
    custom: Vec<RetryStrategy>,
}

impl StrategyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_custom_strategy(&mut self, mut strategy: RetryStrategy) {
        strategy.confidence = clamp_unit(strategy.confidence);
        debug!(strategy_id = %strategy.id, "Registering custom strategy");
        match self.custom.iter_mut().find(|s| s.id == strategy.id) {
            Some(existing) => *existing = strategy,
            None => self.custom.push(strategy),
        }
    }

    /// Built-ins (shadowed by custom entries with the same id), then new
    /// custom strategies in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &RetryStrategy> {
        let builtins = BUILTIN_STRATEGIES
            .iter()
            .map(|b| self.custom.iter().find(|c| c.id == b.id).unwrap_or(b));
        let added = self
            .custom
            .iter()
            .filter(|c| !BUILTIN_STRATEGIES.iter().any(|b| b.id == c.id));
        builtins.chain(added)
    }

    pub fn get(&self, id: &str) -> Option<&RetryStrategy> {
        self.iter().find(|s| s.id == id)
    }

    /// Strategies applicable to `category`, sorted by descending confidence.
    pub fn applicable_to(&self, category: ErrorCategory) -> Vec<RetryStrategy> {
        let mut strategies: Vec<RetryStrategy> = self
            .iter()
            .filter(|s| s.applies_to(category))
            .cloned()
            .collect();
        sort_by_confidence(&mut strategies);
        strategies
    }
}

pub(crate) fn sort_by_confidence(strategies: &mut [RetryStrategy]) {
    strategies.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
