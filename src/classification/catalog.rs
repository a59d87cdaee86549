//! Static table of error signatures.
//!
//! Built-in patterns are compiled once per process. Custom patterns live in a
//! per-catalog overlay and shadow built-ins with the same id.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::ErrorCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPattern {
    pub id: String,
    pub name: String,
    pub category: ErrorCategory,
    /// Regex sources, tried in order; the first match wins.
    pub signatures: Vec<String>,
    pub base_confidence: f64,
    pub suggested_strategies: Vec<String>,
}

impl ErrorPattern {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: ErrorCategory,
        base_confidence: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            signatures: Vec::new(),
            base_confidence: crate::utils::clamp_unit(base_confidence),
            suggested_strategies: Vec::new(),
        }
    }

    pub fn with_signatures<I, S>(mut self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signatures = signatures.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strategies<I, S>(mut self, strategies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggested_strategies = strategies.into_iter().map(Into::into).collect();
        self
    }
}

/// Compile a signature as a case-insensitive regex.
///
/// Invalid sources yield `None`; callers skip them instead of failing.
pub(crate) fn compile_signature(source: &str) -> Option<Regex> {
    match RegexBuilder::new(source).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            debug!(signature = source, error = %e, "Skipping invalid signature");
            None
        }
    }
}

/// An `ErrorPattern` with its signatures compiled.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub pattern: ErrorPattern,
    matchers: Vec<Regex>,
}

impl CompiledPattern {
    pub fn compile(pattern: ErrorPattern) -> Self {
        let matchers: Vec<Regex> = pattern
            .signatures
            .iter()
            .filter_map(|s| compile_signature(s))
            .collect();

        if matchers.len() < pattern.signatures.len() {
            warn!(
                pattern_id = %pattern.id,
                valid = matchers.len(),
                total = pattern.signatures.len(),
                "Pattern has invalid signatures"
            );
        }

        Self { pattern, matchers }
    }

    /// Text of the first signature (in declaration order) that matches.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.matchers
            .iter()
            .find_map(|re| re.find(text))
            .map(|m| m.as_str())
    }
}

static BUILTIN_PATTERNS: LazyLock<Vec<CompiledPattern>> = LazyLock::new(|| {
    builtin_patterns()
        .into_iter()
        .map(CompiledPattern::compile)
        .collect()
});

fn builtin_patterns() -> Vec<ErrorPattern> {
    vec![
        ErrorPattern::new("syntax-error", "Syntax Error", ErrorCategory::Syntax, 0.9)
            .with_signatures([
                r"SyntaxError",
                r"Unexpected token",
                r"Parse error",
                r"Unterminated string",
                r"expected .{1,40}, found",
            ])
            .with_strategies(["fix-and-redo", "redo-with-error-context"]),
        ErrorPattern::new("type-error", "Type Error", ErrorCategory::Syntax, 0.85)
            .with_signatures([
                r"error TS\d+",
                r"TypeError",
                r"is not assignable to type",
                r"mismatched types",
                r"Property '[^']+' does not exist",
            ])
            .with_strategies(["fix-and-redo", "redo-with-error-context"]),
        ErrorPattern::new(
            "module-not-found",
            "Missing Module",
            ErrorCategory::Dependency,
            0.9,
        )
        .with_signatures([
            r#"Cannot find module ['"][^'"]+['"]"#,
            r"Module not found",
            r"ModuleNotFoundError",
            r"No module named",
            r"unresolved import",
        ])
        .with_strategies(["install-dependencies", "redo-with-error-context"]),
        ErrorPattern::new(
            "dependency-conflict",
            "Dependency Conflict",
            ErrorCategory::Dependency,
            0.8,
        )
        .with_signatures([
            r"ERESOLVE",
            r"peer dep(endency)?",
            r"version conflict",
            r"could not resolve dependency",
        ])
        .with_strategies(["install-dependencies", "rollback-and-redo"]),
        ErrorPattern::new("test-failure", "Test Failure", ErrorCategory::Test, 0.8)
            .with_signatures([
                r"\d+ (tests? )?failed",
                r"AssertionError",
                r"assertion failed",
                r"expect\(.*\)\.to",
                r"FAIL\s+\S+",
            ])
            .with_strategies(["fix-and-redo", "redo-with-error-context"]),
        ErrorPattern::new(
            "permission-denied",
            "Permission Denied",
            ErrorCategory::Permission,
            0.85,
        )
        .with_signatures([
            r"EACCES",
            r"EPERM",
            r"Permission denied",
            r"Operation not permitted",
        ])
        .with_strategies(["redo-with-error-context", "skip-phase"]),
        ErrorPattern::new(
            "resource-exhausted",
            "Resource Exhausted",
            ErrorCategory::Resource,
            0.8,
        )
        .with_signatures([
            r"heap out of memory",
            r"out of memory",
            r"ENOMEM",
            r"ENOSPC",
            r"No space left on device",
        ])
        .with_strategies(["rollback-and-redo", "simple-redo"]),
        ErrorPattern::new("timeout", "Timeout", ErrorCategory::Timeout, 0.75)
            .with_signatures([
                r"ETIMEDOUT",
                r"timed out",
                r"timeout of \d+ ?ms exceeded",
                r"deadline exceeded",
            ])
            .with_strategies(["simple-redo", "skip-phase"]),
        ErrorPattern::new("network-error", "Network Error", ErrorCategory::Network, 0.8)
            .with_signatures([
                r"ECONNREFUSED",
                r"ECONNRESET",
                r"ENOTFOUND",
                r"socket hang up",
                r"getaddrinfo",
                r"network error",
            ])
            .with_strategies(["simple-redo", "skip-phase"]),
    ]
}

/// Built-in patterns plus an upsert-by-id overlay of custom patterns.
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    custom: Vec<CompiledPattern>,
}

impl PatternCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a custom pattern by id.
    pub fn add_custom(&mut self, pattern: ErrorPattern) {
        let compiled = CompiledPattern::compile(pattern);
        match self
            .custom
            .iter_mut()
            .find(|c| c.pattern.id == compiled.pattern.id)
        {
            Some(existing) => *existing = compiled,
            None => self.custom.push(compiled),
        }
    }

    fn custom(&self, id: &str) -> Option<&CompiledPattern> {
        self.custom.iter().find(|c| c.pattern.id == id)
    }

    fn is_builtin(id: &str) -> bool {
        BUILTIN_PATTERNS.iter().any(|b| b.pattern.id == id)
    }

    /// Patterns in evaluation order: built-ins (shadowed by custom entries
    /// with the same id), then new custom patterns in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &CompiledPattern> {
        let builtins = BUILTIN_PATTERNS
            .iter()
            .map(|b| self.custom(&b.pattern.id).unwrap_or(b));
        let added = self.custom.iter().filter(|c| !Self::is_builtin(&c.pattern.id));
        builtins.chain(added)
    }

    pub fn get(&self, id: &str) -> Option<&ErrorPattern> {
        self.iter().find(|c| c.pattern.id == id).map(|c| &c.pattern)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_signatures_all_compile() {
        for compiled in BUILTIN_PATTERNS.iter() {
            assert_eq!(
                compiled.matchers.len(),
                compiled.pattern.signatures.len(),
                "invalid signature in {}",
                compiled.pattern.id
            );
        }
    }

    #[test]
    fn test_builtin_ids_are_unique() {
        let catalog = PatternCatalog::new();
        let mut ids: Vec<_> = catalog.iter().map(|c| c.pattern.id.clone()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn test_first_matching_signature_wins() {
        let catalog = PatternCatalog::new();
        let pattern = catalog
            .iter()
            .find(|c| c.pattern.id == "module-not-found")
            .unwrap();

        let matched = pattern.find("Error: Cannot find module 'lodash'\nModule not found");
        assert_eq!(matched, Some("Cannot find module 'lodash'"));
    }

    #[test]
    fn test_signature_match_is_case_insensitive() {
        let compiled = CompiledPattern::compile(
            ErrorPattern::new("x", "X", ErrorCategory::Network, 0.5).with_signatures(["econnreset"]),
        );
        assert_eq!(compiled.find("read ECONNRESET"), Some("ECONNRESET"));
    }

    #[test]
    fn test_invalid_signature_is_skipped() {
        let compiled = CompiledPattern::compile(
            ErrorPattern::new("bad", "Bad", ErrorCategory::Test, 0.5)
                .with_signatures(["(unclosed", "flaky"]),
        );
        assert_eq!(compiled.matchers.len(), 1);
        assert_eq!(compiled.find("flaky test"), Some("flaky"));
    }

    #[test]
    fn test_custom_pattern_upsert() {
        let mut catalog = PatternCatalog::new();
        let builtin_count = catalog.len();

        catalog.add_custom(
            ErrorPattern::new("lockfile", "Lockfile Drift", ErrorCategory::Dependency, 0.7)
                .with_signatures(["lockfile"]),
        );
        assert_eq!(catalog.len(), builtin_count + 1);

        catalog.add_custom(
            ErrorPattern::new("lockfile", "Lockfile Drift", ErrorCategory::Dependency, 0.6)
                .with_signatures(["lockfile"]),
        );
        assert_eq!(catalog.len(), builtin_count + 1);
        assert_eq!(catalog.get("lockfile").unwrap().base_confidence, 0.6);
    }

    #[test]
    fn test_custom_pattern_shadows_builtin() {
        let mut catalog = PatternCatalog::new();
        let builtin_count = catalog.len();

        catalog.add_custom(
            ErrorPattern::new("timeout", "Slow CI", ErrorCategory::Timeout, 0.4)
                .with_signatures(["took too long"]),
        );

        assert_eq!(catalog.len(), builtin_count);
        assert_eq!(catalog.get("timeout").unwrap().name, "Slow CI");
    }
}
