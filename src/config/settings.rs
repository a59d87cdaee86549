use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{Result, TriageError};

const CONFIG_FILE: &str = "triage.toml";
const MAX_RETENTION_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub classifier: ClassifierConfig,
    pub analyzer: AnalyzerConfig,
    pub executor: ExecutorConfig,
    pub clustering: ClusteringConfig,
    pub store: StoreConfig,
}

impl TriageConfig {
    pub async fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, config_dir: &Path) -> Result<()> {
        self.validate()?;
        fs::create_dir_all(config_dir).await?;
        let config_path = config_dir.join(CONFIG_FILE);
        let content =
            toml::to_string_pretty(self).map_err(|e| TriageError::Config(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    /// Validate configuration values for consistency and safety.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        // Classifier validation
        if !(0.0..=1.0).contains(&self.classifier.context_bonus) {
            errors.push("classifier.context_bonus must be between 0.0 and 1.0");
        }
        if self.classifier.max_matched_text_len == 0 {
            errors.push("classifier.max_matched_text_len must be greater than 0");
        }

        // Analyzer validation
        if self.analyzer.max_hint_len == 0 {
            errors.push("analyzer.max_hint_len must be greater than 0");
        }

        // Executor validation
        if self.executor.command_prefix.trim().is_empty() {
            errors.push("executor.command_prefix must not be empty");
        }
        if self.executor.install_command.trim().is_empty() {
            errors.push("executor.install_command must not be empty");
        }

        // Clustering validation
        let cl = &self.clustering;
        for (value, message) in [
            (
                cl.min_similarity,
                "clustering.min_similarity must be between 0.0 and 1.0",
            ),
            (
                cl.text_weight,
                "clustering.text_weight must be between 0.0 and 1.0",
            ),
            (
                cl.file_weight,
                "clustering.file_weight must be between 0.0 and 1.0",
            ),
            (
                cl.category_weight,
                "clustering.category_weight must be between 0.0 and 1.0",
            ),
            (
                cl.min_match_confidence,
                "clustering.min_match_confidence must be between 0.0 and 1.0",
            ),
            (
                cl.min_measure_effectiveness,
                "clustering.min_measure_effectiveness must be between 0.0 and 1.0",
            ),
            (
                cl.signature_weight,
                "clustering.signature_weight must be between 0.0 and 1.0",
            ),
            (
                cl.file_pattern_weight,
                "clustering.file_pattern_weight must be between 0.0 and 1.0",
            ),
            (
                cl.indicator_weight,
                "clustering.indicator_weight must be between 0.0 and 1.0",
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(message);
            }
        }
        {
            let weight_sum = cl.text_weight + cl.file_weight + cl.category_weight;
            if (weight_sum - 1.0).abs() > 0.01 {
                errors.push(
                    "clustering similarity weights (text + file + category) must sum to 1.0",
                );
            }
        }
        if cl.max_common_terms == 0 {
            errors.push("clustering.max_common_terms must be greater than 0");
        }
        if cl.max_signatures == 0 {
            errors.push("clustering.max_signatures must be greater than 0");
        }

        // Store validation
        if self.store.retention_days <= 0 {
            errors.push("store.retention_days must be positive");
        }
        if self.store.retention_days > MAX_RETENTION_DAYS {
            errors.push("store.retention_days must be at most 36500");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TriageError::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Confidence added when a file or line could be extracted from the text.
    pub context_bonus: f64,
    /// Maximum length of the matched text kept on a classification (bytes).
    pub max_matched_text_len: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            context_bonus: 0.05,
            max_matched_text_len: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum length of a single context hint attached to a strategy (bytes).
    pub max_hint_len: usize,
    /// Maximum number of touched files listed in a context hint.
    pub max_context_files: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_hint_len: 160,
            max_context_files: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Prefix of every generated workflow command, e.g. `/tiki:execute`.
    pub command_prefix: String,
    /// Shell command used by the dependency-install remedy.
    pub install_command: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            command_prefix: "/tiki:".to_string(),
            install_command: "npm install".to_string(),
        }
    }
}

/// Similarity, clustering and pattern-matching parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Default minimum average similarity to join an existing cluster.
    pub min_similarity: f64,
    /// Weight of error-text term overlap in record similarity.
    pub text_weight: f64,
    /// Weight of touched-file overlap in record similarity.
    pub file_weight: f64,
    /// Weight of category equality in record similarity.
    pub category_weight: f64,
    /// Maximum common terms reported per cluster.
    pub max_common_terms: usize,
    /// Maximum signatures derived from common terms per pattern.
    pub max_signatures: usize,
    /// Pattern matches at or below this confidence are dropped.
    pub min_match_confidence: f64,
    /// Preventive measures below this effectiveness are not suggested.
    pub min_measure_effectiveness: f64,
    /// Confidence added per matching pattern signature.
    pub signature_weight: f64,
    /// Confidence added per matching file pattern.
    pub file_pattern_weight: f64,
    /// Confidence added per context indicator found in the error text.
    pub indicator_weight: f64,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.6,
            text_weight: 0.5,
            file_weight: 0.3,
            category_weight: 0.2,
            max_common_terms: 10,
            max_signatures: 5,
            min_match_confidence: 0.2,
            min_measure_effectiveness: 0.5,
            signature_weight: 0.3,
            file_pattern_weight: 0.2,
            indicator_weight: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Failure records older than this are dropped on load and compaction.
    pub retention_days: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { retention_days: 90 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TriageConfig::default().validate().is_ok());
    }

    #[test]
    fn test_similarity_weights_must_sum_to_one() {
        let mut config = TriageConfig::default();
        config.clustering.text_weight = 0.9;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("must sum to 1.0"));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = TriageConfig::default();
        config.clustering.min_similarity = 1.5;
        config.executor.command_prefix = "  ".into();
        config.store.retention_days = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("min_similarity"));
        assert!(err.contains("command_prefix"));
        assert!(err.contains("retention_days"));
    }

    #[tokio::test]
    async fn test_load_rejects_unbounded_retention() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[store]\nretention_days = 100000000\n",
        )
        .unwrap();

        let err = TriageConfig::load(dir.path()).await.unwrap_err().to_string();
        assert!(err.contains("retention_days must be at most"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TriageConfig = toml::from_str(
            r#"
            [clustering]
            min_similarity = 0.4
            "#,
        )
        .unwrap();

        assert!((config.clustering.min_similarity - 0.4).abs() < f64::EPSILON);
        assert_eq!(config.clustering.max_common_terms, 10);
        assert_eq!(config.executor.command_prefix, "/tiki:");
    }

    #[tokio::test]
    async fn test_load_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let config = TriageConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.store.retention_days, 90);
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut config = TriageConfig::default();
        config.executor.install_command = "cargo fetch".into();
        config.clustering.min_similarity = 0.3;

        config.save(dir.path()).await.unwrap();
        let loaded = TriageConfig::load(dir.path()).await.unwrap();

        assert_eq!(loaded.executor.install_command, "cargo fetch");
        assert!((loaded.clustering.min_similarity - 0.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(
            dir.path().join(CONFIG_FILE),
            "[classifier]\ncontext_bonus = 2.0\n",
        )
        .await
        .unwrap();

        let result = TriageConfig::load(dir.path()).await;
        assert!(matches!(result, Err(TriageError::Config(_))));
    }
}
