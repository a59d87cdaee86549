use thiserror::Error;

/// Errors surfaced by the ambient layers (configuration and persistence).
///
/// Classification, analysis, execution tracking and clustering never fail:
/// "no match" is an empty result and unknown ids return `None`/`false`.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failure store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TriageError>;
