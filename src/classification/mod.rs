//! Rule-based error classification.
//!
//! - `PatternCatalog`: built-in error signatures plus custom overlay
//! - `ErrorClassifier`: ranks catalog matches for a failure text
//! - file/line context extraction used for confidence bonuses

mod catalog;
mod classifier;
mod context;
mod types;

pub use catalog::{CompiledPattern, ErrorPattern, PatternCatalog};
pub(crate) use catalog::compile_signature;
pub use classifier::ErrorClassifier;
pub use context::{extract_context, extract_file, extract_line};
pub use types::{ErrorCategory, ErrorClassification, ErrorContext};
