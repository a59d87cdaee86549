//! Shared utility functions.
//!
//! - String truncation (UTF-8 safe) and title casing
//! - Score clamping for confidence/effectiveness values

mod score;
mod string;

pub use score::clamp_unit;
pub use string::{title_case, truncate_with_marker};
