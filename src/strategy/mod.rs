//! Remediation strategy catalog.
//!
//! Built-in strategy ids, confidences and action kinds are a fixed contract;
//! custom strategies are upserted into an overlay by id.

mod catalog;

pub(crate) use catalog::sort_by_confidence;
pub use catalog::{ActionKind, RetryStrategy, StrategyCatalog, ids};
