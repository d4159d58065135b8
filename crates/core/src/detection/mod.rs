//! Detection of missing and cutoff-unmet items.
//!
//! Every enabled server is queried concurrently. A server either reports
//! both lists or is recorded as failed; nothing partial is kept.

mod detector;
mod types;

pub use detector::{ArrDetector, Detector};
pub use types::{DetectionResult, DetectionResults};
