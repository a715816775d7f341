//! Analysis threshold rules.
//!
//! This crate provides:
//! - The `AnalysisThresholds` YAML rule kind carrying every numeric policy
//!   the analysis engine applies
//! - Built-in defaults matching the engine's reference policies
//! - File loading and validation

pub mod error;
pub mod metadata;
pub mod thresholds;

pub use error::{Result, RuleError};
pub use metadata::CommonMetadata;
pub use thresholds::{AnalysisThresholdsRule, CompiledThresholds, THRESHOLDS_KIND};
