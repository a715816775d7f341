//! Snapshot operations analysis engine.
//!
//! Given a [`SnapshotSummary`](rdbops_core::SnapshotSummary), produces a
//! [`Report`]: anomalies, memory hotspots, key patterns, per-type
//! efficiency, cluster slot balance, a health score and recommendations.

pub mod analysis;
pub mod health;
pub mod recommend;
pub mod types;
pub mod views;

pub use analysis::{analyze, AnalysisContext, Detector, Findings, SnapshotAnalyzer};
pub use health::HealthStatus;
pub use types::*;
pub use views::{AnomalyDigest, HealthSummary, RecommendationList};
