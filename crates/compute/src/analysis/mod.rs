//! Snapshot analysis orchestrator.
//!
//! Runs the detector set over a frozen [`SnapshotSummary`], merges the
//! findings, then derives the health score and recommendations:
//!
//! - **Detectors**: large keys, memory hotspots, key explosion, huge
//!   collections, key patterns, type efficiency, cluster balance.
//! - **Synthesis**: health score from the merged anomalies and totals,
//!   recommendations from totals and per-type efficiency.
//!
//! Every detector reads only the summary and returns its own [`Findings`].
//! Anomalies keep detector execution order.

pub mod cluster;
pub mod collections;
pub mod efficiency;
pub mod hotspots;
pub mod key_explosion;
pub mod large_keys;
pub mod patterns;
pub mod stats;

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use rdbops_core::SnapshotSummary;
use rdbops_rules::CompiledThresholds;

use crate::health;
use crate::recommend;
use crate::types::{
    Anomaly, AnomalyCategory, AnomalyLevel, BasicStats, ClusterBalance, KeyPattern,
    MemoryHotspot, Report, TypeEfficiency,
};

use self::cluster::ClusterBalanceAnalyzer;
use self::collections::HugeCollectionDetector;
use self::efficiency::TypeEfficiencyAnalyzer;
use self::hotspots::HotspotDetector;
use self::key_explosion::KeyExplosionDetector;
use self::large_keys::LargeKeyDetector;
use self::patterns::KeyPatternAnalyzer;

/// Read-only inputs shared by every detector in one run.
pub struct AnalysisContext<'a> {
    pub summary: &'a dyn SnapshotSummary,
    pub thresholds: &'a CompiledThresholds,
    pub stats: BasicStats,
    /// Timestamp stamped on every anomaly of the run.
    pub detected_at: DateTime<Utc>,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        summary: &'a dyn SnapshotSummary,
        thresholds: &'a CompiledThresholds,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            summary,
            thresholds,
            stats: BasicStats::new(summary.total_keys(), summary.total_bytes()),
            detected_at,
        }
    }

    /// Start an anomaly stamped with this run's timestamp.
    pub fn anomaly(
        &self,
        level: AnomalyLevel,
        category: AnomalyCategory,
        title: &str,
    ) -> Anomaly {
        Anomaly::new(level, category, title, self.detected_at)
    }
}

/// Output of a single detector pass. Facets a detector does not touch stay empty.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Findings {
    pub anomalies: Vec<Anomaly>,
    pub hotspots: Vec<MemoryHotspot>,
    pub patterns: Vec<KeyPattern>,
    pub efficiency: BTreeMap<String, TypeEfficiency>,
    pub cluster: Option<ClusterBalance>,
}

impl Findings {
    pub fn from_anomalies(anomalies: Vec<Anomaly>) -> Self {
        Self {
            anomalies,
            ..Self::default()
        }
    }

    /// Append another pass's output, keeping order.
    pub fn merge(&mut self, other: Findings) {
        self.anomalies.extend(other.anomalies);
        self.hotspots.extend(other.hotspots);
        self.patterns.extend(other.patterns);
        self.efficiency.extend(other.efficiency);
        if other.cluster.is_some() {
            self.cluster = other.cluster;
        }
    }
}

/// One independent analysis pass over a snapshot summary.
///
/// Implementations must be pure functions of the context: no shared state,
/// no dependency on other detectors' results.
pub trait Detector: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &'static str;

    /// Run the pass.
    fn detect(&self, ctx: &AnalysisContext<'_>) -> Findings;
}

/// The seven passes in reference execution order.
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(LargeKeyDetector),
        Box::new(HotspotDetector),
        Box::new(KeyExplosionDetector),
        Box::new(HugeCollectionDetector),
        Box::new(KeyPatternAnalyzer),
        Box::new(TypeEfficiencyAnalyzer),
        Box::new(ClusterBalanceAnalyzer),
    ]
}

/// Turns a snapshot summary into a [`Report`].
pub struct SnapshotAnalyzer {
    thresholds: CompiledThresholds,
    detectors: Vec<Box<dyn Detector>>,
}

impl Default for SnapshotAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotAnalyzer {
    /// Analyzer with the built-in thresholds.
    pub fn new() -> Self {
        Self::with_thresholds(CompiledThresholds::default())
    }

    pub fn with_thresholds(thresholds: CompiledThresholds) -> Self {
        Self {
            thresholds,
            detectors: default_detectors(),
        }
    }

    pub fn thresholds(&self) -> &CompiledThresholds {
        &self.thresholds
    }

    /// Analyze a summary, stamping findings with the current time.
    pub fn analyze(&self, summary: &dyn SnapshotSummary) -> Report {
        self.analyze_at(summary, Utc::now())
    }

    /// Analyze a summary with a fixed timestamp. Two calls with the same
    /// summary and timestamp return equal reports.
    pub fn analyze_at(&self, summary: &dyn SnapshotSummary, now: DateTime<Utc>) -> Report {
        let start = Instant::now();
        let ctx = AnalysisContext::new(summary, &self.thresholds, now);

        let mut findings = Findings::default();
        for detector in &self.detectors {
            let pass_start = Instant::now();
            let pass = detector.detect(&ctx);
            debug!(
                detector = detector.name(),
                anomalies = pass.anomalies.len(),
                elapsed_us = pass_start.elapsed().as_micros(),
                "detector pass completed"
            );
            findings.merge(pass);
        }

        // Stable: equal sizes keep prefix-before-type order.
        findings
            .hotspots
            .sort_by(|a, b| b.memory_used.cmp(&a.memory_used));

        let health_score = health::score(&findings.anomalies, &ctx.stats, &self.thresholds.health);
        let recommendations = recommend::generate(&ctx, &findings.efficiency);
        let cluster = findings.cluster.unwrap_or_default();

        info!(
            total_keys = ctx.stats.total_keys,
            total_bytes = ctx.stats.total_bytes,
            anomalies = findings.anomalies.len(),
            recommendations = recommendations.len(),
            health_score,
            elapsed_us = start.elapsed().as_micros(),
            "snapshot analysis completed"
        );

        Report {
            health_score,
            anomalies: findings.anomalies,
            memory_hotspots: findings.hotspots,
            key_patterns: findings.patterns,
            type_efficiency: findings.efficiency,
            slot_imbalance_percentage: cluster.imbalance_percentage,
            top_slots: cluster.top_slots,
            recommendations,
            basic_stats: ctx.stats,
            generated_at: now,
        }
    }
}

/// Analyze a summary with the built-in thresholds.
pub fn analyze(summary: &dyn SnapshotSummary) -> Report {
    SnapshotAnalyzer::new().analyze(summary)
}
