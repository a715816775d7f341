//! Health scoring: one bounded score from the anomaly list and keyspace totals.

use std::fmt;

use serde::{Deserialize, Serialize};

use rdbops_rules::thresholds::HealthThresholds;

use crate::types::{Anomaly, AnomalyLevel, BasicStats};

/// Reduce anomalies and totals to a score in `[0, 100]`.
///
/// Starts at 100 and applies every deduction additively: one per anomaly by
/// level, one tier for total key count, one tier for average key size.
pub fn score(anomalies: &[Anomaly], stats: &BasicStats, t: &HealthThresholds) -> u8 {
    let mut score: i64 = 100;

    for anomaly in anomalies {
        score -= match anomaly.level {
            AnomalyLevel::Critical => t.critical_penalty,
            AnomalyLevel::Warning => t.warning_penalty,
            AnomalyLevel::Info => t.info_penalty,
        };
    }

    if stats.total_keys > t.key_count_high {
        score -= t.key_count_high_penalty;
    } else if stats.total_keys > t.key_count_elevated {
        score -= t.key_count_elevated_penalty;
    }

    if stats.avg_key_size > t.avg_size_high_bytes as f64 {
        score -= t.avg_size_high_penalty;
    } else if stats.avg_key_size > t.avg_size_elevated_bytes as f64 {
        score -= t.avg_size_elevated_penalty;
    }

    score.clamp(0, 100) as u8
}

/// Coarse label for a health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthStatus {
    /// ≥90 excellent, ≥75 good, ≥60 fair, ≥40 poor, otherwise critical.
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => HealthStatus::Excellent,
            75..=89 => HealthStatus::Good,
            60..=74 => HealthStatus::Fair,
            40..=59 => HealthStatus::Poor,
            _ => HealthStatus::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Fair => "fair",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
