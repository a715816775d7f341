//! Serializable projections of a [`Report`] for consumers that need only
//! one facet.

use serde::{Deserialize, Serialize};

use crate::health::HealthStatus;
use crate::types::{Anomaly, AnomalyLevel, Recommendation, Report};

/// Anomalies split by level, each list in report order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyDigest {
    pub critical: Vec<Anomaly>,
    pub warning: Vec<Anomaly>,
    pub info: Vec<Anomaly>,
    pub total: usize,
    pub health_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub recommendations: Vec<Recommendation>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub health_score: u8,
    pub health_status: HealthStatus,
    pub critical_issues: usize,
    pub warnings: usize,
    pub total_anomalies: usize,
    pub recommendations: usize,
}

impl Report {
    pub fn health_status(&self) -> HealthStatus {
        HealthStatus::from_score(self.health_score)
    }

    pub fn anomaly_digest(&self) -> AnomalyDigest {
        let by_level = |level: AnomalyLevel| -> Vec<Anomaly> {
            self.anomalies
                .iter()
                .filter(|a| a.level == level)
                .cloned()
                .collect()
        };
        AnomalyDigest {
            critical: by_level(AnomalyLevel::Critical),
            warning: by_level(AnomalyLevel::Warning),
            info: by_level(AnomalyLevel::Info),
            total: self.anomalies.len(),
            health_score: self.health_score,
        }
    }

    pub fn recommendation_list(&self) -> RecommendationList {
        RecommendationList {
            recommendations: self.recommendations.clone(),
            total: self.recommendations.len(),
        }
    }

    pub fn health_summary(&self) -> HealthSummary {
        HealthSummary {
            health_score: self.health_score,
            health_status: self.health_status(),
            critical_issues: self.count_level(AnomalyLevel::Critical),
            warnings: self.count_level(AnomalyLevel::Warning),
            total_anomalies: self.anomalies.len(),
            recommendations: self.recommendations.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapshotAnalyzer;
    use chrono::Utc;
    use rdbops_core::format::MIB;
    use rdbops_core::{Entry, SummaryDocument};

    fn report() -> Report {
        let summary = SummaryDocument::new()
            .with_type("string", 3, 90 * MIB)
            .with_type("hash", 1, 10 * MIB)
            .with_entry(Entry::new("blob:1", "string", 60 * MIB, 1))
            .with_entry(Entry::new("blob:2", "string", 20 * MIB, 1))
            .with_entry(Entry::new("blob:3", "string", 10 * MIB, 1));
        SnapshotAnalyzer::new().analyze_at(&summary, Utc::now())
    }

    #[test]
    fn digest_partitions_by_level() {
        let report = report();
        let digest = report.anomaly_digest();

        assert_eq!(digest.total, report.anomalies.len());
        assert_eq!(
            digest.critical.len() + digest.warning.len() + digest.info.len(),
            digest.total
        );
        assert_eq!(digest.critical.len(), 1);
        assert!(digest.warning.iter().all(|a| a.level == AnomalyLevel::Warning));
        assert_eq!(digest.health_score, report.health_score);
    }

    #[test]
    fn health_summary_counts() {
        let report = report();
        let summary = report.health_summary();

        assert_eq!(summary.critical_issues, 1);
        assert_eq!(summary.warnings, report.count_level(AnomalyLevel::Warning));
        assert_eq!(summary.recommendations, report.recommendations.len());
        assert_eq!(summary.health_status, HealthStatus::from_score(report.health_score));
    }

    #[test]
    fn health_summary_serializes_lowercase_status() {
        let json = serde_json::to_value(report().health_summary()).unwrap();
        let status = json["health_status"].as_str().unwrap();
        assert!(["excellent", "good", "fair", "poor", "critical"].contains(&status));
    }

    #[test]
    fn recommendation_list_total() {
        let list = report().recommendation_list();
        assert_eq!(list.total, list.recommendations.len());
        assert!(list.total >= 1);
    }
}
