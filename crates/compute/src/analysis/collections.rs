use rdbops_core::format::{format_number, truncate_key};

use super::{AnalysisContext, Detector, Findings};
use crate::types::{AnomalyCategory, AnomalyLevel};

/// One warning per sampled collection whose element count risks blocking
/// single operations.
pub struct HugeCollectionDetector;

impl Detector for HugeCollectionDetector {
    fn name(&self) -> &'static str {
        "huge_collections"
    }

    fn detect(&self, ctx: &AnalysisContext<'_>) -> Findings {
        let t = &ctx.thresholds.collections;
        let display_chars = ctx.thresholds.large_keys.display_key_chars;

        let anomalies = ctx
            .summary
            .largest_entries(t.sample_size)
            .iter()
            .filter(|e| e.element_count > t.max_elements)
            .map(|e| {
                let elements = format_number(e.element_count);
                ctx.anomaly(
                    AnomalyLevel::Warning,
                    AnomalyCategory::Performance,
                    "Huge Collection Detected",
                )
                .with_description(format!(
                    "Key '{}' ({}) contains {} elements",
                    truncate_key(&e.key, display_chars),
                    e.data_type,
                    elements
                ))
                .with_impact("Operations on huge collections can block Redis and cause latency spikes")
                .with_suggestion(
                    "Consider splitting into smaller collections or using different access patterns",
                )
                .with_value(elements)
            })
            .collect();

        Findings::from_anomalies(anomalies)
    }
}
