//! Oversized individual keys.
//!
//! Every key at or above the critical size is reported on its own; keys in
//! the warning band are folded into one aggregate anomaly.

use rdbops_core::format::{format_bytes, truncate_key};

use super::{AnalysisContext, Detector, Findings};
use crate::types::{AnomalyCategory, AnomalyLevel};

pub struct LargeKeyDetector;

impl Detector for LargeKeyDetector {
    fn name(&self) -> &'static str {
        "large_keys"
    }

    fn detect(&self, ctx: &AnalysisContext<'_>) -> Findings {
        let t = &ctx.thresholds.large_keys;
        let mut anomalies = Vec::new();
        let mut warning_count = 0u64;

        for entry in ctx.summary.largest_entries(t.sample_size) {
            if entry.bytes >= t.critical_bytes {
                let size = format_bytes(entry.bytes);
                anomalies.push(
                    ctx.anomaly(
                        AnomalyLevel::Critical,
                        AnomalyCategory::Memory,
                        "Extremely Large Key Detected",
                    )
                    .with_description(format!(
                        "Key '{}' is {}, which is extremely large",
                        truncate_key(&entry.key, t.display_key_chars),
                        size
                    ))
                    .with_impact("Can cause blocking operations, memory pressure, and slow replication")
                    .with_suggestion(
                        "Consider splitting this key into smaller chunks or using a different data structure",
                    )
                    .with_value(size),
                );
            } else if entry.bytes >= t.warning_bytes {
                warning_count += 1;
            }
        }

        if warning_count > 0 {
            anomalies.push(
                ctx.anomaly(AnomalyLevel::Warning, AnomalyCategory::Memory, "Large Keys Detected")
                    .with_description(format!(
                        "Found {} keys larger than {}",
                        warning_count,
                        format_bytes(t.warning_bytes)
                    ))
                    .with_impact("May cause performance degradation and increased memory fragmentation")
                    .with_suggestion("Review large keys and consider optimization")
                    .with_value(format!("{} keys", warning_count)),
            );
        }

        Findings::from_anomalies(anomalies)
    }
}
