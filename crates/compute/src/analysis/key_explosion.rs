use rdbops_core::format::format_number;

use super::{AnalysisContext, Detector, Findings};
use crate::types::{AnomalyCategory, AnomalyLevel};

/// Flags keyspaces with too many keys overall, or dominated by tiny keys
/// whose per-key overhead outweighs their payload.
pub struct KeyExplosionDetector;

impl Detector for KeyExplosionDetector {
    fn name(&self) -> &'static str {
        "key_explosion"
    }

    fn detect(&self, ctx: &AnalysisContext<'_>) -> Findings {
        let t = &ctx.thresholds.key_explosion;
        let total_keys = ctx.stats.total_keys;
        let mut anomalies = Vec::new();

        if total_keys > t.total_keys {
            let count = format_number(total_keys);
            anomalies.push(
                ctx.anomaly(AnomalyLevel::Warning, AnomalyCategory::Keys, "High Key Count")
                    .with_description(format!("Database contains {} keys", count))
                    .with_impact("High key count can slow down operations like KEYS, SCAN, and BGSAVE")
                    .with_suggestion("Consider implementing key expiration policies or data archiving")
                    .with_value(count),
            );
        }

        let sample = ctx.summary.largest_entries(t.sample_size);
        let tiny = sample
            .iter()
            .filter(|e| e.bytes < t.tiny_key_bytes)
            .count() as u64;

        if tiny > t.tiny_key_min_count && tiny as f64 / sample.len() as f64 > t.tiny_key_ratio {
            anomalies.push(
                ctx.anomaly(AnomalyLevel::Warning, AnomalyCategory::Keys, "Many Tiny Keys Detected")
                    .with_description(
                        "Large number of very small keys found, indicating possible key explosion",
                    )
                    .with_impact("Overhead of key storage can exceed value storage, wasting memory")
                    .with_suggestion("Consider using Hash data structures to group related small values")
                    .with_value(format!("{} tiny keys", tiny)),
            );
        }

        Findings::from_anomalies(anomalies)
    }
}
