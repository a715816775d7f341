//! Memory concentration by key prefix and by data type.

use rdbops_core::format::percentage;

use super::{AnalysisContext, Detector, Findings};
use crate::types::{AnomalyCategory, AnomalyLevel, HotspotKind, MemoryHotspot};

pub struct HotspotDetector;

impl Detector for HotspotDetector {
    fn name(&self) -> &'static str {
        "memory_hotspots"
    }

    fn detect(&self, ctx: &AnalysisContext<'_>) -> Findings {
        let t = &ctx.thresholds.hotspots;
        let total_bytes = ctx.stats.total_bytes;
        let mut findings = Findings::default();

        for group in ctx
            .summary
            .largest_prefix_groups()
            .iter()
            .take(t.prefix_limit)
        {
            let share = share_of(group.total_bytes, total_bytes);
            findings.hotspots.push(MemoryHotspot {
                kind: HotspotKind::KeyPrefix,
                identifier: group.prefix.clone(),
                memory_used: group.total_bytes,
                key_count: group.count,
                percentage_of_total: share,
                avg_entry_size: average(group.total_bytes, group.count),
            });

            if share > t.prefix_share_percent {
                findings.anomalies.push(
                    ctx.anomaly(AnomalyLevel::Warning, AnomalyCategory::Memory, "Memory Hotspot Detected")
                        .with_description(format!(
                            "Key prefix '{}' uses {:.1}% of total memory",
                            group.prefix, share
                        ))
                        .with_impact(
                            "Memory concentration can cause uneven load distribution in cluster mode",
                        )
                        .with_suggestion(
                            "Consider reviewing keys with this prefix for optimization or better distribution",
                        )
                        .with_value(format!("{:.1}%", share)),
                );
            }
        }

        let counts = ctx.summary.counts_by_type();
        for (data_type, &bytes) in ctx.summary.byte_totals_by_type() {
            let share = share_of(bytes, total_bytes);
            let count = counts.get(data_type).copied().unwrap_or(0);

            if share > t.type_share_percent {
                findings.anomalies.push(
                    ctx.anomaly(AnomalyLevel::Info, AnomalyCategory::Memory, "Data Type Dominance")
                        .with_description(format!(
                            "Type '{}' accounts for {:.1}% of memory usage",
                            data_type, share
                        ))
                        .with_impact("Single type dominance might indicate optimization opportunities")
                        .with_suggestion(
                            "Review if this data type usage pattern is optimal for your use case",
                        )
                        .with_value(format!("{:.1}%", share)),
                );
            }

            findings.hotspots.push(MemoryHotspot {
                kind: HotspotKind::DataType,
                identifier: data_type.clone(),
                memory_used: bytes,
                key_count: count,
                percentage_of_total: share,
                avg_entry_size: average(bytes, count),
            });
        }

        findings
    }
}

/// Share of total bytes, 0 without data and capped at 100 when a group
/// reports more bytes than the type totals.
fn share_of(part: u64, total: u64) -> f64 {
    percentage(part, total).min(100.0)
}

fn average(bytes: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        bytes / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rdbops_core::{PrefixGroup, SummaryDocument};
    use rdbops_rules::CompiledThresholds;

    fn run(summary: &SummaryDocument) -> Findings {
        let thresholds = CompiledThresholds::default();
        let ctx = AnalysisContext::new(summary, &thresholds, Utc::now());
        HotspotDetector.detect(&ctx)
    }

    #[test]
    fn prefix_over_share_warns() {
        let summary = SummaryDocument::new()
            .with_type("string", 100, 1_000)
            .with_type("hash", 100, 1_000)
            .with_prefix_group(PrefixGroup::new("cache:", 40, 800))
            .with_prefix_group(PrefixGroup::new("user:", 10, 200));
        let findings = run(&summary);

        assert_eq!(findings.anomalies.len(), 1);
        let warning = &findings.anomalies[0];
        assert_eq!(warning.level, AnomalyLevel::Warning);
        assert_eq!(warning.description, "Key prefix 'cache:' uses 40.0% of total memory");
        assert_eq!(warning.value, "40.0%");

        let cache = &findings.hotspots[0];
        assert_eq!(cache.kind, HotspotKind::KeyPrefix);
        assert_eq!(cache.avg_entry_size, 20);
        assert_eq!(cache.percentage_of_total, 40.0);
    }

    #[test]
    fn share_at_threshold_is_quiet() {
        let summary = SummaryDocument::new()
            .with_type("string", 10, 500)
            .with_type("hash", 10, 500)
            .with_prefix_group(PrefixGroup::new("p:", 3, 300));
        assert!(run(&summary).anomalies.is_empty());
    }

    #[test]
    fn dominant_type_is_info() {
        let summary = SummaryDocument::new()
            .with_type("string", 9, 900)
            .with_type("set", 1, 100);
        let findings = run(&summary);

        assert_eq!(findings.anomalies.len(), 1);
        assert_eq!(findings.anomalies[0].level, AnomalyLevel::Info);
        assert_eq!(
            findings.anomalies[0].description,
            "Type 'string' accounts for 90.0% of memory usage"
        );
        assert_eq!(findings.hotspots.len(), 2);
        assert!(findings
            .hotspots
            .iter()
            .all(|h| h.kind == HotspotKind::DataType));
    }

    #[test]
    fn prefix_limit_applies() {
        let mut summary = SummaryDocument::new().with_type("string", 1_000, 1_000_000);
        for i in 0..30u64 {
            summary = summary.with_prefix_group(PrefixGroup::new(format!("p{}:", i), 1, 100 + i));
        }
        let findings = run(&summary);
        let prefixes = findings
            .hotspots
            .iter()
            .filter(|h| h.kind == HotspotKind::KeyPrefix)
            .count();
        assert_eq!(prefixes, 20);
    }

    #[test]
    fn zero_totals_give_zero_percentages() {
        let summary = SummaryDocument::new()
            .with_type("string", 0, 0)
            .with_prefix_group(PrefixGroup::new("empty:", 0, 0));
        let findings = run(&summary);

        assert!(findings.anomalies.is_empty());
        assert!(findings
            .hotspots
            .iter()
            .all(|h| h.percentage_of_total == 0.0 && h.avg_entry_size == 0));
    }

    #[test]
    fn oversized_prefix_group_is_capped() {
        let summary = SummaryDocument::new()
            .with_type("string", 1, 100)
            .with_prefix_group(PrefixGroup::new("odd:", 2, 500));
        let findings = run(&summary);
        assert_eq!(findings.hotspots[0].percentage_of_total, 100.0);
    }
}
