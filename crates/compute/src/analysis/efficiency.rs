use std::collections::BTreeMap;

use super::stats::SizeDistribution;
use super::{AnalysisContext, Detector, Findings};
use crate::types::{AnomalyCategory, AnomalyLevel, TypeEfficiency};

/// Per-type size distribution over the largest entries. Wide dispersion
/// within one type lowers its efficiency score.
pub struct TypeEfficiencyAnalyzer;

impl Detector for TypeEfficiencyAnalyzer {
    fn name(&self) -> &'static str {
        "type_efficiency"
    }

    fn detect(&self, ctx: &AnalysisContext<'_>) -> Findings {
        let t = &ctx.thresholds.efficiency;

        let mut sizes_by_type: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
        for entry in ctx.summary.largest_entries(t.sample_size) {
            sizes_by_type
                .entry(entry.data_type.as_str())
                .or_default()
                .push(entry.bytes);
        }

        let mut findings = Findings::default();
        for (data_type, mut sizes) in sizes_by_type {
            let Some(dist) = SizeDistribution::from_sizes(&mut sizes) else {
                continue;
            };
            let score = dist.efficiency_score();

            findings.efficiency.insert(
                data_type.to_string(),
                TypeEfficiency {
                    avg_size: dist.avg,
                    median_size: dist.median,
                    p95_size: dist.p95,
                    p99_size: dist.p99,
                    efficiency_score: score,
                    wasted_memory: 0,
                    suggested_type: data_type.to_string(),
                },
            );

            if score < t.low_efficiency_score {
                findings.anomalies.push(
                    ctx.anomaly(AnomalyLevel::Info, AnomalyCategory::Performance, "Inconsistent Key Sizes")
                        .with_description(format!(
                            "Type '{}' shows high size variance (efficiency: {:.1}%)",
                            data_type, score
                        ))
                        .with_impact("Inconsistent sizes can indicate suboptimal data structure usage")
                        .with_suggestion("Review keys of this type for potential optimization")
                        .with_value(format!("{:.1}% efficient", score)),
                );
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rdbops_core::{Entry, SummaryDocument};
    use rdbops_rules::CompiledThresholds;

    fn run(summary: &SummaryDocument) -> Findings {
        let thresholds = CompiledThresholds::default();
        let ctx = AnalysisContext::new(summary, &thresholds, Utc::now());
        TypeEfficiencyAnalyzer.detect(&ctx)
    }

    #[test]
    fn uniform_type_scores_full_efficiency() {
        let summary = SummaryDocument::new()
            .with_entries((0..10).map(|i| Entry::new(format!("s:{}", i), "string", 512, 1)));
        let findings = run(&summary);

        assert!(findings.anomalies.is_empty());
        let eff = &findings.efficiency["string"];
        assert_eq!(eff.efficiency_score, 100.0);
        assert_eq!(eff.avg_size, 512);
        assert_eq!(eff.median_size, 512);
        assert_eq!(eff.wasted_memory, 0);
        assert_eq!(eff.suggested_type, "string");
    }

    #[test]
    fn dispersed_type_reports_info() {
        let summary = SummaryDocument::new()
            .with_entry(Entry::new("big", "hash", 1_000_000, 100))
            .with_entries((0..4).map(|i| Entry::new(format!("h:{}", i), "hash", 10, 1)));
        let findings = run(&summary);

        assert_eq!(findings.anomalies.len(), 1);
        let info = &findings.anomalies[0];
        assert_eq!(info.level, AnomalyLevel::Info);
        assert_eq!(info.category, AnomalyCategory::Performance);
        assert_eq!(info.description, "Type 'hash' shows high size variance (efficiency: 0.0%)");
        assert_eq!(info.value, "0.0% efficient");
        assert_eq!(findings.efficiency["hash"].p99_size, 1_000_000);
    }

    #[test]
    fn types_visited_in_name_order() {
        let summary = SummaryDocument::new()
            .with_entry(Entry::new("z1", "zset", 1_000_000, 1))
            .with_entry(Entry::new("z2", "zset", 1, 1))
            .with_entry(Entry::new("z3", "zset", 1, 1))
            .with_entry(Entry::new("l1", "list", 2_000_000, 1))
            .with_entry(Entry::new("l2", "list", 1, 1))
            .with_entry(Entry::new("l3", "list", 1, 1));
        let findings = run(&summary);

        let described: Vec<&str> = findings
            .anomalies
            .iter()
            .map(|a| a.description.as_str())
            .collect();
        assert!(described[0].starts_with("Type 'list'"));
        assert!(described[1].starts_with("Type 'zset'"));
    }

    #[test]
    fn single_entry_type_has_valid_percentiles() {
        let summary = SummaryDocument::new().with_entry(Entry::new("only", "stream", 4_096, 9));
        let eff = &run(&summary).efficiency["stream"];
        assert_eq!(eff.median_size, 4_096);
        assert_eq!(eff.p95_size, 4_096);
        assert_eq!(eff.p99_size, 4_096);
    }
}
