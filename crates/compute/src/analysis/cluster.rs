use rdbops_core::format::percentage;
use rdbops_core::SlotId;

use super::{AnalysisContext, Detector, Findings};
use crate::types::{AnomalyCategory, AnomalyLevel, ClusterBalance, SlotUsage};

/// Slot memory spread for cluster-mode snapshots. Does nothing when the
/// summary carries no slot totals.
pub struct ClusterBalanceAnalyzer;

impl Detector for ClusterBalanceAnalyzer {
    fn name(&self) -> &'static str {
        "cluster_balance"
    }

    fn detect(&self, ctx: &AnalysisContext<'_>) -> Findings {
        let t = &ctx.thresholds.cluster;
        let slot_bytes = ctx.summary.byte_totals_by_slot();
        if slot_bytes.is_empty() {
            return Findings::default();
        }
        let slot_counts = ctx.summary.counts_by_slot();

        let imbalance = imbalance_percentage(slot_bytes.values().copied());

        let mut slots: Vec<(SlotId, u64)> = slot_bytes.iter().map(|(&s, &b)| (s, b)).collect();
        // Map order is ascending slot id, so the stable sort breaks ties by id.
        slots.sort_by(|a, b| b.1.cmp(&a.1));

        let top_slots = slots
            .into_iter()
            .take(t.top_slots)
            .map(|(slot, bytes)| SlotUsage {
                slot,
                key_count: slot_counts.get(&slot).copied().unwrap_or(0),
                memory_used: bytes,
                percentage_of_total: percentage(bytes, ctx.stats.total_bytes),
            })
            .collect();

        let mut findings = Findings {
            cluster: Some(ClusterBalance {
                imbalance_percentage: imbalance,
                top_slots,
            }),
            ..Findings::default()
        };

        if imbalance > t.imbalance_percent {
            findings.anomalies.push(
                ctx.anomaly(AnomalyLevel::Warning, AnomalyCategory::Cluster, "Slot Imbalance Detected")
                    .with_description(format!("Cluster slots show {:.1}% imbalance", imbalance))
                    .with_impact("Uneven slot distribution can cause hotspots and performance issues")
                    .with_suggestion(
                        "Consider rebalancing slots or reviewing key distribution strategy",
                    )
                    .with_value(format!("{:.1}% imbalance", imbalance)),
            );
        }

        findings
    }
}

/// `(max - min) / avg * 100` with an integer average; 0 when the average is 0.
pub fn imbalance_percentage(slot_bytes: impl Iterator<Item = u64>) -> f64 {
    let mut total: u128 = 0;
    let mut max = 0u64;
    let mut min = u64::MAX;
    let mut slots = 0u128;

    for bytes in slot_bytes {
        total += bytes as u128;
        max = max.max(bytes);
        min = min.min(bytes);
        slots += 1;
    }

    if slots == 0 {
        return 0.0;
    }
    let avg = (total / slots) as u64;
    if avg == 0 {
        return 0.0;
    }
    (max - min) as f64 / avg as f64 * 100.0
}
