//! Rule-based remediation advice.
//!
//! Rules fire from keyspace totals and per-type efficiency. The slow-log
//! monitoring advice is always included so a report never comes back
//! without recommendations.

use std::collections::BTreeMap;

use rdbops_core::format::format_bytes;

use crate::analysis::AnalysisContext;
use crate::types::{Effort, Recommendation, RecommendationCategory, TypeEfficiency};

/// Build the recommendation list, sorted ascending by priority with ties in
/// generation order.
pub fn generate(
    ctx: &AnalysisContext<'_>,
    efficiency: &BTreeMap<String, TypeEfficiency>,
) -> Vec<Recommendation> {
    let t = &ctx.thresholds.recommendations;
    let rec = |priority: u8, category: RecommendationCategory, title: &str, effort: Effort| Recommendation {
        priority,
        category,
        title: title.to_string(),
        description: String::new(),
        action: String::new(),
        impact: String::new(),
        effort,
        created_at: ctx.detected_at,
    };
    let mut out = Vec::new();

    if ctx.stats.total_bytes > t.eviction_total_bytes {
        out.push(Recommendation {
            description: format!(
                "Database is using significant memory (>{})",
                format_bytes(t.eviction_total_bytes)
            ),
            action: "Configure 'maxmemory' and 'maxmemory-policy' in redis.conf".into(),
            impact: "Prevents OOM errors and automatic eviction of less important data".into(),
            ..rec(2, RecommendationCategory::Memory, "Enable Memory Eviction Policy", Effort::Low)
        });
    }

    // Expiry is not part of the aggregate, so every sampled entry counts.
    let ttl_candidates = ctx.summary.largest_entries(t.ttl_sample_size).len();
    if ttl_candidates > t.ttl_min_entries {
        out.push(Recommendation {
            description: "Many large keys appear to have no expiration set".into(),
            action: "Review and set appropriate TTL values for large keys".into(),
            impact: "Prevents unbounded memory growth and automatic cleanup".into(),
            ..rec(1, RecommendationCategory::Ttl, "Implement TTL for Large Keys", Effort::Medium)
        });
    }

    if let Some(strings) = efficiency.get("string") {
        if strings.efficiency_score < t.string_efficiency_score {
            out.push(Recommendation {
                description: format!(
                    "String type shows low efficiency ({:.1}%)",
                    strings.efficiency_score
                ),
                action: "Group related small string values into Hash structures".into(),
                impact: "Can reduce memory overhead by 30-50% for small values".into(),
                ..rec(
                    3,
                    RecommendationCategory::Performance,
                    "Consider Using Hash for Small Strings",
                    Effort::High,
                )
            });
        }
    }

    out.push(Recommendation {
        description: "Track slow commands for performance optimization".into(),
        action: "Set 'slowlog-log-slower-than 10000' and 'slowlog-max-len 128'".into(),
        impact: "Helps identify performance bottlenecks".into(),
        ..rec(4, RecommendationCategory::Monitoring, "Enable Redis Slow Log", Effort::Low)
    });

    out.sort_by_key(|r| r.priority);
    out
}
