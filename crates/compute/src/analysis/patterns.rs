use rdbops_core::format::percentage;
use rdbops_core::Entry;

use super::{AnalysisContext, Detector, Findings};
use crate::types::KeyPattern;

/// Key-naming statistics for the heaviest prefix groups.
///
/// Example keys come from a bounded sample of the largest entries, so a
/// prefix with no large members shows an empty example.
pub struct KeyPatternAnalyzer;

impl Detector for KeyPatternAnalyzer {
    fn name(&self) -> &'static str {
        "key_patterns"
    }

    fn detect(&self, ctx: &AnalysisContext<'_>) -> Findings {
        let t = &ctx.thresholds.patterns;
        let total_keys = ctx.stats.total_keys;
        let sample = ctx.summary.largest_entries(t.example_sample_size);

        let patterns = ctx
            .summary
            .largest_prefix_groups()
            .iter()
            .take(t.prefix_limit)
            .map(|group| KeyPattern {
                pattern: group.prefix.clone(),
                count: group.count,
                total_memory: group.total_bytes,
                avg_memory: if group.count > 0 {
                    group.total_bytes / group.count
                } else {
                    0
                },
                percentage_of_keys: percentage(group.count, total_keys),
                example_key: example_for(&group.prefix, sample),
            })
            .collect();

        Findings {
            patterns,
            ..Findings::default()
        }
    }
}

fn example_for(prefix: &str, sample: &[Entry]) -> String {
    sample
        .iter()
        .find(|e| e.key.starts_with(prefix))
        .map(|e| e.key.clone())
        .unwrap_or_default()
}
