//! AnalysisThresholds rule kind: size limits, share percentages, sample
//! sizes, health penalties, and recommendation triggers used by the
//! snapshot analysis engine.
//!
//! Every field has a built-in default, so a document only needs to name the
//! values it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, RuleError};
use crate::metadata::CommonMetadata;

/// `kind` value for threshold documents.
pub const THRESHOLDS_KIND: &str = "AnalysisThresholds";

const API_VERSION: &str = "v1";

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level AnalysisThresholds rule document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnalysisThresholdsRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    #[serde(default)]
    pub spec: ThresholdsSpec,
}

/// Specification section of an AnalysisThresholds rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdsSpec {
    pub large_keys: LargeKeyThresholds,
    pub hotspots: HotspotThresholds,
    pub key_explosion: KeyExplosionThresholds,
    pub collections: CollectionThresholds,
    pub patterns: PatternThresholds,
    pub efficiency: EfficiencyThresholds,
    pub cluster: ClusterThresholds,
    pub health: HealthThresholds,
    pub recommendations: RecommendationThresholds,
}

/// Individually oversized keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LargeKeyThresholds {
    /// Number of largest entries inspected.
    pub sample_size: usize,
    /// Keys at or above this size are counted into one aggregate warning.
    pub warning_bytes: u64,
    /// Keys at or above this size are reported individually as critical.
    pub critical_bytes: u64,
    /// Keys longer than this many characters are shortened for display.
    pub display_key_chars: usize,
}

impl Default for LargeKeyThresholds {
    fn default() -> Self {
        Self {
            sample_size: 100,
            warning_bytes: 10 * MIB,
            critical_bytes: 50 * MIB,
            display_key_chars: 50,
        }
    }
}

/// Memory concentration by prefix and by data type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HotspotThresholds {
    /// Number of largest prefix groups turned into hotspots.
    pub prefix_limit: usize,
    /// A prefix above this share of total memory is a warning.
    pub prefix_share_percent: f64,
    /// A data type above this share of total memory is reported as dominant.
    pub type_share_percent: f64,
}

impl Default for HotspotThresholds {
    fn default() -> Self {
        Self {
            prefix_limit: 20,
            prefix_share_percent: 30.0,
            type_share_percent: 50.0,
        }
    }
}

/// Keyspace size and tiny-key anti-pattern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KeyExplosionThresholds {
    /// Total key count above which a warning is raised.
    pub total_keys: u64,
    /// Number of largest entries sampled for tiny keys.
    pub sample_size: usize,
    /// Entries strictly below this size count as tiny.
    pub tiny_key_bytes: u64,
    /// Tiny-key count must exceed this.
    pub tiny_key_min_count: u64,
    /// Tiny-key share of the sample must exceed this ratio.
    pub tiny_key_ratio: f64,
}

impl Default for KeyExplosionThresholds {
    fn default() -> Self {
        Self {
            total_keys: 10_000_000,
            sample_size: 500,
            tiny_key_bytes: 100,
            tiny_key_min_count: 100,
            tiny_key_ratio: 0.3,
        }
    }
}

/// Collections with too many elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CollectionThresholds {
    pub sample_size: usize,
    /// Entries with more elements than this are reported.
    pub max_elements: u64,
}

impl Default for CollectionThresholds {
    fn default() -> Self {
        Self {
            sample_size: 500,
            max_elements: 1_000_000,
        }
    }
}

/// Key pattern table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PatternThresholds {
    /// Number of largest prefix groups listed.
    pub prefix_limit: usize,
    /// Number of largest entries searched for an example key.
    pub example_sample_size: usize,
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            prefix_limit: 50,
            example_sample_size: 500,
        }
    }
}

/// Per-type size dispersion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EfficiencyThresholds {
    pub sample_size: usize,
    /// Types scoring below this are reported.
    pub low_efficiency_score: f64,
}

impl Default for EfficiencyThresholds {
    fn default() -> Self {
        Self {
            sample_size: 500,
            low_efficiency_score: 50.0,
        }
    }
}

/// Cluster slot balance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ClusterThresholds {
    /// Number of heaviest slots listed.
    pub top_slots: usize,
    /// `(max - min) / avg * 100` above this is a warning.
    pub imbalance_percent: f64,
}

impl Default for ClusterThresholds {
    fn default() -> Self {
        Self {
            top_slots: 10,
            imbalance_percent: 50.0,
        }
    }
}

/// Health score deductions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HealthThresholds {
    pub critical_penalty: i64,
    pub warning_penalty: i64,
    pub info_penalty: i64,
    /// Key count above this costs `key_count_high_penalty`.
    pub key_count_high: u64,
    pub key_count_high_penalty: i64,
    /// Otherwise, key count above this costs `key_count_elevated_penalty`.
    pub key_count_elevated: u64,
    pub key_count_elevated_penalty: i64,
    /// Average key size above this costs `avg_size_high_penalty`.
    pub avg_size_high_bytes: u64,
    pub avg_size_high_penalty: i64,
    /// Otherwise, average key size above this costs `avg_size_elevated_penalty`.
    pub avg_size_elevated_bytes: u64,
    pub avg_size_elevated_penalty: i64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            critical_penalty: 15,
            warning_penalty: 8,
            info_penalty: 3,
            key_count_high: 100_000_000,
            key_count_high_penalty: 10,
            key_count_elevated: 50_000_000,
            key_count_elevated_penalty: 5,
            avg_size_high_bytes: MIB,
            avg_size_high_penalty: 10,
            avg_size_elevated_bytes: 100 * KIB,
            avg_size_elevated_penalty: 5,
        }
    }
}

/// Recommendation triggers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RecommendationThresholds {
    /// Total memory above this suggests an eviction policy.
    pub eviction_total_bytes: u64,
    /// Number of largest entries considered for the TTL recommendation.
    pub ttl_sample_size: usize,
    /// More scanned entries than this triggers the TTL recommendation.
    pub ttl_min_entries: usize,
    /// `string` efficiency below this suggests grouping into hashes.
    pub string_efficiency_score: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            eviction_total_bytes: 10 * GIB,
            ttl_sample_size: 100,
            ttl_min_entries: 50,
            string_efficiency_score: 60.0,
        }
    }
}

// ── Compiled type ───────────────────────────────────────────────────

/// Pre-compiled thresholds (trivial — spec is already typed).
pub type CompiledThresholds = ThresholdsSpec;

impl AnalysisThresholdsRule {
    /// The built-in rule, equivalent to an empty `spec`.
    pub fn builtin() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: THRESHOLDS_KIND.to_string(),
            metadata: CommonMetadata {
                id: "analysis-thresholds-default".to_string(),
                name: "Default analysis thresholds".to_string(),
                description: None,
                tags: None,
                enabled: true,
            },
            spec: ThresholdsSpec::default(),
        }
    }

    /// Parse and validate a rule from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let rule: Self = serde_yaml::from_str(yaml)?;
        rule.validate()?;
        Ok(rule)
    }

    /// Read, parse, and validate a rule file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading threshold rule");
        let yaml = std::fs::read_to_string(path)?;
        let rule = Self::from_yaml(&yaml)?;
        info!(
            rule_id = %rule.metadata.id,
            path = %path.display(),
            "threshold rule loaded"
        );
        Ok(rule)
    }

    /// Check header fields and value ranges. All problems are reported at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.kind != THRESHOLDS_KIND {
            problems.push(format!(
                "kind must be '{}', got '{}'",
                THRESHOLDS_KIND, self.kind
            ));
        }
        if self.api_version != API_VERSION {
            problems.push(format!(
                "apiVersion must be '{}', got '{}'",
                API_VERSION, self.api_version
            ));
        }
        if self.metadata.id.trim().is_empty() {
            problems.push("metadata.id must not be empty".to_string());
        }

        self.spec.collect_problems(&mut problems);

        if problems.is_empty() {
            Ok(())
        } else {
            Err(RuleError::Validation(problems.join("; ")))
        }
    }

    /// Compile the YAML config.
    pub fn compile(&self) -> CompiledThresholds {
        self.spec.clone()
    }
}

impl ThresholdsSpec {
    fn collect_problems(&self, problems: &mut Vec<String>) {
        let lk = &self.large_keys;
        if lk.warning_bytes >= lk.critical_bytes {
            problems.push(format!(
                "large_keys.warning_bytes ({}) must be below critical_bytes ({})",
                lk.warning_bytes, lk.critical_bytes
            ));
        }
        if lk.display_key_chars <= 3 {
            problems.push("large_keys.display_key_chars must exceed 3".to_string());
        }

        let samples = [
            ("large_keys.sample_size", lk.sample_size),
            ("key_explosion.sample_size", self.key_explosion.sample_size),
            ("collections.sample_size", self.collections.sample_size),
            ("patterns.example_sample_size", self.patterns.example_sample_size),
            ("efficiency.sample_size", self.efficiency.sample_size),
            ("recommendations.ttl_sample_size", self.recommendations.ttl_sample_size),
        ];
        for (name, size) in samples {
            if size == 0 {
                problems.push(format!("{} must be positive", name));
            }
        }

        let percents = [
            ("hotspots.prefix_share_percent", self.hotspots.prefix_share_percent),
            ("hotspots.type_share_percent", self.hotspots.type_share_percent),
            ("efficiency.low_efficiency_score", self.efficiency.low_efficiency_score),
            (
                "recommendations.string_efficiency_score",
                self.recommendations.string_efficiency_score,
            ),
        ];
        for (name, value) in percents {
            if !(0.0..=100.0).contains(&value) {
                problems.push(format!("{} must be within [0, 100], got {}", name, value));
            }
        }

        let imbalance = self.cluster.imbalance_percent;
        if imbalance.is_nan() || imbalance < 0.0 {
            problems.push("cluster.imbalance_percent must not be negative".to_string());
        }

        let ratio = self.key_explosion.tiny_key_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            problems.push(format!(
                "key_explosion.tiny_key_ratio must be within (0, 1], got {}",
                ratio
            ));
        }

        let h = &self.health;
        if h.key_count_elevated >= h.key_count_high {
            problems.push("health.key_count_elevated must be below key_count_high".to_string());
        }
        if h.avg_size_elevated_bytes >= h.avg_size_high_bytes {
            problems.push(
                "health.avg_size_elevated_bytes must be below avg_size_high_bytes".to_string(),
            );
        }
        let penalties = [
            h.critical_penalty,
            h.warning_penalty,
            h.info_penalty,
            h.key_count_high_penalty,
            h.key_count_elevated_penalty,
            h.avg_size_high_penalty,
            h.avg_size_elevated_penalty,
        ];
        if penalties.iter().any(|p| *p < 0) {
            problems.push("health penalties must not be negative".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED: &str = include_str!("../../../data/rules/analysis-thresholds.yml");

    #[test]
    fn parse_shipped_thresholds_yaml() {
        let rule = AnalysisThresholdsRule::from_yaml(SHIPPED).unwrap();
        assert_eq!(rule.kind, THRESHOLDS_KIND);
        assert!(rule.metadata.enabled);
    }

    #[test]
    fn shipped_yaml_matches_builtin_defaults() {
        let rule = AnalysisThresholdsRule::from_yaml(SHIPPED).unwrap();
        assert_eq!(rule.compile(), ThresholdsSpec::default());
    }

    #[test]
    fn builtin_rule_is_valid() {
        assert!(AnalysisThresholdsRule::builtin().validate().is_ok());
    }

    #[test]
    fn omitted_sections_fall_back_to_defaults() {
        let yaml = r#"
apiVersion: v1
kind: AnalysisThresholds
metadata:
  id: tight-large-keys
  name: Tight large-key limits
spec:
  large_keys:
    critical_bytes: 20971520
"#;
        let rule = AnalysisThresholdsRule::from_yaml(yaml).unwrap();
        let spec = rule.compile();
        assert_eq!(spec.large_keys.critical_bytes, 20 * MIB);
        assert_eq!(spec.large_keys.warning_bytes, 10 * MIB);
        assert_eq!(spec.large_keys.sample_size, 100);
        assert_eq!(spec.health, HealthThresholds::default());
    }

    #[test]
    fn missing_spec_is_all_defaults() {
        let yaml = r#"
apiVersion: v1
kind: AnalysisThresholds
metadata:
  id: bare
  name: Bare
"#;
        let rule = AnalysisThresholdsRule::from_yaml(yaml).unwrap();
        assert_eq!(rule.compile(), ThresholdsSpec::default());
    }

    #[test]
    fn unknown_field_rejected() {
        let yaml = r#"
apiVersion: v1
kind: AnalysisThresholds
metadata:
  id: typo
  name: Typo
spec:
  hotspots:
    prefix_share_pct: 10
"#;
        let err = AnalysisThresholdsRule::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, RuleError::Parse(_)));
    }

    #[test]
    fn wrong_kind_rejected() {
        let mut rule = AnalysisThresholdsRule::builtin();
        rule.kind = "ScoringConfig".to_string();
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("kind must be"));
    }

    #[test]
    fn inverted_large_key_bounds_rejected() {
        let mut rule = AnalysisThresholdsRule::builtin();
        rule.spec.large_keys.warning_bytes = 60 * MIB;
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("warning_bytes"));
    }

    #[test]
    fn all_problems_reported_together() {
        let mut rule = AnalysisThresholdsRule::builtin();
        rule.spec.key_explosion.tiny_key_ratio = 1.5;
        rule.spec.efficiency.sample_size = 0;
        rule.spec.hotspots.type_share_percent = 120.0;
        let msg = rule.validate().unwrap_err().to_string();
        assert!(msg.contains("tiny_key_ratio"));
        assert!(msg.contains("efficiency.sample_size"));
        assert!(msg.contains("type_share_percent"));
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("thresholds.yml");
        std::fs::write(&path, SHIPPED).unwrap();
        let rule = AnalysisThresholdsRule::load(&path).unwrap();
        assert_eq!(rule.metadata.id, "analysis-thresholds-default");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = AnalysisThresholdsRule::load(Path::new("/nonexistent/t.yml")).unwrap_err();
        assert!(matches!(err, RuleError::Io(_)));
    }
}
