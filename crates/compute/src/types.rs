use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rdbops_core::SlotId;

/// Severity of a detected anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyLevel {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for AnomalyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyLevel::Critical => write!(f, "critical"),
            AnomalyLevel::Warning => write!(f, "warning"),
            AnomalyLevel::Info => write!(f, "info"),
        }
    }
}

/// Area of the keyspace an anomaly concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyCategory {
    Memory,
    Ttl,
    Keys,
    Performance,
    Cluster,
}

impl fmt::Display for AnomalyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyCategory::Memory => write!(f, "memory"),
            AnomalyCategory::Ttl => write!(f, "ttl"),
            AnomalyCategory::Keys => write!(f, "keys"),
            AnomalyCategory::Performance => write!(f, "performance"),
            AnomalyCategory::Cluster => write!(f, "cluster"),
        }
    }
}

/// A finding produced by one detector pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub level: AnomalyLevel,
    pub category: AnomalyCategory,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub suggestion: String,
    /// Short display value (size, count, percentage).
    pub value: String,
    pub detected_at: DateTime<Utc>,
}

impl Anomaly {
    pub fn new(
        level: AnomalyLevel,
        category: AnomalyCategory,
        title: impl Into<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            level,
            category,
            title: title.into(),
            description: String::new(),
            impact: String::new(),
            suggestion: String::new(),
            value: String::new(),
            detected_at,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

/// What a memory hotspot aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotspotKind {
    KeyPrefix,
    DataType,
    SingleKey,
}

/// A concentration of memory under one prefix, type, or key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryHotspot {
    #[serde(rename = "type")]
    pub kind: HotspotKind,
    pub identifier: String,
    pub memory_used: u64,
    pub key_count: u64,
    /// Share of total snapshot bytes, 0–100.
    #[serde(rename = "percentage")]
    pub percentage_of_total: f64,
    #[serde(rename = "avg_key_size")]
    pub avg_entry_size: u64,
}

/// Statistics for one key-naming prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyPattern {
    pub pattern: String,
    pub count: u64,
    pub total_memory: u64,
    pub avg_memory: u64,
    /// Share of total key count, 0–100.
    #[serde(rename = "percentage")]
    pub percentage_of_keys: f64,
    /// First sampled key starting with `pattern`; empty when none was sampled.
    #[serde(rename = "example")]
    pub example_key: String,
}

/// Size distribution of one data type over the sampled largest entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeEfficiency {
    pub avg_size: u64,
    pub median_size: u64,
    pub p95_size: u64,
    pub p99_size: u64,
    /// 0–100, higher means more uniform sizes.
    #[serde(rename = "efficiency")]
    pub efficiency_score: f64,
    /// Not estimated yet; always 0.
    pub wasted_memory: u64,
    /// Currently always the observed type.
    #[serde(rename = "optimal_type")]
    pub suggested_type: String,
}

/// Memory held by one cluster hash slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotUsage {
    pub slot: SlotId,
    pub key_count: u64,
    pub memory_used: u64,
    #[serde(rename = "percentage")]
    pub percentage_of_total: f64,
}

/// Slot distribution statistics for a cluster-mode snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterBalance {
    /// `(max - min) / avg * 100` over per-slot memory.
    pub imbalance_percentage: f64,
    /// Heaviest slots, descending by memory.
    pub top_slots: Vec<SlotUsage>,
}

/// Area a recommendation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationCategory {
    Memory,
    Ttl,
    Performance,
    Monitoring,
}

/// Expected effort to apply a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

/// An actionable remediation step. Lower priority value = more urgent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// 1 (most urgent) to 5.
    pub priority: u8,
    pub category: RecommendationCategory,
    pub title: String,
    pub description: String,
    pub action: String,
    pub impact: String,
    pub effort: Effort,
    pub created_at: DateTime<Utc>,
}

/// Keyspace-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_keys: u64,
    pub total_bytes: u64,
    /// `total_bytes / total_keys`, 0 for an empty keyspace.
    pub avg_key_size: f64,
}

impl BasicStats {
    pub fn new(total_keys: u64, total_bytes: u64) -> Self {
        let avg_key_size = if total_keys > 0 {
            total_bytes as f64 / total_keys as f64
        } else {
            0.0
        };
        Self {
            total_keys,
            total_bytes,
            avg_key_size,
        }
    }
}

/// Full result of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// 0–100.
    pub health_score: u8,
    pub anomalies: Vec<Anomaly>,
    pub memory_hotspots: Vec<MemoryHotspot>,
    pub key_patterns: Vec<KeyPattern>,
    pub type_efficiency: BTreeMap<String, TypeEfficiency>,
    /// 0 when the snapshot carries no slot data.
    #[serde(rename = "slot_imbalance")]
    pub slot_imbalance_percentage: f64,
    #[serde(rename = "top_slots_usage")]
    pub top_slots: Vec<SlotUsage>,
    pub recommendations: Vec<Recommendation>,
    pub basic_stats: BasicStats,
    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn count_level(&self, level: AnomalyLevel) -> usize {
        self.anomalies.iter().filter(|a| a.level == level).count()
    }
}
