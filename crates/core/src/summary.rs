//! Snapshot summary: the aggregate produced by decoding a snapshot file.
//!
//! The decoder itself lives outside this workspace. What it hands over is a
//! frozen set of counters:
//! - per-type key counts and byte totals
//! - per-cluster-slot key counts and byte totals (empty outside cluster mode)
//! - the largest individual entries, ranked by size
//! - the largest key-prefix groups, ranked by total bytes
//!
//! [`SnapshotSummary`] is the read-only view the analysis engine consumes.
//! [`SummaryDocument`] is its serialized (JSON) form.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OpsError, Result};

/// Cluster hash-slot identifier.
pub type SlotId = u16;

/// Number of hash slots in a cluster keyspace.
pub const CLUSTER_SLOTS: u32 = 16384;

/// A single decoded key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: String,
    /// Declared data-type name (`string`, `hash`, `list`, `set`, `sortedset`, ...).
    #[serde(rename = "type")]
    pub data_type: String,
    pub bytes: u64,
    #[serde(default)]
    pub element_count: u64,
}

impl Entry {
    pub fn new(key: impl Into<String>, data_type: impl Into<String>, bytes: u64, element_count: u64) -> Self {
        Self {
            key: key.into(),
            data_type: data_type.into(),
            bytes,
            element_count,
        }
    }
}

/// Keys sharing a leading substring, grouped by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixGroup {
    pub prefix: String,
    pub count: u64,
    pub total_bytes: u64,
}

impl PrefixGroup {
    pub fn new(prefix: impl Into<String>, count: u64, total_bytes: u64) -> Self {
        Self {
            prefix: prefix.into(),
            count,
            total_bytes,
        }
    }
}

/// Read-only aggregate view of one decoded snapshot.
///
/// Implementations must return entries descending by `bytes` and prefix
/// groups descending by `total_bytes`.
pub trait SnapshotSummary {
    /// Up to `n` largest entries, descending by size.
    fn largest_entries(&self, n: usize) -> &[Entry];

    /// Prefix groups, descending by total bytes.
    fn largest_prefix_groups(&self) -> &[PrefixGroup];

    fn byte_totals_by_type(&self) -> &BTreeMap<String, u64>;

    fn counts_by_type(&self) -> &BTreeMap<String, u64>;

    /// Empty when the snapshot was not taken in cluster mode.
    fn byte_totals_by_slot(&self) -> &BTreeMap<SlotId, u64>;

    fn counts_by_slot(&self) -> &BTreeMap<SlotId, u64>;

    /// Sum of per-type key counts.
    fn total_keys(&self) -> u64 {
        self.counts_by_type()
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    /// Sum of per-type byte totals.
    fn total_bytes(&self) -> u64 {
        self.byte_totals_by_type()
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// Serialized snapshot summary, as written by the decoder.
///
/// Ordering invariants are restored on load and maintained by the builder
/// methods, so an unsorted document still satisfies [`SnapshotSummary`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SummaryFile")]
pub struct SummaryDocument {
    /// Name of the snapshot file the counters were taken from.
    source: Option<String>,
    type_bytes: BTreeMap<String, u64>,
    type_counts: BTreeMap<String, u64>,
    slot_bytes: BTreeMap<SlotId, u64>,
    slot_counts: BTreeMap<SlotId, u64>,
    largest_entries: Vec<Entry>,
    prefix_groups: Vec<PrefixGroup>,
}

/// Wire shape of a summary document; every section is optional.
#[derive(Deserialize)]
struct SummaryFile {
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    type_bytes: BTreeMap<String, u64>,
    #[serde(default)]
    type_counts: BTreeMap<String, u64>,
    #[serde(default)]
    slot_bytes: BTreeMap<SlotId, u64>,
    #[serde(default)]
    slot_counts: BTreeMap<SlotId, u64>,
    #[serde(default)]
    largest_entries: Vec<Entry>,
    #[serde(default)]
    prefix_groups: Vec<PrefixGroup>,
}

impl From<SummaryFile> for SummaryDocument {
    fn from(file: SummaryFile) -> Self {
        let mut doc = Self {
            source: file.source,
            type_bytes: file.type_bytes,
            type_counts: file.type_counts,
            slot_bytes: file.slot_bytes,
            slot_counts: file.slot_counts,
            largest_entries: file.largest_entries,
            prefix_groups: file.prefix_groups,
        };
        doc.sort_rankings();
        doc
    }
}

impl SummaryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a summary from JSON text and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: Self = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Read and validate a summary file.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(OpsError::SnapshotNotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path)?;
        let mut doc = Self::from_json(&json)?;
        if doc.source.is_none() {
            doc.source = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string);
        }
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject counters that cannot come from a real keyspace.
    pub fn validate(&self) -> Result<()> {
        let bad_slot = self
            .slot_bytes
            .keys()
            .chain(self.slot_counts.keys())
            .find(|slot| u32::from(**slot) >= CLUSTER_SLOTS);
        if let Some(slot) = bad_slot {
            return Err(OpsError::InvalidSummary(format!(
                "slot {} out of range (0..{})",
                slot, CLUSTER_SLOTS
            )));
        }

        if let Some(entry) = self.largest_entries.iter().find(|e| e.key.is_empty()) {
            return Err(OpsError::InvalidSummary(format!(
                "entry of type '{}' has an empty key",
                entry.data_type
            )));
        }

        Ok(())
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Add `count` keys totalling `bytes` to a data type.
    pub fn with_type(mut self, data_type: &str, count: u64, bytes: u64) -> Self {
        *self.type_counts.entry(data_type.to_string()).or_default() += count;
        *self.type_bytes.entry(data_type.to_string()).or_default() += bytes;
        self
    }

    /// Add `count` keys totalling `bytes` to a cluster slot.
    pub fn with_slot(mut self, slot: SlotId, count: u64, bytes: u64) -> Self {
        *self.slot_counts.entry(slot).or_default() += count;
        *self.slot_bytes.entry(slot).or_default() += bytes;
        self
    }

    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.largest_entries.push(entry);
        self.sort_rankings();
        self
    }

    pub fn with_entries(mut self, entries: impl IntoIterator<Item = Entry>) -> Self {
        self.largest_entries.extend(entries);
        self.sort_rankings();
        self
    }

    pub fn with_prefix_group(mut self, group: PrefixGroup) -> Self {
        self.prefix_groups.push(group);
        self.sort_rankings();
        self
    }

    // Stable sorts keep the decoder's order among equal sizes.
    fn sort_rankings(&mut self) {
        self.largest_entries.sort_by(|a, b| b.bytes.cmp(&a.bytes));
        self.prefix_groups
            .sort_by(|a, b| b.total_bytes.cmp(&a.total_bytes));
    }
}

impl SnapshotSummary for SummaryDocument {
    fn largest_entries(&self, n: usize) -> &[Entry] {
        let end = n.min(self.largest_entries.len());
        &self.largest_entries[..end]
    }

    fn largest_prefix_groups(&self) -> &[PrefixGroup] {
        &self.prefix_groups
    }

    fn byte_totals_by_type(&self) -> &BTreeMap<String, u64> {
        &self.type_bytes
    }

    fn counts_by_type(&self) -> &BTreeMap<String, u64> {
        &self.type_counts
    }

    fn byte_totals_by_slot(&self) -> &BTreeMap<SlotId, u64> {
        &self.slot_bytes
    }

    fn counts_by_slot(&self) -> &BTreeMap<SlotId, u64> {
        &self.slot_counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_entries_descending() {
        let doc = SummaryDocument::new()
            .with_entry(Entry::new("small", "string", 10, 1))
            .with_entry(Entry::new("big", "hash", 1000, 5))
            .with_entry(Entry::new("mid", "list", 500, 3));

        let keys: Vec<&str> = doc.largest_entries(10).iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["big", "mid", "small"]);
    }

    #[test]
    fn largest_entries_is_bounded_by_n() {
        let doc = SummaryDocument::new().with_entries(
            (0..20).map(|i| Entry::new(format!("k{}", i), "string", i as u64, 1)),
        );
        assert_eq!(doc.largest_entries(5).len(), 5);
        assert_eq!(doc.largest_entries(5)[0].bytes, 19);
        assert_eq!(doc.largest_entries(100).len(), 20);
    }

    #[test]
    fn totals_sum_type_maps() {
        let doc = SummaryDocument::new()
            .with_type("string", 10, 1000)
            .with_type("hash", 5, 4000)
            .with_type("string", 2, 200);
        assert_eq!(doc.total_keys(), 17);
        assert_eq!(doc.total_bytes(), 5200);
        assert_eq!(doc.counts_by_type()["string"], 12);
    }

    #[test]
    fn json_load_sorts_unsorted_sections() {
        let json = r#"{
            "type_bytes": {"string": 300},
            "type_counts": {"string": 3},
            "largest_entries": [
                {"key": "a", "type": "string", "bytes": 1},
                {"key": "b", "type": "string", "bytes": 200, "element_count": 1}
            ],
            "prefix_groups": [
                {"prefix": "x:", "count": 1, "total_bytes": 5},
                {"prefix": "y:", "count": 2, "total_bytes": 50}
            ]
        }"#;
        let doc = SummaryDocument::from_json(json).unwrap();
        assert_eq!(doc.largest_entries(1)[0].key, "b");
        assert_eq!(doc.largest_entries(2)[1].element_count, 0);
        assert_eq!(doc.largest_prefix_groups()[0].prefix, "y:");
        assert!(doc.byte_totals_by_slot().is_empty());
    }

    #[test]
    fn empty_json_object_is_an_empty_summary() {
        let doc = SummaryDocument::from_json("{}").unwrap();
        assert_eq!(doc.total_keys(), 0);
        assert_eq!(doc.total_bytes(), 0);
        assert!(doc.largest_entries(500).is_empty());
    }

    #[test]
    fn out_of_range_slot_rejected() {
        let json = r#"{"slot_bytes": {"20000": 10}}"#;
        let err = SummaryDocument::from_json(json).unwrap_err();
        assert!(matches!(err, OpsError::InvalidSummary(_)));
    }

    #[test]
    fn empty_key_rejected() {
        let json = r#"{"largest_entries": [{"key": "", "type": "string", "bytes": 1}]}"#;
        assert!(SummaryDocument::from_json(json).is_err());
    }

    #[test]
    fn from_path_missing_file() {
        let err = SummaryDocument::from_path(Path::new("/nonexistent/summary.json")).unwrap_err();
        assert!(matches!(err, OpsError::SnapshotNotFound(_)));
    }

    #[test]
    fn from_path_defaults_source_to_file_name() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("dump-6379.json");
        let doc = SummaryDocument::new().with_type("set", 1, 64);
        std::fs::write(&path, doc.to_json_pretty().unwrap()).unwrap();

        let loaded = SummaryDocument::from_path(&path).unwrap();
        assert_eq!(loaded.source(), Some("dump-6379.json"));
        assert_eq!(loaded.total_bytes(), 64);
    }
}
