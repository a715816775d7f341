use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// One analyzed summary file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Identity of the entry; re-analyzing the same file replaces it.
    pub filename: String,
    pub file_path: String,
    pub recorded_at: DateTime<Utc>,
    pub file_size: u64,
    pub total_keys: u64,
    pub total_memory: u64,
    pub health_score: u8,
}

/// Most-recent-first analysis history persisted as a JSON array.
///
/// Every mutation rewrites the whole file; memory only changes once the
/// write succeeded. Share between threads with `Arc`.
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
    entries: RwLock<Vec<HistoryEntry>>,
}

impl HistoryStore {
    /// Open the store at `path`. A missing or empty file is an empty history;
    /// a file that does not parse is an error.
    pub fn open(path: &Path, limit: usize) -> Result<Self> {
        let entries = match std::fs::read_to_string(path) {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => serde_json::from_str::<Vec<HistoryEntry>>(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            entries = entries.len(),
            limit,
            "history store opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            limit: limit.max(1),
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an analysis. An entry with the same filename is replaced in
    /// place; a new one goes to the front and the oldest beyond the limit
    /// are dropped.
    pub fn add(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.write();
        let mut next = entries.clone();
        if let Some(existing) = next.iter_mut().find(|e| e.filename == entry.filename) {
            debug!(filename = %entry.filename, "history entry replaced");
            *existing = entry;
        } else {
            debug!(filename = %entry.filename, "history entry added");
            next.insert(0, entry);
            next.truncate(self.limit);
        }
        self.save(&next)?;
        *entries = next;
        Ok(())
    }

    pub fn get(&self, filename: &str) -> Option<HistoryEntry> {
        self.read().iter().find(|e| e.filename == filename).cloned()
    }

    /// Copy of every entry, most recent first.
    pub fn all(&self) -> Vec<HistoryEntry> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove an entry by filename. Returns whether one was removed; the file
    /// is only rewritten in that case.
    pub fn remove(&self, filename: &str) -> Result<bool> {
        let mut entries = self.write();
        let next: Vec<HistoryEntry> = entries
            .iter()
            .filter(|e| e.filename != filename)
            .cloned()
            .collect();
        if next.len() == entries.len() {
            return Ok(false);
        }
        self.save(&next)?;
        *entries = next;
        info!(filename, "history entry removed");
        Ok(true)
    }

    /// Writes to a dot-prefixed `.tmp` sibling first, then renames over the
    /// history file.
    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "history.json".to_string());
        self.path.with_file_name(format!(".{}.tmp", name))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<HistoryEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<HistoryEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}
