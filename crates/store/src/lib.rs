//! Owned stores around the analysis engine: the persisted analysis history
//! and the in-memory registry of summary-loading progress.

pub mod error;
pub mod history;
pub mod progress;

pub use error::{Result, StoreError};
pub use history::{HistoryEntry, HistoryStore, DEFAULT_HISTORY_LIMIT};
pub use progress::{ParseProgress, ProgressRegistry, ProgressSnapshot, ProgressStatus};
