//! Progress tracking for summary-loading jobs.
//!
//! A [`ProgressRegistry`] is owned by whoever runs the jobs and handed to
//! the code that reports on them. Trackers are created on first use and
//! finished ones are pruned beyond a retention count.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Pending,
    Parsing,
    Completed,
    Error,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::Pending => write!(f, "pending"),
            ProgressStatus::Parsing => write!(f, "parsing"),
            ProgressStatus::Completed => write!(f, "completed"),
            ProgressStatus::Error => write!(f, "error"),
        }
    }
}

/// Point-in-time copy of a tracker, ready to serialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub name: String,
    pub status: ProgressStatus,
    pub progress: u8,
    pub current_step: String,
    pub logs: Vec<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
}

#[derive(Debug)]
struct ProgressState {
    status: ProgressStatus,
    progress: u8,
    current_step: String,
    logs: Vec<String>,
    error: Option<String>,
}

/// Mutable progress of one job. Cheap to share through `Arc`.
#[derive(Debug)]
pub struct ParseProgress {
    name: String,
    started_at: DateTime<Utc>,
    state: RwLock<ProgressState>,
}

impl ParseProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Utc::now(),
            state: RwLock::new(ProgressState {
                status: ProgressStatus::Pending,
                progress: 0,
                current_step: String::new(),
                logs: Vec::new(),
                error: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Append a `[HH:MM:SS] message` line.
    pub fn log(&self, message: impl AsRef<str>) {
        let line = format!("[{}] {}", Utc::now().format("%H:%M:%S"), message.as_ref());
        debug!(job = %self.name, "{}", message.as_ref());
        self.write().logs.push(line);
    }

    pub fn set_status(&self, status: ProgressStatus) {
        self.write().status = status;
    }

    /// Set the completion percentage, clamped to 100.
    pub fn set_progress(&self, progress: u32) {
        self.write().progress = progress.min(100) as u8;
    }

    pub fn set_step(&self, step: impl Into<String>) {
        self.write().current_step = step.into();
    }

    /// Record a failure and mark the job as errored.
    pub fn fail(&self, error: impl Into<String>) {
        let mut state = self.write();
        state.error = Some(error.into());
        state.status = ProgressStatus::Error;
    }

    pub fn status(&self) -> ProgressStatus {
        self.read().status
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.read().status,
            ProgressStatus::Completed | ProgressStatus::Error
        )
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.read();
        let elapsed = Utc::now() - self.started_at;
        ProgressSnapshot {
            name: self.name.clone(),
            status: state.status,
            progress: state.progress,
            current_step: state.current_step.clone(),
            logs: state.logs.clone(),
            error: state.error.clone(),
            started_at: self.started_at,
            elapsed_secs: elapsed.num_milliseconds().max(0) as f64 / 1000.0,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ProgressState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProgressState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Job name → tracker.
pub struct ProgressRegistry {
    retention: usize,
    jobs: RwLock<HashMap<String, Arc<ParseProgress>>>,
}

impl ProgressRegistry {
    /// Registry keeping at most `retention` finished jobs after [`prune`](Self::prune).
    pub fn new(retention: usize) -> Self {
        Self {
            retention,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Start tracking `name`, replacing any previous tracker with that name.
    pub fn start(&self, name: &str) -> Arc<ParseProgress> {
        let progress = Arc::new(ParseProgress::new(name));
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&progress));
        debug!(job = name, "progress tracker started");
        progress
    }

    pub fn get(&self, name: &str) -> Option<Arc<ParseProgress>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<ParseProgress>> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshots of every tracked job, oldest first.
    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        let jobs = self.jobs.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<ProgressSnapshot> = jobs.values().map(|p| p.snapshot()).collect();
        out.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.name.cmp(&b.name)));
        out
    }

    /// Drop the oldest finished jobs until at most `retention` remain.
    /// Running jobs are never dropped. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);

        let mut finished: Vec<(DateTime<Utc>, String)> = jobs
            .values()
            .filter(|p| p.is_finished())
            .map(|p| (p.started_at(), p.name().to_string()))
            .collect();
        if finished.len() <= self.retention {
            return 0;
        }
        finished.sort();

        let excess = finished.len() - self.retention;
        for (_, name) in finished.into_iter().take(excess) {
            jobs.remove(&name);
        }
        debug!(removed = excess, remaining = jobs.len(), "progress trackers pruned");
        excess
    }
}
