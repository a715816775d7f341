use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub storage: StorageConfig,
    pub analysis: AnalysisConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RDBOPS_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("RDBOPS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            storage: StorageConfig::from_env_profiled(p),
            analysis: AnalysisConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  storage:   data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  history:   file={}, limit={}",
            self.storage.history_file.display(),
            self.storage.history_limit
        );
        tracing::info!(
            "  analysis:  rules={}, progress_retention={}",
            self.analysis
                .rules_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(built-in defaults)".to_string()),
            self.analysis.progress_retention
        );
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// JSON file holding the analysis history.
    pub history_file: PathBuf,
    /// Maximum number of history entries kept.
    pub history_limit: usize,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        let data_dir = PathBuf::from(profiled_env_or(p, "RDBOPS_DATA_DIR", "data"));
        let history_file = profiled_env_opt(p, "RDBOPS_HISTORY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("history.json"));
        Self {
            history_file,
            history_limit: profiled_env_usize(p, "RDBOPS_HISTORY_LIMIT", 100),
            data_dir,
        }
    }
}

// ── Analysis ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Threshold rule document overriding the built-in policies.
    pub rules_path: Option<PathBuf>,
    /// Finished progress trackers kept before pruning.
    pub progress_retention: usize,
}

impl AnalysisConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_path: profiled_env_opt(p, "RDBOPS_RULES_PATH").map(PathBuf::from),
            progress_retention: profiled_env_usize(p, "RDBOPS_PROGRESS_RETENTION", 32),
        }
    }
}
