//! Subcommand implementations. Each returns the JSON document to print.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

use rdbops_compute::{Report, SnapshotAnalyzer};
use rdbops_core::format::{format_bytes, format_number};
use rdbops_core::{SnapshotSummary, SummaryDocument};
use rdbops_rules::AnalysisThresholdsRule;
use rdbops_store::{HistoryEntry, HistoryStore, ProgressRegistry, ProgressStatus};

/// Build the analyzer from a threshold rule file, or the built-in policies.
pub fn load_analyzer(rules: Option<&Path>) -> Result<SnapshotAnalyzer> {
    let Some(path) = rules else {
        return Ok(SnapshotAnalyzer::new());
    };
    let rule = AnalysisThresholdsRule::load(path)
        .with_context(|| format!("failed to load threshold rule: {}", path.display()))?;
    if !rule.metadata.enabled {
        warn!(rule_id = %rule.metadata.id, "threshold rule disabled, using built-in thresholds");
        return Ok(SnapshotAnalyzer::new());
    }
    Ok(SnapshotAnalyzer::with_thresholds(rule.compile()))
}

/// Base name of a summary file, the key of its history entry.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

/// Load one summary and analyze it, reporting each step to the registry.
pub fn analyze_file(
    path: &Path,
    analyzer: &SnapshotAnalyzer,
    progress: &ProgressRegistry,
) -> Result<Report> {
    let job = progress.start(&path.display().to_string());
    job.set_status(ProgressStatus::Parsing);
    job.set_step("reading summary");
    job.log(format!("Loading {}", path.display()));

    let summary = match SummaryDocument::from_path(path) {
        Ok(summary) => summary,
        Err(e) => {
            job.fail(e.to_string());
            return Err(e).with_context(|| format!("failed to load summary: {}", path.display()));
        }
    };
    job.set_progress(50);
    job.log(format!(
        "Loaded {} keys using {}",
        format_number(summary.total_keys()),
        format_bytes(summary.total_bytes())
    ));

    job.set_step("analyzing");
    let report = analyzer.analyze(&summary);
    job.set_progress(100);
    job.set_step("done");
    job.log(format!(
        "Analysis complete: {} anomalies, health score {}",
        report.anomalies.len(),
        report.health_score
    ));
    job.set_status(ProgressStatus::Completed);

    Ok(report)
}

/// One analyzed file in a multi-file run.
#[derive(Debug, Serialize)]
pub struct AnalyzedFile {
    pub file: String,
    pub report: Report,
}

/// Analyze every path in parallel. When `history` is given the runs are
/// recorded, but only once every file analyzed successfully; any failure
/// leaves the history untouched.
pub fn analyze_many(
    paths: &[PathBuf],
    analyzer: &SnapshotAnalyzer,
    progress: &ProgressRegistry,
    history: Option<&HistoryStore>,
) -> Result<Vec<AnalyzedFile>> {
    if history.is_some() {
        let mut seen = HashSet::new();
        for path in paths {
            let name = file_name(path);
            if !seen.insert(name.clone()) {
                bail!(
                    "duplicate file name {} in one run: history entries are keyed by file name",
                    name
                );
            }
        }
    }

    let results: Vec<(PathBuf, Result<Report>)> = paths
        .par_iter()
        .map(|path| (path.clone(), analyze_file(path, analyzer, progress)))
        .collect();

    let mut analyzed = Vec::with_capacity(results.len());
    let mut failed = 0usize;
    for (path, result) in results {
        match result {
            Ok(report) => analyzed.push((path, report)),
            Err(e) => {
                error!(path = %path.display(), error = %format!("{:#}", e), "analysis failed");
                failed += 1;
            }
        }
    }

    for snap in progress.snapshots() {
        info!(
            job = %snap.name,
            status = %snap.status,
            elapsed_secs = snap.elapsed_secs,
            "job finished"
        );
    }
    progress.prune();

    if failed > 0 {
        bail!("{} of {} summaries failed to analyze", failed, paths.len());
    }

    if let Some(history) = history {
        for (path, report) in &analyzed {
            let entry = history_entry(path, report)?;
            history
                .add(entry)
                .with_context(|| format!("failed to record history for {}", path.display()))?;
        }
    }

    Ok(analyzed
        .into_iter()
        .map(|(path, report)| AnalyzedFile {
            file: path.display().to_string(),
            report,
        })
        .collect())
}

/// History record for a finished analysis of `path`.
pub fn history_entry(path: &Path, report: &Report) -> Result<HistoryEntry> {
    let file_size = std::fs::metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?
        .len();
    Ok(HistoryEntry {
        filename: file_name(path),
        file_path: path.display().to_string(),
        recorded_at: report.generated_at,
        file_size,
        total_keys: report.basic_stats.total_keys,
        total_memory: report.basic_stats.total_bytes,
        health_score: report.health_score,
    })
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdbops_core::format::MIB;
    use rdbops_core::Entry;
    use tempfile::TempDir;

    fn write_summary(dir: &Path, name: &str, summary: &SummaryDocument) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, summary.to_json_pretty().unwrap()).unwrap();
        path
    }

    fn large_key_summary() -> SummaryDocument {
        SummaryDocument::new()
            .with_type("string", 1, 60 * MIB)
            .with_entry(Entry::new("blob", "string", 60 * MIB, 1))
    }

    #[test]
    fn analyze_file_completes_progress() {
        let tmp = TempDir::new().unwrap();
        let path = write_summary(tmp.path(), "one.json", &large_key_summary());
        let progress = ProgressRegistry::new(8);

        let report = analyze_file(&path, &SnapshotAnalyzer::new(), &progress).unwrap();
        assert_eq!(report.basic_stats.total_keys, 1);

        let job = progress.get(&path.display().to_string()).unwrap().snapshot();
        assert_eq!(job.status, ProgressStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.logs.len(), 3);
    }

    #[test]
    fn missing_summary_fails_the_job() {
        let tmp = TempDir::new().unwrap();
        let progress = ProgressRegistry::new(8);

        let missing = tmp.path().join("nope.json");
        let err = analyze_file(&missing, &SnapshotAnalyzer::new(), &progress).unwrap_err();
        assert!(format!("{:#}", err).contains("Snapshot not found"));
        let job = progress.get(&missing.display().to_string()).unwrap().snapshot();
        assert_eq!(job.status, ProgressStatus::Error);
        assert!(job.error.is_some());
    }

    #[test]
    fn analyze_many_records_history() {
        let tmp = TempDir::new().unwrap();
        let a = write_summary(tmp.path(), "a.json", &large_key_summary());
        let b = write_summary(tmp.path(), "b.json", &SummaryDocument::new());
        let history = HistoryStore::open(&tmp.path().join("history.json"), 10).unwrap();
        let progress = ProgressRegistry::new(8);

        let analyzed = analyze_many(
            &[a.clone(), b],
            &SnapshotAnalyzer::new(),
            &progress,
            Some(&history),
        )
        .unwrap();

        assert_eq!(analyzed.len(), 2);
        assert_eq!(analyzed[0].file, a.display().to_string());
        assert_eq!(history.len(), 2);
        let entry = history.get("a.json").unwrap();
        assert_eq!(entry.health_score, analyzed[0].report.health_score);
        assert_eq!(entry.total_memory, 60 * MIB);
        assert!(entry.file_size > 0);
    }

    #[test]
    fn analyze_many_reports_failures() {
        let tmp = TempDir::new().unwrap();
        let good = write_summary(tmp.path(), "good.json", &SummaryDocument::new());
        let bad = tmp.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();

        let err = analyze_many(
            &[good, bad],
            &SnapshotAnalyzer::new(),
            &ProgressRegistry::new(8),
            None,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 summaries failed to analyze");
    }

    #[test]
    fn failed_run_records_no_history() {
        let tmp = TempDir::new().unwrap();
        let good = write_summary(tmp.path(), "good.json", &large_key_summary());
        let bad = tmp.path().join("bad.json");
        std::fs::write(&bad, "not json").unwrap();
        let history_path = tmp.path().join("history.json");
        let history = HistoryStore::open(&history_path, 10).unwrap();

        let result = analyze_many(
            &[good, bad],
            &SnapshotAnalyzer::new(),
            &ProgressRegistry::new(8),
            Some(&history),
        );

        assert!(result.is_err());
        assert!(history.is_empty());
        assert!(!history_path.exists());
    }

    #[test]
    fn same_file_name_in_different_dirs_is_tracked_separately() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("a")).unwrap();
        std::fs::create_dir(tmp.path().join("b")).unwrap();
        let first = write_summary(&tmp.path().join("a"), "dump.json", &large_key_summary());
        let second = write_summary(&tmp.path().join("b"), "dump.json", &SummaryDocument::new());
        let progress = ProgressRegistry::new(8);

        let analyzed = analyze_many(
            &[first.clone(), second.clone()],
            &SnapshotAnalyzer::new(),
            &progress,
            None,
        )
        .unwrap();

        let files: Vec<&str> = analyzed.iter().map(|a| a.file.as_str()).collect();
        assert_eq!(
            files,
            vec![first.display().to_string(), second.display().to_string()]
        );
        assert_eq!(progress.len(), 2);
    }

    #[test]
    fn duplicate_file_names_rejected_when_recording_history() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("a")).unwrap();
        std::fs::create_dir(tmp.path().join("b")).unwrap();
        let first = write_summary(&tmp.path().join("a"), "dump.json", &SummaryDocument::new());
        let second = write_summary(&tmp.path().join("b"), "dump.json", &SummaryDocument::new());
        let history = HistoryStore::open(&tmp.path().join("history.json"), 10).unwrap();
        let progress = ProgressRegistry::new(8);

        let err = analyze_many(
            &[first, second],
            &SnapshotAnalyzer::new(),
            &progress,
            Some(&history),
        )
        .unwrap_err();

        assert!(err.to_string().contains("duplicate file name dump.json"));
        assert!(history.is_empty());
        assert!(progress.is_empty());
    }

    #[test]
    fn rule_file_overrides_thresholds() {
        let tmp = TempDir::new().unwrap();
        let rules = tmp.path().join("strict.yml");
        std::fs::write(
            &rules,
            "apiVersion: v1\n\
             kind: AnalysisThresholds\n\
             metadata:\n  id: strict\n  name: Strict\n\
             spec:\n  key_explosion:\n    total_keys: 10\n",
        )
        .unwrap();

        let analyzer = load_analyzer(Some(&rules)).unwrap();
        assert_eq!(analyzer.thresholds().key_explosion.total_keys, 10);
        assert_eq!(
            load_analyzer(None).unwrap().thresholds().key_explosion.total_keys,
            10_000_000
        );
    }

    #[test]
    fn disabled_rule_falls_back_to_builtin() {
        let tmp = TempDir::new().unwrap();
        let rules = tmp.path().join("off.yml");
        std::fs::write(
            &rules,
            "apiVersion: v1\n\
             kind: AnalysisThresholds\n\
             metadata:\n  id: off\n  name: Off\n  enabled: false\n\
             spec:\n  key_explosion:\n    total_keys: 10\n",
        )
        .unwrap();

        let analyzer = load_analyzer(Some(&rules)).unwrap();
        assert_eq!(analyzer.thresholds().key_explosion.total_keys, 10_000_000);
    }

    #[test]
    fn json_output_modes() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(to_json(&value, false).unwrap(), r#"{"a":1}"#);
        assert!(to_json(&value, true).unwrap().contains('\n'));
    }
}
