mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use rdbops_compute::Report;
use rdbops_core::Config;
use rdbops_store::{HistoryStore, ProgressRegistry};

use crate::cli::{CliArgs, Command};
use crate::commands::{analyze_many, load_analyzer, to_json};

fn main() -> Result<()> {
    // stdout carries the JSON output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    rdbops_core::config::load_dotenv();
    let config = Config::from_env();
    config.log_summary();

    let args = CliArgs::parse();
    let rules = args.rules.clone().or_else(|| config.analysis.rules_path.clone());
    let analyzer = load_analyzer(rules.as_deref())?;
    let progress = ProgressRegistry::new(config.analysis.progress_retention);

    let single_report = |path: &std::path::Path| -> Result<Report> {
        let analyzed = analyze_many(&[path.to_path_buf()], &analyzer, &progress, None)?;
        analyzed
            .into_iter()
            .next()
            .map(|a| a.report)
            .with_context(|| format!("no report produced for {}", path.display()))
    };

    let output = match &args.command {
        Command::Analyze { paths, no_history } => {
            let history = if *no_history {
                None
            } else {
                Some(open_history(&config)?)
            };
            let mut analyzed = analyze_many(paths, &analyzer, &progress, history.as_ref())?;
            if analyzed.len() == 1 {
                let only = analyzed.remove(0);
                to_json(&only.report, args.pretty)?
            } else {
                to_json(&analyzed, args.pretty)?
            }
        }
        Command::Anomalies { path } => to_json(&single_report(path)?.anomaly_digest(), args.pretty)?,
        Command::Recommendations { path } => {
            to_json(&single_report(path)?.recommendation_list(), args.pretty)?
        }
        Command::Health { path } => to_json(&single_report(path)?.health_summary(), args.pretty)?,
        Command::History { remove } => {
            let history = open_history(&config)?;
            match remove {
                Some(filename) => {
                    let removed = history.remove(filename)?;
                    info!(filename = %filename, removed, "history prune");
                    to_json(&serde_json::json!({ "removed": removed, "filename": filename }), args.pretty)?
                }
                None => to_json(&history.all(), args.pretty)?,
            }
        }
    };

    println!("{}", output);
    Ok(())
}

fn open_history(config: &Config) -> Result<HistoryStore> {
    let path = &config.storage.history_file;
    HistoryStore::open(path, config.storage.history_limit)
        .with_context(|| format!("failed to open history: {}", path.display()))
}
