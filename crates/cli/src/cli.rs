use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Operational analysis of Redis snapshot summaries.
///
/// Reads the JSON summary a snapshot decoder produces and reports anomalies,
/// memory hotspots, key patterns, type efficiency, cluster slot balance, a
/// health score and recommendations.
#[derive(Parser, Debug)]
#[command(name = "rdbops", version, about)]
pub struct CliArgs {
    /// Threshold rule YAML overriding the built-in policies
    /// (default: RDBOPS_RULES_PATH).
    #[arg(long, global = true)]
    pub rules: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Full report for one or more summaries, analyzed in parallel.
    Analyze {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Do not record the runs in the analysis history.
        #[arg(long)]
        no_history: bool,
    },

    /// Anomalies grouped by level, with the health score.
    Anomalies { path: PathBuf },

    /// Prioritized recommendations.
    Recommendations { path: PathBuf },

    /// Health score, label and issue counts.
    Health { path: PathBuf },

    /// List recorded analyses, most recent first.
    History {
        /// Remove the entry with this filename instead of listing.
        #[arg(long)]
        remove: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_takes_many_paths() {
        let args = CliArgs::parse_from(["rdbops", "analyze", "a.json", "b.json", "--pretty"]);
        assert!(args.pretty);
        match args.command {
            Command::Analyze { paths, no_history } => {
                assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
                assert!(!no_history);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn analyze_requires_a_path() {
        assert!(CliArgs::try_parse_from(["rdbops", "analyze"]).is_err());
    }

    #[test]
    fn rules_flag_is_global() {
        let args = CliArgs::parse_from(["rdbops", "health", "s.json", "--rules", "t.yml"]);
        assert_eq!(args.rules, Some(PathBuf::from("t.yml")));
        assert!(matches!(args.command, Command::Health { .. }));
    }

    #[test]
    fn history_remove() {
        let args = CliArgs::parse_from(["rdbops", "history", "--remove", "old.json"]);
        match args.command {
            Command::History { remove } => assert_eq!(remove.as_deref(), Some("old.json")),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
