//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::domain::Emotion;

/// tc - task card enrichment
#[derive(Parser)]
#[command(
    name = "tc",
    about = "Enrich a task with a strategy, checklist, resources and a gentle push to start",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load every facet of a task and print the card
    Show {
        /// Task description file (YAML)
        task: PathBuf,

        /// Skip the reasoning service and use offline analysis only
        #[arg(long)]
        offline: bool,
    },

    /// Load the card, then regenerate its strategy
    Refresh {
        /// Task description file (YAML)
        task: PathBuf,

        #[arg(long)]
        offline: bool,
    },

    /// Say how you feel about a task and get a nudge
    Checkin {
        /// Task description file (YAML)
        task: PathBuf,

        /// anxious, overwhelmed, unmotivated or ready
        emotion: Emotion,
    },

    /// Run a micro-challenge countdown; Ctrl-C finishes early
    Challenge {
        /// Countdown length in seconds (default from config)
        #[arg(short, long)]
        seconds: Option<u32>,
    },

    /// Chat about a task
    Chat {
        /// Task description file (YAML)
        task: PathBuf,

        #[arg(long)]
        offline: bool,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskcard")
        .join("logs")
        .join("taskcard.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with the reasoning key status and log path
pub fn generate_after_help(api_key_env: &str) -> String {
    debug!(%api_key_env, "generate_after_help: called");
    let key_set = std::env::var(api_key_env).map(|v| !v.trim().is_empty()).unwrap_or(false);
    let icon = if key_set { "\u{2705}" } else { "\u{274C}" };
    let status = if key_set { "AI analysis available" } else { "offline analysis only" };

    let mut help = String::new();
    help.push_str("Reasoning:\n");
    help.push_str(&format!("  {} {:<18} {}\n", icon, api_key_env, status));
    help.push('\n');
    help.push_str(&format!("Logs are written to: {}", get_log_path().display()));
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_show() {
        let cli = Cli::parse_from(["tc", "show", "task.yml"]);
        match cli.command {
            Command::Show { task, offline } => {
                assert_eq!(task, PathBuf::from("task.yml"));
                assert!(!offline);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_refresh_offline() {
        let cli = Cli::parse_from(["tc", "refresh", "task.yml", "--offline"]);
        assert!(matches!(cli.command, Command::Refresh { offline: true, .. }));
    }

    #[test]
    fn test_cli_parse_checkin_emotion() {
        let cli = Cli::parse_from(["tc", "checkin", "task.yml", "overwhelmed"]);
        assert!(matches!(
            cli.command,
            Command::Checkin {
                emotion: Emotion::Overwhelmed,
                ..
            }
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_emotion() {
        assert!(Cli::try_parse_from(["tc", "checkin", "task.yml", "sleepy"]).is_err());
    }

    #[test]
    fn test_cli_parse_challenge_seconds() {
        let cli = Cli::parse_from(["tc", "challenge", "--seconds", "10"]);
        assert!(matches!(cli.command, Command::Challenge { seconds: Some(10) }));

        let cli = Cli::parse_from(["tc", "challenge"]);
        assert!(matches!(cli.command, Command::Challenge { seconds: None }));
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from(["tc", "chat", "task.yml", "-l", "debug", "-c", "/tmp/tc.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/tc.yml")));
    }

    #[test]
    fn test_log_path_ends_with_file() {
        assert!(get_log_path().ends_with("taskcard/logs/taskcard.log"));
    }
}
