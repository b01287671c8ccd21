//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// aq - quota-paced API client
#[derive(Debug, Parser)]
#[command(name = "aq", about = "Fetch from a rate-limited API without exceeding its quota", version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List items
    Items {
        /// Follow pagination and fetch every page
        #[arg(short, long)]
        all: bool,
    },

    /// Fetch a single item by id
    Item {
        /// Item id
        id: String,
    },

    /// Show the remaining quota
    RateLimit,
}

/// Path of the log file written by the binary
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("apiqueue")
        .join("logs")
        .join("apiqueue.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items_all() {
        let cli = Cli::try_parse_from(["aq", "items", "--all"]).unwrap();
        assert!(matches!(cli.command, Command::Items { all: true }));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_parse_item_with_global_flags() {
        let cli = Cli::try_parse_from(["aq", "item", "42", "-v", "--config", "aq.yml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("aq.yml")));
        match cli.command {
            Command::Item { id } => assert_eq!(id, "42"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rate_limit() {
        let cli = Cli::try_parse_from(["aq", "rate-limit"]).unwrap();
        assert!(matches!(cli.command, Command::RateLimit));
    }

    #[test]
    fn test_command_required() {
        assert!(Cli::try_parse_from(["aq"]).is_err());
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("apiqueue/logs/apiqueue.log"));
    }
}
