//! CLI argument definitions for the `cg` binary

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CampaignGenie - LLM-planned, human-approved Yektanet campaigns
#[derive(Debug, Parser)]
#[command(name = "cg", version, about = "Turn campaign requests into live Yektanet campaigns")]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the task consumer in the foreground
    Daemon,

    /// Submit a campaign request from a JSON intake file
    Request {
        /// Path to the intake JSON
        file: PathBuf,

        /// Session id to group the request under (generated if omitted)
        #[arg(long)]
        session: Option<String>,
    },

    /// List tasks, optionally filtered by status
    Tasks {
        /// Filter by status (new, pending_confirm, ...)
        #[arg(long)]
        status: Option<String>,
    },

    /// Approve a plan awaiting confirmation
    Approve {
        /// Task id in pending_confirm
        task_id: String,
    },

    /// Reject a plan awaiting confirmation, with feedback for revision
    Reject {
        /// Task id in pending_confirm
        task_id: String,

        /// Why the plan was rejected
        #[arg(long)]
        feedback: String,
    },

    /// Show the current plan for a session
    Plan {
        /// Session id
        session_id: String,
    },

    /// Add a reference document to the knowledge base
    Learn {
        /// Path to a text file
        file: PathBuf,

        /// Content type label (guide, pricing, ...)
        #[arg(long, default_value = "guide")]
        content_type: String,
    },

    /// Show the daemon log
    Logs {
        /// Number of lines to show
        #[arg(long, default_value_t = 100)]
        lines: usize,
    },
}

/// Path of the daemon log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("campaigngenie")
        .join("logs")
        .join("campaigngenie.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_daemon() {
        let cli = Cli::try_parse_from(["cg", "daemon"]).unwrap();
        assert!(matches!(cli.command, Command::Daemon));
    }

    #[test]
    fn test_parse_reject_requires_feedback() {
        assert!(Cli::try_parse_from(["cg", "reject", "task-1"]).is_err());
        let cli = Cli::try_parse_from(["cg", "reject", "task-1", "--feedback", "too expensive"]).unwrap();
        match cli.command {
            Command::Reject { task_id, feedback } => {
                assert_eq!(task_id, "task-1");
                assert_eq!(feedback, "too expensive");
            }
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_parse_tasks_with_status() {
        let cli = Cli::try_parse_from(["cg", "tasks", "--status", "pending_confirm"]).unwrap();
        match cli.command {
            Command::Tasks { status } => assert_eq!(status.as_deref(), Some("pending_confirm")),
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["cg", "tasks", "--config", "/tmp/cg.yml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/cg.yml")));
    }
}
