//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// planclient - one-shot task planning client
#[derive(Parser)]
#[command(
    name = "pc",
    about = "Submit a one-shot planning goal and print the plans the planner reports",
    version = env!("CARGO_PKG_VERSION"),
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

    /// Subcommand to execute; `plan` when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit a planning goal and print every satisficing plan
    Plan(PlanArgs),

    /// Check whether a planning service is reachable
    Ping {
        /// Planning service socket
        #[arg(long)]
        socket: Option<PathBuf>,

        /// How long to wait for the service (0 waits forever)
        #[arg(long)]
        wait_timeout_ms: Option<u64>,
    },

    /// Run a scripted planning service that replays feedback from a YAML file
    Serve {
        /// Plan script to replay
        #[arg(short, long)]
        script: PathBuf,

        /// Socket to listen on
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

/// Options for submitting a goal
#[derive(Debug, Default, Args)]
pub struct PlanArgs {
    /// Domain description file
    #[arg(short, long)]
    pub domain: Option<PathBuf>,

    /// Problem description file
    #[arg(short, long)]
    pub problem: Option<PathBuf>,

    /// Send file contents instead of paths
    #[arg(long)]
    pub inline: bool,

    /// Stop after the first satisficing plan and cancel the goal
    #[arg(long)]
    pub first_plan: bool,

    /// Planning service socket
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// How long to wait for the service (0 waits forever)
    #[arg(long)]
    pub wait_timeout_ms: Option<u64>,

    /// Give up if the goal has not ended after this long (0 is unbounded)
    #[arg(long)]
    pub plan_timeout_ms: Option<u64>,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("planclient")
        .join("logs")
        .join("planclient.log");
    debug!(?path, "get_log_path: returning path");
    path
}
