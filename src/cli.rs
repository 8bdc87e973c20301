use clap::{Parser, Subcommand};

/// issuecast — announce new tracker issues in a chat channel
#[derive(Parser, Debug, Clone)]
#[command(name = "issuecast", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    /// Tracker status id to poll (default: 1, "new")
    #[arg(long, global = true)]
    pub status: Option<u32>,

    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Directory holding the watermark store
    #[arg(long)]
    pub state_dir: Option<String>,

    /// Minimum delay between two sent messages, in milliseconds
    #[arg(long = "send-interval-ms")]
    pub send_interval_ms: Option<u64>,

    /// Log file path (size-rotated)
    #[arg(long)]
    pub log_file: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List the issue statuses known to the tracker
    Statuses,

    /// Print the last announced issue id for the selected status
    Watermark,
}
