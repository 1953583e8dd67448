use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "rlt",
    version,
    about = "Terminal client for managing devboxes, blueprints and snapshots."
)]
pub struct CliArgs {
    /// List auto-refresh interval in milliseconds
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Detail polling interval in milliseconds while a resource is changing state
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Open this screen first (for example: devbox-list, bp-detail, dbx)
    #[arg(long)]
    pub screen: Option<String>,

    /// Resource id for the initial screen
    #[arg(long)]
    pub id: Option<String>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}
