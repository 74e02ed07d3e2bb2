//! CLI argument definitions.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Manage the Unicorn admin dashboard session from the terminal.
#[derive(Parser, Debug)]
#[command(name = "unicorn-admin")]
#[command(author, version = env!("UNICORN_ADMIN_VERSION"), about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Dashboard backend base URL
    #[arg(
        long,
        env = "UNICORN_API_URL",
        default_value = "http://localhost:8080",
        global = true
    )]
    pub api_url: String,

    /// Directory holding the stored session
    #[arg(long, env = "UNICORN_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
