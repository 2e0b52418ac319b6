use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gsi-manager",
    about = "Reconcile DynamoDB global secondary indexes against a declared set",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Where index state is read from and written to
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// AWS region (uses the SDK default chain if not specified)
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// DynamoDB endpoint override (e.g. DynamoDB Local)
    #[arg(long, global = true)]
    pub endpoint_url: Option<String>,

    /// Per-request timeout for DynamoDB calls, in milliseconds
    #[arg(long, global = true)]
    pub request_timeout_ms: Option<u64>,

    /// Simulate the store with a JSON fixture instead of DynamoDB.
    /// The fixture is rewritten with the resulting state after each command.
    #[arg(long, global = true, conflicts_with_all = ["region", "endpoint_url"])]
    pub fixture: Option<PathBuf>,
}

/// Lifecycle event input
#[derive(Args, Debug, Clone)]
pub struct EventArgs {
    /// Path to the lifecycle event JSON (reads stdin when omitted)
    #[arg(long, short = 'e')]
    pub event: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the operations an event would run, without changing anything
    Plan {
        #[command(flatten)]
        input: EventArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: PlanFormat,
    },

    /// Begin a reconciliation, issuing at most one index mutation
    Start {
        #[command(flatten)]
        input: EventArgs,
    },

    /// Advance a reconciliation, issuing at most one index mutation
    Poll {
        #[command(flatten)]
        input: EventArgs,
    },

    /// Reconcile to completion, waiting for each mutation to finish
    Apply {
        #[command(flatten)]
        input: EventArgs,

        /// Give up on any single wait after this many seconds
        #[arg(long, default_value_t = 900)]
        wait_timeout_secs: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Table,
    Json,
}
