//! GSI manager CLI library.
//!
//! Types, command handlers, and output helpers behind the `gsi-manager`
//! binary. Each subcommand reads one lifecycle event and runs it against
//! either DynamoDB or a JSON fixture standing in for it.

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod input;
pub mod output;

use cli::{Cli, Commands};
use context::StoreContext;

/// Dispatch a parsed [`Cli`] to the matching command handler.
pub async fn run(cli: Cli) -> error::CliResult<()> {
    let ctx = StoreContext::build(&cli.store).await?;

    match cli.command {
        Commands::Plan { input, format } => {
            commands::plan::run(input.event.as_deref(), format, &ctx).await
        }
        Commands::Start { input } => commands::start::run(input.event.as_deref(), &ctx).await,
        Commands::Poll { input } => commands::poll::run(input.event.as_deref(), &ctx).await,
        Commands::Apply {
            input,
            wait_timeout_secs,
        } => commands::apply::run(input.event.as_deref(), wait_timeout_secs, &ctx).await,
    }
}
