use clap::Parser;
use gsi_manager_cli::cli::Cli;
use gsi_manager_cli::error::exit_with_error;
use tracing_subscriber::EnvFilter;

/// Log filter for one invocation. Responses are JSON on stdout, so engine logs
/// stay off unless asked for and always go to stderr.
fn log_filter(cli: &Cli) -> EnvFilter {
    match (cli.quiet, cli.verbose) {
        (true, _) => EnvFilter::new("off"),
        // RUST_LOG narrows --verbose, e.g. `gsi_manager::store=debug`
        (false, true) => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gsi_manager=info,gsi_manager_cli=info")),
        (false, false) => EnvFilter::new("off"),
    }
}

fn init_tracing(cli: &Cli, color: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(cli))
        .with_ansi(color)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let color = !(cli.no_color || std::env::var_os("NO_COLOR").is_some());
    if !color {
        colored::control::set_override(false);
    }

    init_tracing(&cli, color);

    if let Err(e) = gsi_manager_cli::run(cli).await {
        exit_with_error(e);
    }
}
