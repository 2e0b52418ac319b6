use crate::context::StoreContext;
use crate::error::CliResult;
use crate::input;
use crate::output;
use gsi_manager::{Reconciler, WaitConfig};
use std::path::Path;
use std::time::Duration;

pub async fn run(
    event: Option<&Path>,
    wait_timeout_secs: u64,
    ctx: &StoreContext,
) -> CliResult<()> {
    let event = input::read_event(event)?;
    let request = event.to_request()?;

    let wait = WaitConfig {
        timeout: Duration::from_secs(wait_timeout_secs),
        ..WaitConfig::default()
    };
    let reconciler = Reconciler::new(ctx.store()).with_wait_config(wait);

    let result = reconciler.reconcile_to_completion(&request).await;
    // Mutations issued before a failure are real; keep the fixture in step.
    ctx.persist()?;
    let summary = result?;

    println!("{}", output::format_json(&summary));
    Ok(())
}
