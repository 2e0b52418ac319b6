use crate::context::StoreContext;
use crate::error::CliResult;
use crate::input;
use crate::output;
use gsi_manager::LifecycleHandler;
use std::path::Path;

pub async fn run(event: Option<&Path>, ctx: &StoreContext) -> CliResult<()> {
    let event = input::read_event(event)?;
    let handler = LifecycleHandler::new(ctx.store());

    let response = handler.is_complete(&event).await?;
    ctx.persist()?;

    if !response.is_complete {
        tracing::info!("Reconciliation still in progress; poll again");
    }
    println!("{}", output::format_json(&response));
    Ok(())
}
