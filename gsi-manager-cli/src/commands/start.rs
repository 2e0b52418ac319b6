use crate::context::StoreContext;
use crate::error::CliResult;
use crate::input;
use crate::output;
use gsi_manager::LifecycleHandler;
use std::path::Path;

pub async fn run(event: Option<&Path>, ctx: &StoreContext) -> CliResult<()> {
    let event = input::read_event(event)?;
    let handler = LifecycleHandler::new(ctx.store());

    let response = handler.on_event(&event).await?;
    ctx.persist()?;

    println!("{}", output::format_json(&response));
    Ok(())
}
