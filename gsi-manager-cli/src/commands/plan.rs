use crate::cli::PlanFormat;
use crate::context::StoreContext;
use crate::error::CliResult;
use crate::input;
use crate::output;
use gsi_manager::Reconciler;
use std::path::Path;

pub async fn run(event: Option<&Path>, format: PlanFormat, ctx: &StoreContext) -> CliResult<()> {
    let event = input::read_event(event)?;
    let request = event.to_request()?;

    let preview = Reconciler::new(ctx.store()).preview(&request).await?;
    println!("{}", output::format_preview(&preview, format));
    Ok(())
}
