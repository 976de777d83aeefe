use anyhow::{Context, Result};

use crate::commands::{backend, switch};
use crate::context::AppContext;

/// Full local development session
pub async fn run(ctx: &AppContext) -> Result<()> {
    switch::activate(ctx, "dev")?;
    backend::restart(ctx).await?;

    let orchestrator = ctx.orchestrator();
    let stack = ctx.stack();
    let services = [stack.edge_functions(), stack.frontend_dev()];

    let mut handles = orchestrator
        .restart_local_stack(&services)
        .await
        .context("Local stack failed")?;

    // The frontend has exited; take the edge functions down with it
    for handle in handles.iter_mut() {
        orchestrator.stop_service(handle).await;
    }
    Ok(())
}
