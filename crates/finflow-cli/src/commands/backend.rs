use anyhow::{Context, Result};

use crate::context::AppContext;

pub async fn run(ctx: &AppContext) -> Result<()> {
    restart(ctx).await
}

/// `stop` (failure ignored) then `start`
pub async fn restart(ctx: &AppContext) -> Result<()> {
    let orchestrator = ctx.orchestrator();
    let stack = ctx.stack();

    orchestrator.run_best_effort(&stack.backend_stop()).await;
    orchestrator
        .start_service(&stack.backend_start())
        .await
        .context("Local backend failed to start")?;
    println!("Local backend is running");
    Ok(())
}
