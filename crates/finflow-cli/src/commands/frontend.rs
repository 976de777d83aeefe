use anyhow::{Context, Result};

use crate::context::AppContext;

pub async fn run(ctx: &AppContext) -> Result<()> {
    let orchestrator = ctx.orchestrator();
    let stack = ctx.stack();

    orchestrator
        .start_service(&stack.frontend_install())
        .await
        .context("Installing frontend dependencies failed")?;
    orchestrator
        .start_service(&stack.frontend_dev())
        .await
        .context("Frontend dev server failed")?;
    Ok(())
}
