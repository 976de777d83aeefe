use anyhow::Result;

use crate::context::AppContext;

pub fn run(ctx: &AppContext) -> Result<()> {
    print!("{}", ctx.config.to_yaml()?);
    Ok(())
}
