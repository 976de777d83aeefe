use anyhow::{Context, Result};
use finflow_core::rotation::{Clock, SystemClock};
use finflow_core::{AuthChallenge, TotpGenerator};

use crate::cli::TotpArgs;
use crate::context::AppContext;

pub fn run(ctx: &AppContext, args: TotpArgs) -> Result<()> {
    let env_file = ctx.resolve(args.env_file.as_deref().unwrap_or(&ctx.config.rotation.env_file));
    let challenge = AuthChallenge::from_env_file(&env_file).context("Cannot load provider credentials")?;
    let generator = TotpGenerator::new(&challenge.mfa_secret)?;

    let now = SystemClock.now();
    println!("{}", generator.code_at(now));
    eprintln!("valid for {}s", generator.remaining(now).as_secs());
    Ok(())
}
