use anyhow::{bail, Result};
use finflow_core::profiles::Activation;
use finflow_core::{ProfileError, ProfileName};
use tracing::{info, warn};

use crate::commands::backend;
use crate::context::AppContext;

pub async fn run(ctx: &AppContext, profile: &str, restart: bool) -> Result<()> {
    let activation = activate(ctx, profile)?;

    if !restart {
        return Ok(());
    }

    match activation.profile {
        ProfileName::Dev => backend::restart(ctx).await?,
        ProfileName::Prod => {
            let orchestrator = ctx.orchestrator();
            orchestrator.run_best_effort(&ctx.stack().backend_stop()).await;
            print_deploy_hints();
        }
    }
    Ok(())
}

/// Activate `profile`, rolling back on a partial activation
pub fn activate(ctx: &AppContext, profile: &str) -> Result<Activation> {
    let store = ctx.profile_store();
    match store.activate(profile) {
        Ok(activation) => {
            println!("Switched to {} environment", activation.profile);
            Ok(activation)
        }
        Err(err @ ProfileError::PartialActivation { .. }) => {
            warn!("{}", err);
            match store.rollback() {
                Ok(outcome) => {
                    info!(
                        "Rolled back: {} restored, {} removed",
                        outcome.restored.len(),
                        outcome.removed.len()
                    );
                    bail!("{}; previous files were restored", err)
                }
                Err(rollback_err) => bail!("{}; rollback also failed: {}", err, rollback_err),
            }
        }
        Err(err) => Err(err.into()),
    }
}

fn print_deploy_hints() {
    println!();
    println!("Production profile is active. Next steps:");
    println!("  1. Build the frontend:        npm run build");
    println!("  2. Preview the build:         npm run preview");
    println!("  3. Deploy edge functions:     supabase functions deploy refresh-accounts chase-balance transactions-review");
    println!("  4. Push to deploy:            git push origin main");
}
