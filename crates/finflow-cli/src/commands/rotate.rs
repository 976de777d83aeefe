use std::sync::Arc;

use anyhow::{Context, Result};
use finflow_core::secrets::SharedSecretStore;
use finflow_core::{
    AuthChallenge, CancellationToken, CliSecretStore, MemorySecretStore, MonarchProvider,
    RotationEngine, SecretPublisher,
};
use tracing::warn;

use crate::cli::RotateArgs;
use crate::context::AppContext;

pub async fn run(ctx: &AppContext, args: RotateArgs) -> Result<()> {
    let settings = &ctx.config.rotation;
    let env_file = ctx.resolve(args.env_file.as_deref().unwrap_or(&settings.env_file));
    let secret_name = args.secret_name.unwrap_or_else(|| settings.secret_name.clone());

    let challenge = AuthChallenge::from_env_file(&env_file).context("Cannot load provider credentials")?;

    let provider = MonarchProvider::new(&ctx.config.provider, ctx.logger.clone())?;
    let store: SharedSecretStore = if args.dry_run {
        Arc::new(MemorySecretStore::new())
    } else {
        Arc::new(CliSecretStore::new(&ctx.config.secrets.program).in_dir(&ctx.root))
    };
    let publisher = SecretPublisher::from_settings(store, ctx.logger.clone(), &ctx.config.secrets);

    let engine = RotationEngine::new(Arc::new(provider), publisher, ctx.logger.clone())
        .with_settings(settings)
        .with_lock_dir(ctx.state_dir());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; cancelling rotation");
            on_interrupt.cancel();
        }
    });

    let report = engine
        .rotate_and_publish(&challenge, &secret_name, &cancel)
        .await
        .context("Token rotation failed")?;

    println!(
        "Rotated {} ({}) via {}, published to {} store at {}",
        report.secret_name,
        report.token_preview,
        report.provider,
        report.store,
        report.issued_at.to_rfc3339()
    );
    if args.dry_run {
        println!("Dry run: nothing was published to the real secret store");
    }
    Ok(())
}
