mod cli;
mod commands;
mod context;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, Commands};
use crate::context::AppContext;

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit with 1, not clap's default of 2
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::load(&cli)?;

    match cli.command {
        Commands::Switch(args) => commands::switch::run(&ctx, &args.profile, !args.no_restart).await,
        Commands::Dev => commands::dev::run(&ctx).await,
        Commands::Backend => commands::backend::run(&ctx).await,
        Commands::Frontend => commands::frontend::run(&ctx).await,
        Commands::Rotate(args) => commands::rotate::run(&ctx, args).await,
        Commands::Totp(args) => commands::totp::run(&ctx, args),
        Commands::Status => commands::status::run(&ctx),
        Commands::Config => commands::config::run(&ctx),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("FINFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}
