use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "finflow")]
#[command(version, about = "Finflow - switch environment profiles, run the local stack and rotate provider tokens")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, env = "FINFLOW_ROOT")]
    pub root: Option<PathBuf>,

    /// Config file (defaults to <root>/finflow.yaml)
    #[arg(long, global = true, env = "FINFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Activate a profile and restart (dev) or stop (prod) the local backend
    Switch(SwitchArgs),

    /// Activate dev and run backend, edge functions and the frontend dev server
    Dev,

    /// Restart the local backend only
    Backend,

    /// Install frontend dependencies and run the dev server
    Frontend,

    /// Log in to the provider, refresh, and publish the new session token
    Rotate(RotateArgs),

    /// Print the current one-time code
    Totp(TotpArgs),

    /// Show the active profile and whether the target files still match it
    Status,

    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Profile to activate (dev or prod)
    pub profile: String,

    /// Only swap files; leave local services alone
    #[arg(long)]
    pub no_restart: bool,
}

#[derive(Args, Debug)]
pub struct RotateArgs {
    /// Env file with the provider login (defaults to rotation.env_file)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Secret name to publish under (defaults to rotation.secret_name)
    #[arg(long)]
    pub secret_name: Option<String>,

    /// Publish into an in-memory store instead of the real one
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct TotpArgs {
    /// Env file with the MFA secret (defaults to rotation.env_file)
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}
