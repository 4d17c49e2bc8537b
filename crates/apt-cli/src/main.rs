//! `apt-rs` - a thin front door over the resolver/scheduler/fetcher
//! core, for manual smoke-testing of the workspace (§1, §9 "Front
//! ends").

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod commands;

use anyhow::Result;
use clap::Parser;
pub use commands::{Cli, Commands};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Load the configuration: the optional `--config-file` TOML
/// document, falling back to `Config::default` for anything it omits
/// or if no file was given (§9 "Configuration").
pub fn load_config(cli: &Cli) -> Result<apt_config::Config> {
    match &cli.config_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
            Ok(apt_config::load_toml(&text)?)
        }
        None => Ok(apt_config::Config::default()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::builder().with_default_directive(tracing::Level::WARN.into()).with_env_var("APT_LOG").from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start runtime: {e}");
            return ExitCode::from(255);
        }
    };

    match runtime.block_on(dispatch(&cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("apt-rs: {e:?}");
            ExitCode::FAILURE
        }
    }
}

/// Dispatch to the matched subcommand (§4.3-§4.5).
async fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Update(args) => commands::update::run(cli, args).await,
        Commands::Install(args) => commands::install::run(cli, args),
        Commands::Remove(args) => commands::remove::run(cli, args),
        Commands::Show(args) => commands::show::run(cli, args),
    }
}
