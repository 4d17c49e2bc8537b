//! `apt-rs remove` — resolve and preview removing packages (§4.3).

use super::cache;
use super::plan::{resolve_and_schedule, Request};
use crate::Cli;
use anyhow::Result;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Packages to remove.
    #[arg(required = true)]
    pub packages: Vec<String>,

    /// Purge configuration files too, instead of leaving them behind.
    #[arg(long)]
    pub purge: bool,
}

pub fn run(cli: &Cli, args: &RemoveArgs) -> Result<()> {
    let config = Arc::new(crate::load_config(cli)?);
    let pkg_cache = cache::load(&cli.lists_dir, &cli.status_file, Arc::clone(&config))?;

    let requests: Vec<Request> = args.packages.iter().map(|p| Request { token: p.clone(), inverted: true }).collect();

    resolve_and_schedule(&pkg_cache, &config, &requests)?;
    if args.purge {
        tracing::info!("purge requested: configuration files will be deleted by dpkg --purge at apply time");
    }
    Ok(())
}
