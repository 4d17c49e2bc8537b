//! `apt-rs install` — resolve and preview installing packages (§4.3).

use super::cache;
use super::plan::{resolve_and_schedule, Request};
use crate::Cli;
use anyhow::Result;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Packages to install, optionally with a version constraint
    /// (e.g. `libssl3` or `"libssl3 (>= 3.0)"`).
    #[arg(required = true)]
    pub packages: Vec<String>,
}

pub fn run(cli: &Cli, args: &InstallArgs) -> Result<()> {
    let config = Arc::new(crate::load_config(cli)?);
    let pkg_cache = cache::load(&cli.lists_dir, &cli.status_file, Arc::clone(&config))?;

    let requests: Vec<Request> = args.packages.iter().map(|p| Request { token: p.clone(), inverted: false }).collect();

    resolve_and_schedule(&pkg_cache, &config, &requests)?;
    Ok(())
}
