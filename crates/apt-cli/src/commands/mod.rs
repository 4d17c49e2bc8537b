//! Subcommands for the `apt-rs` front door.

pub mod cache;
pub mod install;
pub mod plan;
pub mod remove;
pub mod show;
pub mod update;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A minimal, runnable front door over the resolver/scheduler/fetcher
/// core. Argument- and config-file parsing are kept deliberately thin
/// here: the workspace's scope is the solver and fetcher engines, not
/// a full `apt`-compatible CLI surface.
#[derive(Parser, Debug)]
#[command(name = "apt-rs")]
#[command(version)]
#[command(about = "Debian-family package manager core: resolver, scheduler, fetcher", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Directory holding downloaded `Release`/index files
    /// (`lists/lock` is acquired here during `update`).
    #[arg(long, global = true, env = "APT_RS_LISTS_DIR", default_value = "/var/lib/apt/lists")]
    pub lists_dir: PathBuf,

    /// `dpkg` status file to seed the installed-package set.
    #[arg(long, global = true, env = "APT_RS_STATUS_FILE", default_value = "/var/lib/dpkg/status")]
    pub status_file: PathBuf,

    /// Directory `.deb` archives are downloaded into.
    #[arg(long, global = true, env = "APT_RS_ARCHIVES_DIR", default_value = "/var/cache/apt/archives")]
    pub archives_dir: PathBuf,

    /// Optional TOML configuration file overriding resolver/downloader/
    /// worker defaults.
    #[arg(long, global = true, env = "APT_RS_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh repository metadata (`Release`/index files).
    Update(update::UpdateArgs),
    /// Resolve and preview installing the given packages.
    Install(install::InstallArgs),
    /// Resolve and preview removing the given packages.
    Remove(remove::RemoveArgs),
    /// Print cached metadata for one package.
    Show(show::ShowArgs),
}
