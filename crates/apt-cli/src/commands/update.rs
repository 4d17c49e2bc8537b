//! `apt-rs update` — refresh repository metadata (§4.5.1).

use crate::Cli;
use anyhow::{Context, Result};
use apt_fetch::{MetadataUpdater, RepositoryEntry};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// A `sources.list`-style entry: `deb <uri> <distribution>
    /// [component...]`. May be given multiple times; defaults to
    /// Debian's `bookworm main` if omitted.
    #[arg(long = "source", value_name = "LINE")]
    pub sources: Vec<String>,

    /// Architectures to fetch binary indexes for.
    #[arg(long, default_value = "amd64")]
    pub architecture: Vec<String>,

    /// Languages to fetch `Translation-*` indexes for.
    #[arg(long, default_value = "en")]
    pub language: Vec<String>,

    /// Skip GPG verification for every listed repository.
    #[arg(long)]
    pub trusted: bool,

    /// PEM/armored OpenPGP keyring used to verify `Release`/`InRelease`
    /// files.
    #[arg(long)]
    pub keyring: Option<PathBuf>,
}

/// Parse one `deb <uri> <distribution> [component...]` line.
fn parse_source_line(line: &str, architectures: &[String], languages: &[String], trusted: bool) -> Result<RepositoryEntry> {
    let mut tokens = line.split_whitespace();
    let kind = tokens.next().context("empty source line")?;
    anyhow::ensure!(kind == "deb", "unsupported source line kind {kind:?} (only \"deb\" is supported)");
    let base_uri = tokens.next().context("source line missing URI")?.to_string();
    let distribution = tokens.next().context("source line missing distribution")?.to_string();
    let components: Vec<String> = tokens.map(str::to_string).collect();
    let components = if components.is_empty() { vec!["main".to_string()] } else { components };

    Ok(RepositoryEntry {
        label: format!("{base_uri} {distribution}"),
        base_uri,
        distribution,
        components,
        architectures: architectures.to_vec(),
        languages: languages.to_vec(),
        trusted,
    })
}

pub async fn run(cli: &Cli, args: &UpdateArgs) -> Result<()> {
    let config = crate::load_config(cli)?;

    let default_source = "deb http://deb.debian.org/debian bookworm main".to_string();
    let lines: &[String] = if args.sources.is_empty() { std::slice::from_ref(&default_source) } else { &args.sources };

    let repositories: Vec<RepositoryEntry> =
        lines.iter().map(|line| parse_source_line(line, &args.architecture, &args.language, args.trusted)).collect::<Result<_>>()?;

    let keyring = match &args.keyring {
        Some(path) => {
            let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            apt_fetch::Keyring::from_bytes(&data)?
        }
        None => apt_fetch::Keyring::empty(),
    };

    let updater = MetadataUpdater::new(cli.lists_dir.clone(), config.worker.clone(), keyring)?;
    let outcomes = updater.run(&repositories, &[], &[]).await?;

    let mut failed = false;
    for outcome in outcomes {
        match outcome.result {
            Ok(()) => println!("Hit {}", outcome.label),
            Err(e) => {
                failed = true;
                eprintln!("Err {} — {e}", outcome.label);
            }
        }
    }

    anyhow::ensure!(!failed, "one or more repositories failed to update");
    Ok(())
}
