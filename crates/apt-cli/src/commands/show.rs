//! `apt-rs show` — print cached metadata for one package (§4.1).

use super::cache;
use crate::Cli;
use anyhow::{bail, Result};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Package name to look up.
    pub package: String,
}

pub fn run(cli: &Cli, args: &ShowArgs) -> Result<()> {
    let config = Arc::new(crate::load_config(cli)?);
    let pkg_cache = cache::load(&cli.lists_dir, &cli.status_file, config)?;

    let Some(package) = pkg_cache.get_binary_package(&args.package) else {
        bail!("no such package: {}", args.package);
    };

    println!("Package: {}", package.name);
    if let Some(installed) = &package.installed {
        println!("Installed: {}", installed.version);
    } else {
        println!("Installed: (none)");
    }

    for version in &package.versions {
        let pin = pkg_cache.get_pin(version);
        println!();
        println!("Version: {}", version.version);
        println!("Architecture: {}", version.architecture);
        println!("Priority: {:?}", version.priority);
        println!("Pin-Priority: {pin}");
        println!("Essential: {}", version.essential);
        if let Some(desc) = &version.description {
            println!("Description: {desc}");
        }
        for (dep_type, line) in &version.relations {
            let rendered: Vec<String> = line
                .expressions
                .iter()
                .map(|expr| {
                    expr.alternatives
                        .iter()
                        .map(|r| {
                            if r.version.is_empty() {
                                r.package_name.clone()
                            } else {
                                format!("{} ({} {})", r.package_name, r.op.as_str(), r.version)
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .collect();
            println!("{dep_type:?}: {}", rendered.join(", "));
        }
    }

    Ok(())
}
