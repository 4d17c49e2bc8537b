//! Builds a `PackageCache` from on-disk indexes and the `dpkg` status
//! file. Status-file parsing has no analogue in `apt-cache` (source-
//! list and status-file *syntax* are out of scope for the core per
//! spec §1) so it lives here, at the CLI glue layer.

use anyhow::{Context, Result};
use apt_cache::index::PackageCacheBuilder;
use apt_cache::release::ReleaseInfo;
use apt_cache::state::{Flag, Status, StateEntry, SystemState, Want};
use apt_cache::PackageCache;
use apt_config::Config;
use apt_core::rfc822;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Load every `*_Packages` file under `lists_dir` plus the `dpkg`
/// status file into a fresh `PackageCache`.
///
/// # Errors
/// Returns an error if the status file can't be read, or an index
/// file is unreadable (individual malformed stanzas are dropped with
/// a warning, per §7's parse-and-continue policy).
pub fn load(lists_dir: &Path, status_file: &Path, config: Arc<Config>) -> Result<PackageCache> {
    let mut builder = PackageCacheBuilder::new(config);

    if lists_dir.is_dir() {
        for entry in std::fs::read_dir(lists_dir).with_context(|| format!("reading {}", lists_dir.display()))? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with("_Packages") {
                continue;
            }
            let release = Arc::new(synthetic_release(&name));
            if let Err(e) = builder.add_binary_index(&entry.path(), release, "") {
                warn!(file = %name, error = %e, "failed to scan index file");
            }
        }
    } else {
        warn!(dir = %lists_dir.display(), "lists directory does not exist, cache will be empty");
    }

    if status_file.exists() {
        let local_release = Arc::new(synthetic_release("now"));
        builder
            .add_binary_index(status_file, local_release, "")
            .with_context(|| format!("reading {}", status_file.display()))?;

        let (state, installed) = parse_status(status_file)?;
        builder.set_system_state(state, &installed);
    }

    Ok(builder.build())
}

fn synthetic_release(label: &str) -> ReleaseInfo {
    ReleaseInfo {
        vendor: None,
        label: None,
        archive: Some(label.to_string()),
        codename: None,
        version: None,
        date: None,
        valid_until: None,
        not_automatic: false,
        but_automatic_upgrades: false,
        architectures: Vec::new(),
        component: "now".to_string(),
        base_uri: String::new(),
        entries: Vec::new(),
        verified: true,
    }
}

/// Parse `/var/lib/dpkg/status`'s `Status:`/`Auto-Installed:` fields
/// into a `SystemState` plus the `(package, version)` pairs to mark
/// installed (§6 "Extended states file").
fn parse_status(status_file: &Path) -> Result<(SystemState, Vec<(String, String)>)> {
    let data = std::fs::read(status_file).with_context(|| format!("reading {}", status_file.display()))?;
    let stanzas = rfc822::parse_all(data.as_slice()).with_context(|| format!("parsing {}", status_file.display()))?;

    let mut state = SystemState::new();
    let mut installed = Vec::new();

    for stanza in stanzas {
        let Some(name) = stanza.get("Package") else { continue };
        let Some(version) = stanza.get("Version") else { continue };

        let status = stanza.get("Status").map_or(Status::NotInstalled, parse_status_field);
        let flag = if stanza.get("Status").is_some_and(|s| s.contains("reinstreq")) {
            Flag::Reinstreq
        } else {
            Flag::Ok
        };
        let want = stanza.get("Status").map_or(Want::Unknown, parse_want_field);
        let automatically_installed = stanza.get("Auto-Installed").is_some_and(|v| v.trim() == "1");

        state.set(name.to_string(), StateEntry { status, want, flag, automatically_installed });
        if status == Status::Installed {
            installed.push((name.to_string(), version.to_string()));
        }
    }

    Ok((state, installed))
}

fn parse_want_field(status: &str) -> Want {
    match status.split_whitespace().next() {
        Some("install") => Want::Install,
        Some("hold") => Want::Hold,
        Some("deinstall") => Want::Deinstall,
        Some("purge") => Want::Purge,
        _ => Want::Unknown,
    }
}

fn parse_status_field(status: &str) -> Status {
    match status.split_whitespace().nth(2) {
        Some("installed") => Status::Installed,
        Some("config-files") => Status::ConfigFiles,
        Some("half-installed") => Status::HalfInstalled,
        Some("unpacked") => Status::Unpacked,
        Some("half-configured") => Status::HalfConfigured,
        Some("triggers-awaited") => Status::TriggersAwaited,
        Some("triggers-pending") => Status::TriggersPending,
        _ => Status::NotInstalled,
    }
}
