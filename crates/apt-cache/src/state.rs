//! `SystemState`: the installed-package status table (§3).

use ahash::AHashMap;

/// dpkg package status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not installed at all.
    NotInstalled,
    /// Removed but configuration files remain.
    ConfigFiles,
    /// Partially installed (interrupted unpack).
    HalfInstalled,
    /// Unpacked but not yet configured.
    Unpacked,
    /// Partially configured (interrupted configure).
    HalfConfigured,
    /// Waiting on another package's triggers.
    TriggersAwaited,
    /// Has pending triggers of its own.
    TriggersPending,
    /// Fully installed and configured.
    Installed,
}

impl Status {
    /// Whether dpkg considers the package "present" in any form (i.e.
    /// it occupies a directory entry dpkg must account for).
    #[must_use]
    pub const fn is_present(self) -> bool {
        !matches!(self, Self::NotInstalled)
    }
}

/// The user's recorded "want" state (`dpkg --get-selections`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Want {
    /// No explicit preference recorded.
    #[default]
    Unknown,
    /// User wants this installed.
    Install,
    /// User wants this held at its current version.
    Hold,
    /// User wants this removed (config files may remain).
    Deinstall,
    /// User wants this purged (config files removed too).
    Purge,
}

/// Whether dpkg requires reinstallation to recover (set after a failed
/// removal of an essential/required package, §4.4 "removal force
/// flags").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Flag {
    /// Normal.
    #[default]
    Ok,
    /// dpkg refuses to finish removing this without `--force-remove-reinstreq`.
    Reinstreq,
}

/// One package's recorded installed-state entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateEntry {
    /// dpkg status.
    pub status: Status,
    /// Recorded want.
    pub want: Want,
    /// Recorded flag.
    pub flag: Flag,
    /// Whether this package was recorded as automatically installed
    /// (extended-states `Auto-Installed: 1`, §6).
    pub automatically_installed: bool,
}

impl Default for Status {
    fn default() -> Self {
        Self::NotInstalled
    }
}

/// The full installed-package status table, keyed by package name.
#[derive(Debug, Clone, Default)]
pub struct SystemState {
    entries: AHashMap<String, StateEntry>,
}

impl SystemState {
    /// An empty system state (a freshly debootstrapped system, or a
    /// from-scratch simulation).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite a package's state.
    pub fn set(&mut self, package_name: impl Into<String>, entry: StateEntry) {
        self.entries.insert(package_name.into(), entry);
    }

    /// Look up a package's recorded state.
    #[must_use]
    pub fn get(&self, package_name: &str) -> Option<&StateEntry> {
        self.entries.get(package_name)
    }

    /// Whether `package_name` is currently installed (`Status::Installed`
    /// or any of the partially-installed statuses that still occupy a
    /// directory entry).
    #[must_use]
    pub fn is_present(&self, package_name: &str) -> bool {
        self.entries
            .get(package_name)
            .is_some_and(|e| e.status.is_present())
    }

    /// Iterate all recorded entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
