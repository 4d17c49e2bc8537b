//! Inner actions, the ordering graph's edge/node payloads, and the
//! resolver-facing "actions preview" the scheduler consumes (§3, §4.4).

use apt_cache::{BinaryVersion, DependencyType};
use std::sync::Arc;

/// A handle into the ordering graph. `petgraph::stable_graph` keeps
/// these stable across node removal, which step 4 (virtual node
/// deletion) relies on.
pub type ActionId = petgraph::stable_graph::NodeIndex;

/// One of the three atomic dpkg operations a package can undergo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Remove an installed version.
    Remove,
    /// Unpack a new version's files.
    Unpack,
    /// Run a version's postinst / configure step.
    Configure,
}

impl ActionKind {
    /// Base priority before the "unpack-after-removal" bonus (§4.4
    /// step 1).
    #[must_use]
    pub const fn base_priority(self) -> i32 {
        match self {
            Self::Remove => -5,
            Self::Unpack => -2,
            Self::Configure => 3,
        }
    }
}

/// One atomic action against a single package version (§3
/// "InnerAction").
#[derive(Debug, Clone)]
pub struct InnerAction {
    /// The package this action acts on.
    pub package_name: String,
    /// The version involved: the version being removed for `Remove`,
    /// the version being installed for `Unpack`/`Configure`.
    pub version: Arc<BinaryVersion>,
    /// Which operation this is.
    pub kind: ActionKind,
    /// Synthetic boundary node used only during step 4's virtual
    /// unchanged-package injection; never appears in a final plan.
    pub fake: bool,
    /// Sort-stabilising priority (§4.4 step 1).
    pub priority: i32,
    /// The action this one is linked after (same package, earlier
    /// canonical-order step), if step 2 or step 5 merged them.
    pub linked_from: Option<ActionId>,
    /// The action this one is linked before.
    pub linked_to: Option<ActionId>,
}

/// Edge strength classes, weakest to strongest (§4.4 step 6). Multiple
/// dependency edges between the same SCC may coexist at different
/// classes; cycle breaking drops the weakest class present first.
/// Derive order gives the ladder for free via `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeClass {
    /// Intra-package priority-only edges (no dependency semantics).
    Priority,
    /// Edges multiplied through a step-4 virtual node.
    FromVirtual,
    /// Recommends/Suggests-derived ordering (not produced by §4.4's
    /// hard-dependency edges today, reserved for soft-ordering hints).
    Soft,
    /// `Breaks`-derived edges.
    Medium,
    /// `Depends`/`Pre-Depends`/`Conflicts`-derived edges.
    Hard,
    /// Structural intra-package edges (Remove/Unpack/Configure order,
    /// pseudo-essential co-location); never dropped.
    Fundamental,
}

impl EdgeClass {
    /// The `dpkg` force flag that must be added to a group when an edge
    /// of this class, carrying `dependency_type`, is dropped during
    /// cycle splitting.
    #[must_use]
    pub fn force_flag(self, dependency_type: Option<DependencyType>) -> Option<&'static str> {
        match (self, dependency_type) {
            (Self::Medium, _) => Some("--force-breaks"),
            (Self::Hard, Some(DependencyType::Conflicts)) => Some("--force-conflicts"),
            (Self::Hard, _) => Some("--force-depends"),
            _ => None,
        }
    }
}

/// One edge of the ordering graph: "the source action must complete
/// before the target action" (§4.4 step 3).
#[derive(Debug, Clone)]
pub struct EdgeAttribute {
    /// Which relation type produced this edge, if any (structural edges
    /// have none).
    pub dependency_type: Option<DependencyType>,
    /// Human-readable relation expression this edge encodes, for
    /// diagnostics.
    pub relation_description: Option<String>,
    /// True if this edge encodes the "after" direction of an
    /// anti-dependency (Conflicts/Breaks), i.e. re-creation must follow
    /// removal rather than precede it.
    pub is_reverse: bool,
    /// True if this edge was produced by multiplying through a step-4
    /// virtual node rather than directly from a relation.
    pub is_from_virtual: bool,
    /// Which class this edge belongs to for cycle-splitting purposes.
    pub class: EdgeClass,
}

impl EdgeAttribute {
    /// A structural intra-package edge (canonical-order or
    /// pseudo-essential co-location); never weakened.
    #[must_use]
    pub const fn fundamental() -> Self {
        Self {
            dependency_type: None,
            relation_description: None,
            is_reverse: false,
            is_from_virtual: false,
            class: EdgeClass::Fundamental,
        }
    }

    /// A dependency-derived edge of the given class.
    #[must_use]
    pub fn relation(dependency_type: DependencyType, description: String, is_reverse: bool, class: EdgeClass) -> Self {
        Self {
            dependency_type: Some(dependency_type),
            relation_description: Some(description),
            is_reverse,
            is_from_virtual: false,
            class,
        }
    }

    /// Derive the edge this one would become if multiplied through a
    /// step-4 virtual node: same dependency type, flagged as
    /// virtual-derived, demoted to the `FromVirtual` class (weaker than
    /// any directly observed dependency edge, per step 6's ladder).
    #[must_use]
    pub fn through_virtual(&self) -> Self {
        let mut clone = self.clone();
        clone.is_from_virtual = true;
        clone.class = EdgeClass::FromVirtual;
        clone
    }
}

/// A previewed per-package change, the scheduler's primary input
/// (§4.4 "Inputs").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Newly installed, nothing previously installed.
    Install,
    /// Installed version replaced by a newer one.
    Upgrade,
    /// Installed version replaced by an older one.
    Downgrade,
    /// Removed, configuration files deleted too.
    Remove,
    /// Removed and configuration files purged.
    Purge,
    /// Same version reinstalled (e.g. to repair a broken unpack).
    Reinstall,
    /// Configure-only (e.g. completing an interrupted install).
    Configure,
    /// Deconfigure-only (no unpack/remove follows in this run).
    Deconfigure,
    /// Only pending triggers need to be processed.
    ProcessTriggers,
    /// Flip the automatically-installed bit on, no version change.
    Markauto,
    /// Flip the automatically-installed bit off, no version change.
    Unmarkauto,
}

impl ChangeKind {
    /// Whether this change kind produces any `InnerAction` at all;
    /// `Markauto`/`Unmarkauto` only touch extended-state bookkeeping.
    #[must_use]
    pub const fn produces_actions(self) -> bool {
        !matches!(self, Self::Markauto | Self::Unmarkauto)
    }
}

/// One package's previewed change plus its old/new version, if any.
#[derive(Debug, Clone)]
pub struct PackageChange {
    /// The package being changed.
    pub package_name: String,
    /// What kind of change this is.
    pub kind: ChangeKind,
    /// The version currently installed, if any.
    pub old_version: Option<Arc<BinaryVersion>>,
    /// The version to end up installed, if any (absent for `Remove`/
    /// `Purge`).
    pub new_version: Option<Arc<BinaryVersion>>,
}

/// The full previewed change set handed to the scheduler.
pub type ActionsPreview = Vec<PackageChange>;

/// An ordered run of inner actions executed as one dpkg invocation
/// (§3 "InnerActionGroup").
#[derive(Debug, Clone, Default)]
pub struct InnerActionGroup {
    /// The actions, in execution order.
    pub actions: Vec<ActionId>,
    /// `dpkg` force flags this group's cycle-breaking required.
    pub dpkg_flags: Vec<&'static str>,
    /// Whether the next group is a logical continuation that must stay
    /// in the same changeset.
    pub continued: bool,
}

/// A contiguous run of action groups bracketed by an empty
/// "unpacked-but-not-configured" set, plus the downloads it needs first
/// (§3 "Changeset").
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    /// The action groups, in execution order.
    pub groups: Vec<InnerActionGroup>,
    /// Archive downloads this changeset needs before it can run.
    pub downloads: Vec<Arc<BinaryVersion>>,
}
