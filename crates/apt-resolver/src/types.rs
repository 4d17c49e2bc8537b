//! Resolver-facing types: actions, reasons, and the caller's callback
//! decision (§4.3).

use apt_cache::DependencyType;
use apt_depgraph::ElementId;

/// A single-element change proposed against a broken constraint (§4.3
/// "Action generation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Install (or keep) the version this element represents.
    InstallVersion {
        /// The target version element.
        element: ElementId,
    },
    /// Remove the package this element's `absent` variant belongs to.
    Remove {
        /// The target `absent` version element.
        element: ElementId,
    },
    /// Accept a soft relation or non-must user request as permanently
    /// unsatisfied, at a fixed score cost.
    AcceptUnsatisfied {
        /// The `UnsatisfiedElement` being accepted.
        element: ElementId,
    },
}

impl Action {
    /// The element this action ultimately assigns (installs, removes,
    /// or accepts).
    #[must_use]
    pub const fn element(self) -> ElementId {
        match self {
            Self::InstallVersion { element } | Self::Remove { element } | Self::AcceptUnsatisfied { element } => {
                element
            }
        }
    }
}

/// Why an element ended up in the final assignment, for a "why" display
/// (§4.3 "Reasons").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// Pulled in by a forward dependency.
    Depends {
        /// The package whose relation pulled this in.
        from_package: String,
        /// Which relation type.
        dependency_type: DependencyType,
    },
    /// Pushed away by an anti-dependency.
    Conflicts {
        /// The package whose relation pushed this away.
        from_package: String,
        /// `Conflicts` or `Breaks`.
        dependency_type: DependencyType,
    },
    /// Required to keep a sibling binary's source version in sync.
    Synchronise {
        /// The sibling package this element must match.
        with_package: String,
    },
    /// Named directly on the command line.
    ManuallyRequested,
    /// Removed by the auto-removal pass (no longer reachable and
    /// eligible).
    AutomaticRemoval,
    /// A soft obligation accepted as permanently unsatisfied.
    UnsatisfiedAccepted,
}

/// What the search driver does with a just-validated solution (§4.3
/// "The callback").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Use this solution; stop searching.
    Accept,
    /// Reject this solution but keep searching the remaining pool.
    Decline,
    /// Stop searching entirely and fail.
    Abandon,
}
