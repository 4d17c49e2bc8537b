//! The tagged-union element types that make up the dependency graph
//! (§4.2).

use apt_cache::{BinaryVersion, DependencyType};
use apt_core::version::RelationExpression;
use std::sync::Arc;

/// A handle into an `ElementGraph`'s arena. Cheap to copy, stable for
/// the lifetime of the graph it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl ElementId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// How strongly a user or inverted request binds (§4.3 "User-request
/// handling").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Importance {
    /// Nice to have; small penalty if left unsatisfied.
    Wish,
    /// Stronger than wish; large penalty if left unsatisfied.
    Try,
    /// Ordinary hard constraint.
    Must,
}

/// Which soft obligation an `UnsatisfiedElement` represents, used by
/// the resolver to look up the right score penalty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PenaltyKind {
    /// Unsatisfied `Recommends`.
    Recommends,
    /// Unsatisfied `Suggests`.
    Suggests,
    /// Soft synchronisation violation.
    Synchronisation,
    /// Unsatisfied `wish`-importance user/inverted request.
    Wish,
    /// Unsatisfied `try`-importance user/inverted request.
    Try,
}

/// A version element's concrete choice: either a real, installable
/// version, or the synthetic "not installed" variant of its package.
#[derive(Debug, Clone)]
pub enum VersionChoice {
    /// A real candidate version.
    Present(Arc<BinaryVersion>),
    /// The package is absent (not installed).
    Absent(String),
}

impl VersionChoice {
    /// The owning package's name, regardless of variant.
    #[must_use]
    pub fn package_name(&self) -> &str {
        match self {
            Self::Present(v) => &v.package_name,
            Self::Absent(name) => name,
        }
    }

    /// The version string, or `None` for the absent variant.
    #[must_use]
    pub fn version_string(&self) -> Option<&str> {
        match self {
            Self::Present(v) => Some(&v.version),
            Self::Absent(_) => None,
        }
    }
}

/// One concrete `(package, version)` choice, or the package's absence.
#[derive(Debug, Clone)]
pub struct VersionElement {
    /// The choice this element represents.
    pub choice: VersionChoice,
}

/// A forward dependency (`Pre-Depends`/`Depends`/`Recommends`/`Suggests`)
/// of some owning version, not yet known to be satisfied.
#[derive(Debug, Clone)]
pub struct RelationElement {
    /// The version element this relation belongs to.
    pub owner: ElementId,
    /// Which kind of relation this is.
    pub dependency_type: DependencyType,
    /// The relation expression itself (an OR-group of alternatives).
    pub expression: RelationExpression,
}

/// One package targeted by a `Conflicts`/`Breaks` anti-dependency of
/// some owning version.
#[derive(Debug, Clone)]
pub struct AntiRelationElement {
    /// The version element this anti-relation belongs to.
    pub owner: ElementId,
    /// `Conflicts` or `Breaks`.
    pub dependency_type: DependencyType,
    /// The conflicting package's name.
    pub target_package: String,
}

/// A same-source-package synchronisation constraint between sibling
/// binaries (§4.2 "Synchronisation").
#[derive(Debug, Clone)]
pub struct SynchronisationElement {
    /// The version element this constraint belongs to.
    pub owner: ElementId,
    /// The source version string siblings must share.
    pub source_version: String,
    /// Whether this is a hard constraint (vs. a soft, score-penalised
    /// one).
    pub hard: bool,
}

/// An explicit user request (`apt install foo`, `apt remove bar`, …).
#[derive(Debug, Clone)]
pub struct UserRequestElement {
    /// The package named by the request.
    pub package_name: String,
    /// The relation the request must satisfy, if any (a bare "install
    /// this package" request has none).
    pub expression: Option<RelationExpression>,
    /// Whether this is an inverted (removal/conflict-style) request.
    pub inverted: bool,
    /// How strongly this request binds.
    pub importance: Importance,
}

/// A "give up here for a fixed penalty" escape hatch, attached as a
/// sibling successor of a soft relation or a non-must user request.
#[derive(Debug, Clone)]
pub struct UnsatisfiedElement {
    /// The element this unsatisfied choice is an alternative to.
    pub parent: ElementId,
    /// Which penalty the resolver should charge for picking this.
    pub penalty_kind: PenaltyKind,
}

/// One node of the dependency graph (§4.2, §9 "tagged-union element
/// type").
#[derive(Debug, Clone)]
pub enum Element {
    /// A `(package, version)` or absence choice.
    Version(VersionElement),
    /// A forward dependency.
    Relation(RelationElement),
    /// One conflicting target package.
    AntiRelation(AntiRelationElement),
    /// A sibling-binary synchronisation constraint.
    Synchronisation(SynchronisationElement),
    /// An explicit user request.
    UserRequest(UserRequestElement),
    /// A soft "leave unsatisfied" escape hatch.
    Unsatisfied(UnsatisfiedElement),
}

impl Element {
    /// The owning package's name, for the element kinds that have one.
    #[must_use]
    pub fn package_name(&self) -> Option<&str> {
        match self {
            Self::Version(v) => Some(v.choice.package_name()),
            Self::UserRequest(r) => Some(&r.package_name),
            _ => None,
        }
    }

    /// True for `Element::Version`.
    #[must_use]
    pub const fn is_version(&self) -> bool {
        matches!(self, Self::Version(_))
    }
}
