//! `Version`, `Package`, and the dependency-type enumeration (§3).

use crate::release::ReleaseInfo;
use apt_core::hash::ContentHash;
use apt_core::version::RelationLine;
use std::sync::Arc;

/// Installation priority, lowest-to-highest urgency per Debian policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Least urgent (`extra`).
    Extra,
    /// `optional`.
    Optional,
    /// `standard`.
    Standard,
    /// `important`.
    Important,
    /// Most urgent (`required`).
    Required,
}

impl Priority {
    /// Parse the `Priority:` field value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "required" => Self::Required,
            "important" => Self::Important,
            "standard" => Self::Standard,
            "extra" => Self::Extra,
            _ => Self::Optional,
        }
    }

    /// Index into a 5-element, highest-first bonus table
    /// (`ResolverScoreConfig::priority_bonus`).
    #[must_use]
    pub const fn bonus_index(self) -> usize {
        match self {
            Self::Required => 0,
            Self::Important => 1,
            Self::Standard => 2,
            Self::Optional => 3,
            Self::Extra => 4,
        }
    }
}

/// The dependency relation types a version can declare (§3, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyType {
    /// Must be configured before this version is unpacked.
    PreDepends,
    /// Must be configured before this version is configured.
    Depends,
    /// Soft: should be installed, score penalty if not.
    Recommends,
    /// Soft: nice to have, small score penalty if not.
    Suggests,
    /// Anti-dependency: must not be simultaneously installed.
    Conflicts,
    /// Anti-dependency, weaker than Conflicts (dpkg allows a brief
    /// overlap during unpack).
    Breaks,
    /// Declares packages this version replaces files/ownership of.
    Replaces,
    /// Informational: other packages this one improves when present.
    Enhances,
}

impl DependencyType {
    /// Whether this is an anti-dependency type (Conflicts/Breaks).
    #[must_use]
    pub const fn is_anti(self) -> bool {
        matches!(self, Self::Conflicts | Self::Breaks)
    }

    /// Whether this is a soft (score-only) forward dependency.
    #[must_use]
    pub const fn is_soft(self) -> bool {
        matches!(self, Self::Recommends | Self::Suggests)
    }

    /// The default active subset the DGB unfolds
    /// (`Replaces`/`Enhances` are metadata-only, never graph edges).
    #[must_use]
    pub const fn default_active() -> &'static [Self] {
        &[
            Self::PreDepends,
            Self::Depends,
            Self::Recommends,
            Self::Suggests,
            Self::Conflicts,
            Self::Breaks,
        ]
    }

    /// RFC822 field name.
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::PreDepends => "Pre-Depends",
            Self::Depends => "Depends",
            Self::Recommends => "Recommends",
            Self::Suggests => "Suggests",
            Self::Conflicts => "Conflicts",
            Self::Breaks => "Breaks",
            Self::Replaces => "Replaces",
            Self::Enhances => "Enhances",
        }
    }
}

/// A `Provides:` entry: a virtual package name with an optional
/// declared version (`foo-provider (= 1.2)`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provide {
    /// The virtual (or alternate real) package name provided.
    pub package_name: String,
    /// Declared version, if any. Debian control files only allow `=`
    /// here.
    pub version: Option<String>,
}

/// Where a version is available: which release, and under which
/// directory within it.
#[derive(Debug, Clone)]
pub struct VersionSource {
    /// The release (repository component) this copy came from.
    pub release: Arc<ReleaseInfo>,
    /// Pool directory relative to `release.base_uri`.
    pub directory: String,
    /// Byte offset of this version's stanza within the index file this
    /// source was parsed from, for lazy re-parsing.
    pub offset: u64,
}

/// Per-file hash declarations for an archive.
#[derive(Debug, Clone, Default)]
pub struct FileHashes {
    /// MD5, if declared.
    pub md5: Option<ContentHash>,
    /// SHA1, if declared.
    pub sha1: Option<ContentHash>,
    /// SHA256, if declared.
    pub sha256: Option<ContentHash>,
}

/// A concrete `(package, version)` choice for a *binary* package.
#[derive(Debug, Clone)]
pub struct BinaryVersion {
    /// Package name.
    pub package_name: String,
    /// Version string (Debian version syntax).
    pub version: String,
    /// Architecture (`amd64`, `all`, …).
    pub architecture: String,
    /// Installation urgency.
    pub priority: Priority,
    /// `Essential: yes`.
    pub essential: bool,
    /// The source package this binary was built from.
    pub source_package_name: String,
    /// The source version this binary was built from (may differ from
    /// `version` when e.g. a binNMU bumps only the binary version).
    pub source_version: String,
    /// Per-dependency-type relation lines.
    pub relations: ahash::AHashMap<DependencyType, RelationLine>,
    /// Virtual packages provided.
    pub provides: Vec<Provide>,
    /// Declared file hashes for the `.deb`.
    pub hashes: FileHashes,
    /// Size in bytes.
    pub size: u64,
    /// `Filename:` relative to the release's base URI.
    pub filename: Option<String>,
    /// Everywhere this exact version can be downloaded from.
    pub sources: Vec<VersionSource>,
    /// `Description-md5`, used to look up a localised description.
    pub description_md5: Option<String>,
    /// Inline (English) description, used when no localisation matches.
    pub description: Option<String>,
    /// Multi-Arch tag (`same`, `foreign`, `allowed`), if declared.
    pub multiarch: Option<String>,
}

impl BinaryVersion {
    /// Relation line for `dep_type`, or an empty line if not declared.
    #[must_use]
    pub fn relation_line(&self, dep_type: DependencyType) -> RelationLine {
        self.relations.get(&dep_type).cloned().unwrap_or_default()
    }
}

/// A concrete `(package, version)` choice for a *source* package.
#[derive(Debug, Clone)]
pub struct SourceVersion {
    /// Source package name.
    pub package_name: String,
    /// Version string.
    pub version: String,
    /// Build-dependency relation lines.
    pub build_relations: ahash::AHashMap<DependencyType, RelationLine>,
    /// Per-file hash declarations (`.dsc`, `.tar.*`, …) keyed by
    /// filename.
    pub files: Vec<(String, FileHashes, u64)>,
    /// Everywhere this version can be downloaded from.
    pub sources: Vec<VersionSource>,
}

/// Either kind of version element, as the cache and DGB need to treat
/// them uniformly in a few places (e.g. "does this family have an
/// absent variant").
#[derive(Debug, Clone)]
pub enum Version {
    /// A binary package version.
    Binary(Arc<BinaryVersion>),
    /// A source package version.
    Source(Arc<SourceVersion>),
}

impl Version {
    /// The package name, regardless of kind.
    #[must_use]
    pub fn package_name(&self) -> &str {
        match self {
            Self::Binary(v) => &v.package_name,
            Self::Source(v) => &v.package_name,
        }
    }

    /// The version string, regardless of kind.
    #[must_use]
    pub fn version_string(&self) -> &str {
        match self {
            Self::Binary(v) => &v.version,
            Self::Source(v) => &v.version,
        }
    }
}

/// A named package: all known versions plus, for binaries, the
/// currently installed one. Invariant: at most one installed version
/// (§3 "Package").
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Package name.
    pub name: String,
    /// Known versions, in source-parse order.
    pub versions: Vec<Arc<BinaryVersion>>,
    /// The installed version, if any.
    pub installed: Option<Arc<BinaryVersion>>,
}

impl Package {
    /// Find a specific version string among the known versions.
    #[must_use]
    pub fn find_version(&self, version: &str) -> Option<&Arc<BinaryVersion>> {
        self.versions.iter().find(|v| v.version == version)
    }
}

/// A named source package: all known `SourceVersion`s.
#[derive(Debug, Clone, Default)]
pub struct SourcePackage {
    /// Package name.
    pub name: String,
    /// Known versions, in source-parse order.
    pub versions: Vec<Arc<SourceVersion>>,
}

impl SourcePackage {
    /// Find a specific version string among the known versions.
    #[must_use]
    pub fn find_version(&self, version: &str) -> Option<&Arc<SourceVersion>> {
        self.versions.iter().find(|v| v.version == version)
    }
}
