//! Architecture and build-profile filters on dependency relations.
//!
//! `ArchitecturedRelation`/`ArchitecturedRelationLine` (§3) carry
//! `[arch1 !arch2 …]` architecture filters and `<a b> <c>` build-profile
//! filters alongside each relation. Projection to a plain `RelationLine`
//! for the host architecture drops non-matching alternatives.

use crate::version::{Relation, RelationExpression, RelationLine};

/// An architecture filter list, either all-positive (`[amd64 arm64]`,
/// "only these") or all-negative (`[!i386 !hurd-i386]`, "all but
/// these"); dpkg's control file syntax never mixes the two within one
/// bracket group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchFilter {
    /// Matches only if the current architecture is in this list.
    Only(Vec<String>),
    /// Matches unless the current architecture is in this list.
    Except(Vec<String>),
}

impl ArchFilter {
    /// Parse the contents between `[` and `]` (exclusive), e.g.
    /// `"amd64 arm64"` or `"!i386 !hurd-i386"`.
    #[must_use]
    pub fn parse(inner: &str) -> Self {
        let tokens: Vec<&str> = inner.split_whitespace().collect();
        if tokens.iter().all(|t| t.starts_with('!')) && !tokens.is_empty() {
            Self::Except(tokens.iter().map(|t| t[1..].to_string()).collect())
        } else {
            Self::Only(tokens.iter().map(std::string::ToString::to_string).collect())
        }
    }

    /// Whether `arch` passes this filter.
    #[must_use]
    pub fn matches(&self, arch: &str) -> bool {
        match self {
            Self::Only(list) => list.iter().any(|a| a == arch || a == "any"),
            Self::Except(list) => !list.iter().any(|a| a == arch),
        }
    }
}

/// A build-profile filter group, e.g. `<!nocheck>` or `<cross pkg.foo.bar>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFilter {
    /// Raw profile tokens, negated ones keep their leading `!`.
    pub tokens: Vec<String>,
}

impl ProfileFilter {
    /// Whether the filter passes given the active build profiles.
    #[must_use]
    pub fn matches(&self, active_profiles: &[String]) -> bool {
        self.tokens.iter().all(|t| {
            if let Some(negated) = t.strip_prefix('!') {
                !active_profiles.iter().any(|p| p == negated)
            } else {
                active_profiles.iter().any(|p| p == t)
            }
        })
    }
}

/// A relation annotated with architecture and build-profile filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchitecturedRelation {
    /// The base relation.
    pub relation: Relation,
    /// Architecture restriction, if any.
    pub arch_filter: Option<ArchFilter>,
    /// Build-profile restriction groups (each `<...>` is independent;
    /// the relation is active if any group matches).
    pub profile_filters: Vec<ProfileFilter>,
}

impl ArchitecturedRelation {
    /// Whether this relation is active for `arch` under `active_profiles`.
    #[must_use]
    pub fn is_active(&self, arch: &str, active_profiles: &[String]) -> bool {
        let arch_ok = self.arch_filter.as_ref().is_none_or(|f| f.matches(arch));
        let profile_ok = self.profile_filters.is_empty()
            || self.profile_filters.iter().any(|f| f.matches(active_profiles));
        arch_ok && profile_ok
    }
}

/// An OR-group of `ArchitecturedRelation`s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchitecturedRelationExpression {
    /// Alternatives.
    pub alternatives: Vec<ArchitecturedRelation>,
}

/// A full architectured dependency line (AND of OR-groups).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchitecturedRelationLine {
    /// Conjuncts.
    pub expressions: Vec<ArchitecturedRelationExpression>,
}

impl ArchitecturedRelationLine {
    /// Project to a plain `RelationLine` for `arch`/`active_profiles`,
    /// dropping alternatives that don't apply and dropping whole
    /// expressions that become empty (an expression with zero
    /// surviving alternatives is an unconditional drop, not a relation
    /// nothing can satisfy).
    #[must_use]
    pub fn project(&self, arch: &str, active_profiles: &[String]) -> RelationLine {
        let expressions = self
            .expressions
            .iter()
            .filter_map(|expr| {
                let alternatives: Vec<Relation> = expr
                    .alternatives
                    .iter()
                    .filter(|r| r.is_active(arch, active_profiles))
                    .map(|r| r.relation.clone())
                    .collect();
                if alternatives.is_empty() {
                    None
                } else {
                    Some(RelationExpression::new(alternatives))
                }
            })
            .collect();
        RelationLine { expressions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::RelationOp;

    fn rel(name: &str) -> Relation {
        Relation {
            package_name: name.to_string(),
            architecture_qualifier: None,
            op: RelationOp::None,
            version: String::new(),
        }
    }

    #[test]
    fn only_filter_matches_listed_arch() {
        let f = ArchFilter::parse("amd64 arm64");
        assert!(f.matches("amd64"));
        assert!(!f.matches("i386"));
    }

    #[test]
    fn except_filter_excludes_listed_arch() {
        let f = ArchFilter::parse("!i386 !hurd-i386");
        assert!(f.matches("amd64"));
        assert!(!f.matches("i386"));
    }

    #[test]
    fn projection_drops_inactive_alternatives() {
        let line = ArchitecturedRelationLine {
            expressions: vec![ArchitecturedRelationExpression {
                alternatives: vec![
                    ArchitecturedRelation {
                        relation: rel("only-i386"),
                        arch_filter: Some(ArchFilter::Only(vec!["i386".to_string()])),
                        profile_filters: vec![],
                    },
                    ArchitecturedRelation {
                        relation: rel("any-arch"),
                        arch_filter: None,
                        profile_filters: vec![],
                    },
                ],
            }],
        };
        let projected = line.project("amd64", &[]);
        assert_eq!(projected.expressions.len(), 1);
        assert_eq!(projected.expressions[0].alternatives.len(), 1);
        assert_eq!(projected.expressions[0].alternatives[0].package_name, "any-arch");
    }
}
