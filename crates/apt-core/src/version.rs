//! Debian-style version comparison and dependency relation expressions.
//!
//! Implements `dpkg --compare-versions` semantics: a version string is
//! `[epoch:]upstream-version[-debian-revision]`. Epoch compares
//! numerically; `upstream-version` and `debian-revision` each compare
//! with the `~`-aware alternating digit/non-digit algorithm dpkg calls
//! `verrevcmp` (ported from `original_source/cpp/lib/src/internal/
//! versionparse.cpp`, §3 "Version", §8 invariant 1).

use std::cmp::Ordering;
use std::fmt;

/// Split `[epoch:]upstream[-revision]` into its three parts. A missing
/// epoch defaults to `0`; a missing revision (no `-` present) defaults
/// to `"0"`, matching dpkg.
fn split_version(version: &str) -> (u64, &str, &str) {
    let (epoch, rest) = match version.split_once(':') {
        Some((e, rest)) => (e.parse().unwrap_or(0), rest),
        None => (0, version),
    };
    match rest.rfind('-') {
        Some(idx) => (epoch, &rest[..idx], &rest[idx + 1..]),
        None => (epoch, rest, "0"),
    }
}

/// dpkg's `order()`: digits sort as if they did not exist here (handled
/// separately), letters sort by ASCII value, `~` sorts before
/// everything (including the end of string), everything else sorts
/// after letters.
fn order(c: Option<u8>) -> i32 {
    match c {
        None => 0,
        Some(b'~') => -1,
        Some(c) if c.is_ascii_digit() => 0,
        Some(c) if c.is_ascii_alphabetic() => i32::from(c),
        Some(c) => i32::from(c) + 256,
    }
}

/// Compare two upstream-version or debian-revision fragments using
/// dpkg's `verrevcmp`.
fn verrevcmp(a: &str, b: &str) -> Ordering {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    loop {
        if i >= a.len() && j >= b.len() {
            return Ordering::Equal;
        }

        while (i < a.len() && !a[i].is_ascii_digit()) || (j < b.len() && !b[j].is_ascii_digit()) {
            let ac = order(a.get(i).copied());
            let bc = order(b.get(j).copied());
            if ac != bc {
                return ac.cmp(&bc);
            }
            if i < a.len() {
                i += 1;
            }
            if j < b.len() {
                j += 1;
            }
        }

        while a.get(i) == Some(&b'0') {
            i += 1;
        }
        while b.get(j) == Some(&b'0') {
            j += 1;
        }

        let (mut di, mut dj) = (i, j);
        while a.get(di).is_some_and(u8::is_ascii_digit) && b.get(dj).is_some_and(u8::is_ascii_digit)
        {
            di += 1;
            dj += 1;
        }
        let a_digits = &a[i..di];
        let b_digits = &b[j..dj];
        match a_digits.len().cmp(&b_digits.len()) {
            Ordering::Equal => {
                if a_digits != b_digits {
                    return a_digits.cmp(b_digits);
                }
            }
            other => return other,
        }
        i = di;
        j = dj;
    }
}

/// Compare two Debian version strings per `dpkg --compare-versions`
/// rules: epoch, then upstream version, then debian revision, each
/// tilde-aware. `compare(a, b) < 0 ⇔ compare(b, a) > 0` and
/// `compare(a, a) == 0` hold for all inputs (§8 invariant 1).
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (ea, ua, ra) = split_version(a);
    let (eb, ub, rb) = split_version(b);
    ea.cmp(&eb)
        .then_with(|| verrevcmp(ua, ub))
        .then_with(|| verrevcmp(ra, rb))
}

/// A dependency relation operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationOp {
    /// No version constraint; matches any version.
    None,
    /// Strictly less than.
    Lt,
    /// Less than or equal to.
    Le,
    /// Exactly equal to (Debian version compare, ignores packaging noise).
    Eq,
    /// Greater than or equal to.
    Ge,
    /// Strictly greater than.
    Gt,
    /// Byte-for-byte literal equality (used by `Provides: pkg (= ver)`).
    LiteralEq,
}

impl RelationOp {
    /// Render as the canonical dpkg operator token (`<<`, `<=`, `=`,
    /// `>=`, `>>`); `None` renders as the empty string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Lt => "<<",
            Self::Le => "<=",
            Self::Eq | Self::LiteralEq => "=",
            Self::Ge => ">=",
            Self::Gt => ">>",
        }
    }

    /// Parse a dpkg operator token, accepting both the modern (`<<`,
    /// `>>`) and legacy (`<`, `>`) single/double forms.
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "" => Some(Self::None),
            "<<" | "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            "=" => Some(Self::Eq),
            ">=" => Some(Self::Ge),
            ">>" | ">" => Some(Self::Gt),
            _ => None,
        }
    }

    /// Whether `candidate` satisfies this operator against `target`.
    #[must_use]
    pub fn matches(self, candidate: &str, target: &str) -> bool {
        match self {
            Self::None => true,
            Self::LiteralEq => candidate == target,
            Self::Eq => compare_versions(candidate, target) == Ordering::Equal,
            Self::Lt => compare_versions(candidate, target) == Ordering::Less,
            Self::Le => compare_versions(candidate, target) != Ordering::Greater,
            Self::Ge => compare_versions(candidate, target) != Ordering::Less,
            Self::Gt => compare_versions(candidate, target) == Ordering::Greater,
        }
    }
}

/// A single dependency relation: `name [:arch] (op version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    /// Target package name.
    pub package_name: String,
    /// Optional architecture qualifier (`libfoo:i386`).
    pub architecture_qualifier: Option<String>,
    /// Version comparison operator.
    pub op: RelationOp,
    /// Version operand; empty when `op == RelationOp::None`.
    pub version: String,
}

impl Relation {
    /// Whether `candidate_version` of the package named
    /// `self.package_name` satisfies this relation directly (ignoring
    /// `Provides`; see `PackageCache::get_satisfying_versions` for the
    /// full, provides-aware check).
    #[must_use]
    pub fn matches_version(&self, candidate_version: &str) -> bool {
        self.op.matches(candidate_version, &self.version)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.package_name)?;
        if let Some(arch) = &self.architecture_qualifier {
            write!(f, ":{arch}")?;
        }
        if self.op != RelationOp::None {
            write!(f, " ({} {})", self.op.as_str(), self.version)?;
        }
        Ok(())
    }
}

/// An OR-group of `Relation`s (`a | b | c`). The canonical textual form
/// returned by `hash_key` is used as a memoisation key by the cache
/// (§4.1) and is stable across re-parses of equivalent text (§8
/// round-trip law), even though whitespace is not preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RelationExpression {
    /// Alternatives, interpreted as disjunction.
    pub alternatives: Vec<Relation>,
}

impl RelationExpression {
    /// Build from a list of alternatives.
    #[must_use]
    pub fn new(alternatives: Vec<Relation>) -> Self {
        Self { alternatives }
    }

    /// Canonical hash-string used to memoise `get_satisfying_versions`.
    #[must_use]
    pub fn hash_key(&self) -> String {
        self.alternatives
            .iter()
            .map(std::string::ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl fmt::Display for RelationExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hash_key())
    }
}

/// A conjunction of `RelationExpression`s (`a, b | c, d`), e.g. a full
/// `Depends:` field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationLine {
    /// Conjuncts.
    pub expressions: Vec<RelationExpression>,
}

impl RelationLine {
    /// Parse a comma-separated, pipe-disjoined dependency field such as
    /// `libc6 (>= 2.17), libssl3 | libssl1.1`.
    #[must_use]
    pub fn parse(field: &str) -> Self {
        let expressions = field
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_relation_expression)
            .collect();
        Self { expressions }
    }
}

fn parse_relation_expression(s: &str) -> RelationExpression {
    let alternatives = s
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(parse_single_relation)
        .collect();
    RelationExpression { alternatives }
}

/// Parse one `name[:arch] [(op version)]` relation atom.
fn parse_single_relation(s: &str) -> Option<Relation> {
    let s = s.trim();
    let (name_part, op, version) = if let Some(open) = s.find('(') {
        let close = s.find(')')?;
        let name_part = s[..open].trim();
        let inner = s[open + 1..close].trim();
        let mut it = inner.splitn(2, char::is_whitespace);
        let op_token = it.next().unwrap_or("").trim();
        let version = it.next().unwrap_or("").trim().to_string();
        (name_part, RelationOp::parse(op_token)?, version)
    } else {
        (s, RelationOp::None, String::new())
    };

    // Strip build-profile / architecture-restriction annotations the
    // caller didn't already remove (`[amd64 !i386]`, `<!nocheck>`).
    let name_part = name_part
        .split('[')
        .next()
        .unwrap_or(name_part)
        .split('<')
        .next()
        .unwrap_or(name_part)
        .trim();

    let (package_name, architecture_qualifier) = match name_part.split_once(':') {
        Some((n, a)) => (n.to_string(), Some(a.to_string())),
        None => (name_part.to_string(), None),
    };

    if package_name.is_empty() {
        return None;
    }

    Some(Relation {
        package_name,
        architecture_qualifier,
        op,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn totality_examples() {
        let cases = [
            ("1.0", "1.0", Ordering::Equal),
            ("1.0", "2.0", Ordering::Less),
            ("2.0", "1.0", Ordering::Greater),
            ("1.0~beta1", "1.0", Ordering::Less),
            ("1.0", "1.0~beta1", Ordering::Greater),
            ("1:1.0", "2.0", Ordering::Greater),
            ("1.0-1", "1.0-2", Ordering::Less),
            ("1.0.0", "1.0", Ordering::Greater),
            ("7.6p2-4", "7.6p2-4+b1", Ordering::Less),
            ("1.0a", "1.0", Ordering::Less),
        ];
        for (a, b, expected) in cases {
            assert_eq!(compare_versions(a, b), expected, "{a} vs {b}");
        }
    }

    #[test]
    fn relation_matches() {
        let rel = parse_single_relation("libc6 (>= 2.17)").unwrap();
        assert!(rel.matches_version("2.20"));
        assert!(!rel.matches_version("2.10"));
    }

    #[test]
    fn relation_line_parses_or_groups() {
        let line = RelationLine::parse("libssl3 | libssl1.1, libc6 (>= 2.17)");
        assert_eq!(line.expressions.len(), 2);
        assert_eq!(line.expressions[0].alternatives.len(), 2);
    }

    #[test]
    fn hash_key_stable_across_whitespace() {
        let a = parse_relation_expression("libc6 (>= 2.17)");
        let b = parse_relation_expression("libc6   (>=   2.17)");
        assert_eq!(a.hash_key(), b.hash_key());
    }

    proptest! {
        #[test]
        fn totality(a in "[0-9]{1,3}(\\.[0-9]{1,3}){0,2}", b in "[0-9]{1,3}(\\.[0-9]{1,3}){0,2}") {
            let fwd = compare_versions(&a, &b);
            let bwd = compare_versions(&b, &a);
            prop_assert_eq!(fwd.reverse(), bwd);
            prop_assert_eq!(compare_versions(&a, &a), Ordering::Equal);
        }
    }
}
