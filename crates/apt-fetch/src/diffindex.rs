//! `.diff/Index` parsing and patch-chain walking (§4.5.1 step 3).

use apt_cache::release::parse_hash_section;
use apt_core::hash::HashAlgorithm;
use apt_core::rfc822::Stanza;

/// One entry of a `SHA1-History`/`SHA1-Patches` section: a hash, a
/// size, and the patch's identifying version token (shared between
/// both sections so a history entry can be matched to its patch file).
#[derive(Debug, Clone)]
pub struct PatchEntry {
    /// SHA1 of the index state this entry describes (history) or of
    /// the patch file itself (patches).
    pub hash: String,
    /// Declared size in bytes.
    pub size: u64,
    /// The shared version token linking a history entry to its patch.
    pub version: String,
}

/// A parsed `.diff/Index` file.
#[derive(Debug, Clone)]
pub struct DiffIndex {
    /// The hash the upstream index is currently at.
    pub current_hash: String,
    /// Its declared size.
    pub current_size: u64,
    /// Every intermediate state the chain has passed through, oldest
    /// first.
    pub history: Vec<PatchEntry>,
    /// The patch file for each history transition.
    pub patches: Vec<PatchEntry>,
}

/// Parse a `.diff/Index` stanza. Returns `None` if the mandatory
/// `SHA1-Current` field is missing or malformed.
#[must_use]
pub fn parse(stanza: &Stanza) -> Option<DiffIndex> {
    let current = stanza.get("SHA1-Current")?;
    let mut parts = current.split_whitespace();
    let current_hash = parts.next()?.to_ascii_lowercase();
    let current_size: u64 = parts.next()?.parse().ok()?;

    let history = stanza
        .get("SHA1-History")
        .map(|v| parse_hash_section(v, HashAlgorithm::Sha1))
        .unwrap_or_default()
        .into_iter()
        .map(|e| PatchEntry { hash: e.hash.hex, size: e.size, version: e.path })
        .collect();
    let patches = stanza
        .get("SHA1-Patches")
        .map(|v| parse_hash_section(v, HashAlgorithm::Sha1))
        .unwrap_or_default()
        .into_iter()
        .map(|e| PatchEntry { hash: e.hash.hex, size: e.size, version: e.path })
        .collect();

    Some(DiffIndex { current_hash, current_size, history, patches })
}

impl DiffIndex {
    /// The ordered list of patches to apply to walk the local index
    /// from `local_hash` up to `current_hash`, oldest first. Returns
    /// `None` if `local_hash` isn't found anywhere in the history
    /// chain — the caller should fall back to a full download (§4.5.1
    /// step 3).
    #[must_use]
    pub fn chain_from(&self, local_hash: &str) -> Option<Vec<&PatchEntry>> {
        let start = self.history.iter().position(|e| e.hash.eq_ignore_ascii_case(local_hash))?;
        self.history[start..]
            .iter()
            .map(|entry| self.patches.iter().find(|p| p.version == entry.version))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apt_core::rfc822::Field;

    fn stanza(fields: &[(&str, &str)]) -> Stanza {
        Stanza {
            fields: fields.iter().map(|(k, v)| Field { key: (*k).to_string(), value: (*v).to_string() }).collect(),
            offset: 0,
        }
    }

    #[test]
    fn chain_from_known_hash_walks_forward() {
        let index = parse(&stanza(&[
            ("SHA1-Current", "cccccccccccccccccccccccccccccccccccccccc 1000"),
            ("SHA1-History", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa 900 1\nbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb 950 2"),
            ("SHA1-Patches", "1111111111111111111111111111111111111111 10 1\n2222222222222222222222222222222222222222 12 2"),
        ]))
        .expect("valid diff index");

        let chain = index.chain_from("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").expect("hash is in history");
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].version, "1");
        assert_eq!(chain[1].version, "2");
    }

    #[test]
    fn chain_from_unknown_hash_is_none() {
        let index = parse(&stanza(&[
            ("SHA1-Current", "cccccccccccccccccccccccccccccccccccccccc 1000"),
            ("SHA1-History", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa 900 1"),
            ("SHA1-Patches", "1111111111111111111111111111111111111111 10 1"),
        ]))
        .expect("valid diff index");

        assert!(index.chain_from("ffffffffffffffffffffffffffffffffffffffff").is_none());
    }
}
