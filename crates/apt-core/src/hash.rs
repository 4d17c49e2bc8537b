//! Content hashing for archive and index integrity verification.
//!
//! `Release` files publish `MD5Sum:`, `SHA1:`, and `SHA256:` sections
//! (§6 "Release file format"); package records publish `MD5sum:`,
//! `SHA1:`, `SHA256:` per-file. This module computes and compares all
//! three so the fetcher can verify against whichever is declared.

use digest::Digest;
use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;
use std::io::{self, Read};

/// The hash algorithms a `Release` or package record may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5 (`MD5Sum:` / `MD5sum:`).
    Md5,
    /// SHA-1 (`SHA1:`).
    Sha1,
    /// SHA-256 (`SHA256:`).
    Sha256,
}

/// A single declared or computed digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    /// Which algorithm produced `hex`.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest.
    pub hex: String,
}

impl ContentHash {
    /// Construct from raw bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            hex: hex::encode(bytes),
        }
    }
}

/// Incremental multi-algorithm hasher: feed bytes once, read out any or
/// all of MD5/SHA1/SHA256 at the end. Used by the fetcher so a single
/// streaming pass over a downloaded file can be checked against
/// whichever digest the `Release`/package record happened to publish.
#[derive(Debug, Default)]
pub struct ContentHasher {
    md5: Md5,
    sha1: Sha1,
    sha256: Sha256,
}

impl ContentHasher {
    /// Create a fresh hasher with all three algorithms running.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of data into all three running hashes.
    pub fn update(&mut self, data: &[u8]) {
        self.md5.update(data);
        self.sha1.update(data);
        self.sha256.update(data);
    }

    /// Hash an entire reader, e.g. a downloaded `.deb` or index file.
    ///
    /// # Errors
    /// Propagates any I/O error encountered while reading.
    pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<[ContentHash; 3]> {
        let mut hasher = Self::new();
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }

    /// Finalize into one `ContentHash` per algorithm.
    #[must_use]
    pub fn finalize(self) -> [ContentHash; 3] {
        [
            ContentHash::new(HashAlgorithm::Md5, &self.md5.finalize()),
            ContentHash::new(HashAlgorithm::Sha1, &self.sha1.finalize()),
            ContentHash::new(HashAlgorithm::Sha256, &self.sha256.finalize()),
        ]
    }
}

/// Verify that `computed` matches `expected`, per §8 invariant 7 (a
/// file moves from `partial/` only if its hash equals the Release's
/// declaration). Algorithms are compared case-insensitively and must
/// match on `algorithm` as well as `hex`.
#[must_use]
pub fn verify(expected: &ContentHash, computed: &ContentHash) -> bool {
    expected.algorithm == computed.algorithm && expected.hex.eq_ignore_ascii_case(&computed.hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_known_vector() {
        let hashes = ContentHasher::hash_reader(b"abc".as_slice()).unwrap();
        assert_eq!(hashes[0].hex, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(hashes[1].hex, "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(
            hashes[2].hex,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_requires_matching_algorithm() {
        let a = ContentHash::new(HashAlgorithm::Sha256, b"x");
        let b = ContentHash::new(HashAlgorithm::Sha1, b"x");
        assert!(!verify(&a, &b));
    }
}
