//! GPG verification of `Release`/`InRelease` files against the
//! configured trusted keyring (§4.5.1 step 1).

use crate::error::{Error, Result};
use sequoia_openpgp as openpgp;
use openpgp::cert::Cert;
use openpgp::parse::stream::{DetachedVerifierBuilder, MessageLayer, MessageStructure, VerificationHelper, VerifierBuilder};
use openpgp::parse::Parse;
use openpgp::policy::StandardPolicy;
use openpgp::KeyHandle;

/// A trusted keyring loaded once per command invocation and shared by
/// every repository's metadata update.
#[derive(Debug, Clone)]
pub struct Keyring {
    certs: Vec<Cert>,
}

impl Keyring {
    /// Load a keyring from a concatenated OpenPGP certificate blob (as
    /// found under `/etc/apt/trusted.gpg.d/*.gpg`, already read by the
    /// caller).
    ///
    /// # Errors
    /// Returns an error if the blob can't be parsed as OpenPGP certs.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let certs = openpgp::cert::CertParser::from_bytes(data)
            .map_err(|e| Error::SignatureVerificationFailed { label: "keyring".to_string(), reason: e.to_string() })?
            .filter_map(std::result::Result::ok)
            .collect();
        Ok(Self { certs })
    }

    /// An empty keyring, for repositories verified only by the
    /// `trusted=yes` override.
    #[must_use]
    pub fn empty() -> Self {
        Self { certs: Vec::new() }
    }
}

struct Helper<'a> {
    certs: &'a [Cert],
    verified: bool,
}

impl VerificationHelper for Helper<'_> {
    fn get_certs(&mut self, _ids: &[KeyHandle]) -> openpgp::Result<Vec<Cert>> {
        Ok(self.certs.to_vec())
    }

    fn check(&mut self, structure: MessageStructure) -> openpgp::Result<()> {
        for layer in structure.into_iter() {
            if let MessageLayer::SignatureGroup { results } = layer {
                if results.iter().any(std::result::Result::is_ok) {
                    self.verified = true;
                }
            }
        }
        Ok(())
    }
}

/// Verify `InRelease`'s inline signature against `keyring`, returning
/// the cleartext `Release` payload.
///
/// # Errors
/// Returns [`Error::SignatureVerificationFailed`] if no signature in
/// the message verifies against any cert in `keyring`.
pub fn verify_inline(data: &[u8], keyring: &Keyring, label: &str) -> Result<Vec<u8>> {
    let policy = StandardPolicy::new();
    let helper = Helper { certs: &keyring.certs, verified: false };
    let mut verifier = VerifierBuilder::from_bytes(data)
        .and_then(|b| b.with_policy(&policy, None, helper))
        .map_err(|e| Error::SignatureVerificationFailed { label: label.to_string(), reason: e.to_string() })?;

    let mut plaintext = Vec::new();
    std::io::Read::read_to_end(&mut verifier, &mut plaintext)
        .map_err(|e| Error::SignatureVerificationFailed { label: label.to_string(), reason: e.to_string() })?;

    if !verifier.helper_ref().verified {
        return Err(Error::SignatureVerificationFailed {
            label: label.to_string(),
            reason: "no signature verified against the trusted keyring".to_string(),
        });
    }
    Ok(plaintext)
}

/// Verify a detached signature (`Release.gpg`) against `release` bytes.
///
/// # Errors
/// Returns [`Error::SignatureVerificationFailed`] if verification
/// fails.
pub fn verify_detached(release: &[u8], signature: &[u8], keyring: &Keyring, label: &str) -> Result<()> {
    let policy = StandardPolicy::new();
    let helper = Helper { certs: &keyring.certs, verified: false };
    let mut verifier = DetachedVerifierBuilder::from_bytes(signature)
        .and_then(|b| b.with_policy(&policy, None, helper))
        .map_err(|e| Error::SignatureVerificationFailed { label: label.to_string(), reason: e.to_string() })?;

    verifier
        .verify_bytes(release)
        .map_err(|e| Error::SignatureVerificationFailed { label: label.to_string(), reason: e.to_string() })?;

    if !verifier.helper_ref().verified {
        return Err(Error::SignatureVerificationFailed {
            label: label.to_string(),
            reason: "no signature verified against the trusted keyring".to_string(),
        });
    }
    Ok(())
}
