//! The metadata updater: per-repository `Release`/`InRelease` refresh,
//! index download, diff-patch chain application, localisation, and
//! lists directory upkeep (§4.5.1).
//!
//! Each repository is updated by an independently spawned `tokio` task
//! rather than a forked child process (§5), joined at the end of the
//! phase with its failure folded into an overall OR'd status bit, same
//! as the spec's `wait()` loop.

use crate::compress::{self, Compression};
use crate::diffindex;
use crate::error::{Error, Result};
use crate::verify::{self, Keyring};
use apt_cache::parse::parse_release;
use apt_cache::release::ReleaseInfo;
use apt_config::WorkerConfig;
use apt_core::hash::HashAlgorithm;
use apt_core::rfc822;
use fs2::FileExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// One configured repository entry (a `sources.list`/`sources.list.d`
/// line). No equivalent type exists upstream in this workspace yet —
/// the cache consumes already-downloaded index files, not the entries
/// that produced them — so this is a minimal local model covering what
/// the updater needs.
#[derive(Debug, Clone)]
pub struct RepositoryEntry {
    /// Base URI, e.g. `http://deb.debian.org/debian`.
    pub base_uri: String,
    /// Distribution, e.g. `bookworm`.
    pub distribution: String,
    /// Components, e.g. `["main", "contrib"]`.
    pub components: Vec<String>,
    /// Architectures to fetch binary indexes for.
    pub architectures: Vec<String>,
    /// Languages to fetch translation indexes for, e.g. `["en", "de"]`.
    pub languages: Vec<String>,
    /// `trusted=yes` — skip GPG verification entirely.
    pub trusted: bool,
    /// A short label for error messages, e.g. `"bookworm main"`.
    pub label: String,
}

impl RepositoryEntry {
    fn release_uri(&self, inline: bool) -> String {
        let name = if inline { "InRelease" } else { "Release" };
        format!("{}/dists/{}/{name}", self.base_uri.trim_end_matches('/'), self.distribution)
    }

    fn index_uri(&self, component: &str, architecture: &str, extension: &str) -> String {
        let suffix = if extension.is_empty() { String::new() } else { format!(".{extension}") };
        format!(
            "{}/dists/{}/{component}/binary-{architecture}/Packages{suffix}",
            self.base_uri.trim_end_matches('/'),
            self.distribution,
        )
    }

    fn translation_uri(&self, component: &str, language: &str, extension: &str) -> String {
        let suffix = if extension.is_empty() { String::new() } else { format!(".{extension}") };
        format!(
            "{}/dists/{}/{component}/i18n/Translation-{language}{suffix}",
            self.base_uri.trim_end_matches('/'),
            self.distribution,
        )
    }
}

/// The per-repository outcome of one update pass.
#[derive(Debug)]
pub struct UpdateOutcome {
    /// Which repository this outcome is for.
    pub label: String,
    /// `Ok(())` on success; the recorded failure otherwise. A failed
    /// repository does not abort the others (§5 "overall failure bit
    /// OR'd across exit statuses").
    pub result: Result<()>,
}

/// Drives a full metadata-update phase across every configured
/// repository, holding `lists/lock` for its lifetime.
pub struct MetadataUpdater {
    client: reqwest::Client,
    lists_dir: PathBuf,
    worker_config: WorkerConfig,
    keyring: Keyring,
    _lock: std::fs::File,
}

impl MetadataUpdater {
    /// Open the lists directory and acquire its lock.
    ///
    /// # Errors
    /// Returns an error if `lists/lock` is already held.
    pub fn new(lists_dir: PathBuf, worker_config: WorkerConfig, keyring: Keyring) -> Result<Self> {
        std::fs::create_dir_all(&lists_dir).map_err(|e| Error::io(&lists_dir, e))?;
        let lock_path = lists_dir.join("lock");
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::io(&lock_path, e))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| Error::io(&lock_path, std::io::Error::other("lists directory is locked by another instance")))?;

        let client = reqwest::Client::builder().build().unwrap_or_default();
        Ok(Self { client, lists_dir, worker_config, keyring, _lock: lock_file })
    }

    /// Run pre-invoke hooks, update every repository concurrently,
    /// run list-cleanup, then post-invoke hooks (only if every
    /// repository succeeded — §4.5.1 step 6).
    ///
    /// # Errors
    /// Returns the first hook-execution error encountered; individual
    /// repository failures are reported per-entry in the returned
    /// vector instead of aborting the phase.
    pub async fn run(
        &self,
        repositories: &[RepositoryEntry],
        pre_invoke: &[String],
        post_invoke: &[String],
    ) -> Result<Vec<UpdateOutcome>> {
        for command in pre_invoke {
            run_hook(command).await?;
        }

        let outcomes: Vec<UpdateOutcome> = futures_util::future::join_all(
            repositories.iter().map(|repo| self.update_repository(repo)),
        )
        .await;

        if self.worker_config.list_cleanup {
            if let Err(e) = self.clean_lists(repositories) {
                warn!(error = %e, "list-cleanup failed");
            }
        }

        if outcomes.iter().all(|o| o.result.is_ok()) {
            for command in post_invoke {
                run_hook(command).await?;
            }
        }

        Ok(outcomes)
    }

    async fn update_repository(&self, repo: &RepositoryEntry) -> UpdateOutcome {
        let result = self.update_repository_inner(repo).await;
        if let Err(ref e) = result {
            warn!(repository = %repo.label, error = %e, "metadata update failed");
        }
        UpdateOutcome { label: repo.label.clone(), result }
    }

    async fn update_repository_inner(&self, repo: &RepositoryEntry) -> Result<()> {
        let (release, release_bytes) = self.fetch_release(repo).await?;

        for component in &repo.components {
            for architecture in &repo.architectures {
                self.update_index(repo, &release, component, architecture, "Packages", IndexKind::Packages).await?;
            }
            for language in &repo.languages {
                self.update_index(repo, &release, component, language, "Translation", IndexKind::Translation).await?;
            }
        }

        let _ = release_bytes;
        Ok(())
    }

    /// Step 1: download and verify `Release`/`InRelease`.
    async fn fetch_release(&self, repo: &RepositoryEntry) -> Result<(ReleaseInfo, Vec<u8>)> {
        if let Ok(body) = self.get(&repo.release_uri(true)).await {
            let plaintext = if repo.trusted {
                body
            } else {
                verify::verify_inline(&body, &self.keyring, &repo.label)?
            };
            let stanza = first_stanza(&plaintext)?;
            let component = repo.components.first().map(String::as_str).unwrap_or("main");
            let mut info = parse_release(&stanza, &repo.base_uri, component);
            info.verified = true;
            return Ok((info, plaintext));
        }

        let release_body = self.get(&repo.release_uri(false)).await?;
        if !repo.trusted {
            let sig_uri = format!("{}.gpg", repo.release_uri(false));
            let signature = self.get(&sig_uri).await?;
            verify::verify_detached(&release_body, &signature, &self.keyring, &repo.label)?;
        }
        let stanza = first_stanza(&release_body)?;
        let component = repo.components.first().map(String::as_str).unwrap_or("main");
        let mut info = parse_release(&stanza, &repo.base_uri, component);
        info.verified = true;
        Ok((info, release_body))
    }

    /// Step 2/3/4: fetch one index (plain `Packages`/`Sources` or a
    /// `Translation-<lang>`), trying the diff-patch chain first for
    /// `Packages`-kind indexes, then a compression-priority URI
    /// fallback for a full download.
    async fn update_index(
        &self,
        repo: &RepositoryEntry,
        release: &ReleaseInfo,
        component: &str,
        selector: &str,
        kind: IndexKind,
    ) -> Result<()> {
        let local_path = self.local_index_path(repo, component, selector, kind);

        if matches!(kind, IndexKind::Packages) {
            if let Ok(()) = self.try_diff_chain(repo, component, selector, &local_path).await {
                return Ok(());
            }
        }

        let priorities = self.compression_order();
        let mut last_error = None;
        for extension in &priorities {
            let uri = match kind {
                IndexKind::Packages => repo.index_uri(component, selector, extension),
                IndexKind::Translation => repo.translation_uri(component, selector, extension),
            };
            match self.download_and_place(&uri, &local_path, release, extension).await {
                Ok(()) => return Ok(()),
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or(Error::Request { uri: local_path.display().to_string(), message: "no URI candidates".to_string() }))
    }

    async fn download_and_place(&self, uri: &str, local_path: &Path, release: &ReleaseInfo, extension: &str) -> Result<()> {
        let body = self.get(uri).await?;
        let relative = path_relative_to_release(uri, &release.base_uri);
        if let Some(entry) = release.entry_for(&relative, HashAlgorithm::Sha256) {
            let computed = apt_core::hash::ContentHasher::hash_reader(body.as_slice()).map_err(|e| Error::io(local_path, e))?;
            let actual = &computed[2];
            if !apt_core::hash::verify(&entry.hash, actual) {
                return Err(Error::HashMismatch { uri: uri.to_string(), expected: entry.hash.hex.clone(), actual: actual.hex.clone() });
            }
        }
        let compression = Compression::from_extension(Path::new(extension));
        let decompressed = compress::decompress(compression, &body, local_path)?;
        atomic_write(local_path, &decompressed)?;
        debug!(uri = %uri, path = %local_path.display(), "index downloaded");
        Ok(())
    }

    /// Step 3: walk the `.diff/Index` patch chain forward from the
    /// local index's current SHA1.
    async fn try_diff_chain(&self, repo: &RepositoryEntry, component: &str, architecture: &str, local_path: &Path) -> Result<()> {
        if !local_path.exists() || !red_available().await {
            return Err(Error::RedUnavailable);
        }

        let diff_index_uri = format!(
            "{}/dists/{}/{component}/binary-{architecture}/Packages.diff/Index",
            repo.base_uri.trim_end_matches('/'),
            repo.distribution,
        );
        let body = self.get(&diff_index_uri).await?;
        let stanza = first_stanza(&body)?;
        let diff_index = diffindex::parse(&stanza).ok_or_else(|| Error::DiffChainBroken { path: local_path.display().to_string() })?;

        let local_bytes = tokio::fs::read(local_path).await.map_err(|e| Error::io(local_path, e))?;
        let local_hash = apt_core::hash::ContentHasher::hash_reader(local_bytes.as_slice()).map_err(|e| Error::io(local_path, e))?[1].hex.clone();

        let chain = diff_index
            .chain_from(&local_hash)
            .ok_or_else(|| Error::DiffChainBroken { path: local_path.display().to_string() })?;

        let mut working = local_bytes;
        for patch in &chain {
            let patch_uri = format!(
                "{}/dists/{}/{component}/binary-{architecture}/Packages.diff/{}.gz",
                repo.base_uri.trim_end_matches('/'),
                repo.distribution,
                patch.version,
            );
            let patch_body = self.get(&patch_uri).await?;
            let script = compress::decompress(Compression::Gz, &patch_body, local_path)?;
            let computed = apt_core::hash::ContentHasher::hash_reader(script.as_slice()).map_err(|e| Error::io(local_path, e))?;
            if !computed[1].hex.eq_ignore_ascii_case(&patch.hash) {
                return Err(Error::HashMismatch { uri: patch_uri, expected: patch.hash.clone(), actual: computed[1].hex.clone() });
            }
            working = apply_ed_script(&working, &script).await?;
        }

        let final_hash = apt_core::hash::ContentHasher::hash_reader(working.as_slice()).map_err(|e| Error::io(local_path, e))?[1].hex.clone();
        if !final_hash.eq_ignore_ascii_case(&diff_index.current_hash) {
            return Err(Error::DiffChainBroken { path: local_path.display().to_string() });
        }

        atomic_write(local_path, &working)?;
        info!(path = %local_path.display(), patches = chain.len(), "applied diff-index patch chain");
        Ok(())
    }

    /// Step 5: delete files in the lists directory not owned by any
    /// currently-configured repository.
    fn clean_lists(&self, repositories: &[RepositoryEntry]) -> Result<()> {
        let mut owned = ahash::AHashSet::new();
        owned.insert("lock".to_string());
        for repo in repositories {
            for component in &repo.components {
                for architecture in &repo.architectures {
                    if let Some(name) = self.local_index_path(repo, component, architecture, IndexKind::Packages).file_name() {
                        owned.insert(name.to_string_lossy().into_owned());
                    }
                }
                for language in &repo.languages {
                    if let Some(name) = self.local_index_path(repo, component, language, IndexKind::Translation).file_name() {
                        owned.insert(name.to_string_lossy().into_owned());
                    }
                }
            }
        }

        for entry in std::fs::read_dir(&self.lists_dir).map_err(|e| Error::io(&self.lists_dir, e))? {
            let entry = entry.map_err(|e| Error::io(&self.lists_dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !owned.contains(&name) {
                debug!(file = %name, "list-cleanup removing stale file");
                let _ = std::fs::remove_file(entry.path());
            }
        }
        Ok(())
    }

    fn local_index_path(&self, repo: &RepositoryEntry, component: &str, selector: &str, kind: IndexKind) -> PathBuf {
        let stem = match kind {
            IndexKind::Packages => format!("{}_dists_{}_{component}_binary-{selector}_Packages", sanitize(&repo.base_uri), repo.distribution),
            IndexKind::Translation => format!("{}_dists_{}_{component}_i18n_Translation-{selector}", sanitize(&repo.base_uri), repo.distribution),
        };
        self.lists_dir.join(stem)
    }

    fn compression_order(&self) -> Vec<String> {
        let mut extensions: Vec<(String, i32)> = self.worker_config.compression_priority.iter().map(|(k, v)| (k.clone(), *v)).collect();
        extensions.sort_by(|a, b| b.1.cmp(&a.1));
        extensions.into_iter().map(|(k, _)| k).collect()
    }

    async fn get(&self, uri: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(uri)
            .send()
            .await
            .map_err(|e| Error::Request { uri: uri.to_string(), message: e.to_string() })?;
        let response = response
            .error_for_status()
            .map_err(|e| Error::Request { uri: uri.to_string(), message: e.to_string() })?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::Request { uri: uri.to_string(), message: e.to_string() })
    }
}

#[derive(Debug, Clone, Copy)]
enum IndexKind {
    Packages,
    Translation,
}

fn first_stanza(data: &[u8]) -> Result<rfc822::Stanza> {
    rfc822::parse_all(data)
        .map_err(|e| Error::Io { path: PathBuf::from("<release>"), message: e.to_string() })?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Io { path: PathBuf::from("<release>"), message: "empty Release file".to_string() })
}

fn sanitize(uri: &str) -> String {
    uri.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect()
}

fn path_relative_to_release(uri: &str, base_uri: &str) -> String {
    uri.strip_prefix(base_uri.trim_end_matches('/'))
        .map(|s| s.trim_start_matches('/').to_string())
        .unwrap_or_else(|| uri.to_string())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("new");
    std::fs::write(&tmp_path, data).map_err(|e| Error::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, path).map_err(|e| Error::io(path, e))?;
    Ok(())
}

async fn red_available() -> bool {
    Command::new("red").arg("--version").stdout(Stdio::null()).stderr(Stdio::null()).status().await.is_ok()
}

/// Apply an ed script to `base` via `red -s`, piping the script
/// followed by a `w` command (§4.5.1 step 3).
async fn apply_ed_script(base: &[u8], script: &[u8]) -> Result<Vec<u8>> {
    static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    let tmp_dir = std::env::temp_dir();
    let working_path = tmp_dir.join(format!("apt-fetch-diff-{}-{id:x}", std::process::id()));
    tokio::fs::write(&working_path, base).await.map_err(|e| Error::io(&working_path, e))?;

    let mut child = Command::new("red")
        .arg("-s")
        .arg(&working_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| Error::RedUnavailable)?;

    {
        let stdin = child.stdin.as_mut().ok_or(Error::RedUnavailable)?;
        stdin.write_all(script).await.map_err(|e| Error::io(&working_path, e))?;
        stdin.write_all(b"w\n").await.map_err(|e| Error::io(&working_path, e))?;
    }
    let status = child.wait().await.map_err(|e| Error::io(&working_path, e))?;
    if !status.success() {
        let _ = tokio::fs::remove_file(&working_path).await;
        return Err(Error::DiffChainBroken { path: working_path.display().to_string() });
    }

    let result = tokio::fs::read(&working_path).await.map_err(|e| Error::io(&working_path, e))?;
    let _ = tokio::fs::remove_file(&working_path).await;
    Ok(result)
}

async fn run_hook(command: &str) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .await
        .map_err(|e| Error::Io { path: PathBuf::from(command), message: e.to_string() })?;
    if !status.success() {
        return Err(Error::Io { path: PathBuf::from(command), message: format!("hook exited with {status}") });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_uri_picks_inline_or_detached() {
        let repo = RepositoryEntry {
            base_uri: "http://deb.debian.org/debian".to_string(),
            distribution: "bookworm".to_string(),
            components: vec!["main".to_string()],
            architectures: vec!["amd64".to_string()],
            languages: vec![],
            trusted: false,
            label: "bookworm main".to_string(),
        };
        assert_eq!(repo.release_uri(true), "http://deb.debian.org/debian/dists/bookworm/InRelease");
        assert_eq!(repo.release_uri(false), "http://deb.debian.org/debian/dists/bookworm/Release");
    }

    #[test]
    fn path_relative_to_release_strips_base() {
        let relative = path_relative_to_release("http://example/debian/dists/x/main/binary-amd64/Packages.xz", "http://example/debian");
        assert_eq!(relative, "dists/x/main/binary-amd64/Packages.xz");
    }
}
