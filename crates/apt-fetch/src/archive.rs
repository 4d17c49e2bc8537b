//! The archive download manager: a long-lived worker task plus
//! per-URI performer tasks (§4.5.2). Async tasks communicating over
//! channels stand in for the spec's forked worker/performer/client
//! processes (§5), while `protocol::Verb` keeps the literal wire shape
//! available to anything that does cross a real socket.

use crate::error::{Error, Result};
use apt_cache::FileHashes;
use apt_config::DownloaderConfig;
use apt_core::hash::ContentHasher;
use fs2::FileExt;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// One client request: fetch `uri` to `target_path`, verifying against
/// `hashes` if any are declared.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// The URI to fetch.
    pub uri: String,
    /// Where the finished file should end up.
    pub target_path: PathBuf,
    /// Size declared ahead of time, if known (`set-download-size`).
    pub expected_size: Option<u64>,
    /// Declared digests to verify the download against.
    pub hashes: FileHashes,
}

/// The result of a completed download.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// The URI that was fetched.
    pub uri: String,
    /// Where the verified file ended up.
    pub path: PathBuf,
    /// True if this request was answered from an already in-flight or
    /// already-done performer rather than starting a new one.
    pub is_duplicate: bool,
}

type Waiter = oneshot::Sender<std::result::Result<DownloadOutcome, String>>;

enum WorkerMessage {
    Download(DownloadRequest, Waiter),
    PerformerDone { uri: String, result: std::result::Result<PathBuf, String> },
    Exit,
}

/// A handle to a running archive download manager. Cloning shares the
/// same worker task.
#[derive(Debug, Clone)]
pub struct ArchiveDownloadManager {
    sender: mpsc::UnboundedSender<WorkerMessage>,
}

impl ArchiveDownloadManager {
    /// Start the worker task, holding `archives/lock` for its
    /// lifetime (§5 "Shared-resource policy").
    ///
    /// # Errors
    /// Returns an error if the archive lock is already held by another
    /// instance.
    pub fn spawn(config: Arc<DownloaderConfig>, archives_dir: &Path) -> Result<Self> {
        let lock_path = archives_dir.join("lock");
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&lock_path)
            .map_err(|e| Error::io(&lock_path, e))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| Error::io(&lock_path, std::io::Error::other("archives directory is locked by another instance")))?;

        let (tx, rx) = mpsc::unbounded_channel();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();

        tokio::spawn(worker_loop(rx, tx.clone(), config, client, lock_file));
        Ok(Self { sender: tx })
    }

    /// Request a download, waiting for it (or its duplicate-sharing
    /// original) to complete.
    ///
    /// # Errors
    /// Returns [`Error::WorkerGone`] if the worker task has exited, or
    /// [`Error::DownloadFailed`]/[`Error::HashMismatch`]/
    /// [`Error::SizeMismatch`] if the download itself failed.
    pub async fn download(&self, request: DownloadRequest) -> Result<DownloadOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WorkerMessage::Download(request.clone(), tx))
            .map_err(|_| Error::WorkerGone)?;
        rx.await
            .map_err(|_| Error::WorkerGone)?
            .map_err(|message| Error::DownloadFailed { uri: request.uri, message })
    }

    /// Tell the worker to shut down; performers still in flight are
    /// left to finish (there is no OS process to SIGTERM in this
    /// in-process rendering, but no new downloads are accepted after
    /// this call).
    pub fn shutdown(&self) {
        let _ = self.sender.send(WorkerMessage::Exit);
    }
}

struct WorkerState {
    in_flight: ahash::AHashMap<String, Vec<Waiter>>,
    on_hold: VecDeque<(DownloadRequest, Waiter)>,
    active_count: usize,
    max_simultaneous: usize,
}

async fn worker_loop(
    mut rx: mpsc::UnboundedReceiver<WorkerMessage>,
    tx: mpsc::UnboundedSender<WorkerMessage>,
    config: Arc<DownloaderConfig>,
    client: reqwest::Client,
    _lock: std::fs::File,
) {
    let mut state = WorkerState {
        in_flight: ahash::AHashMap::new(),
        on_hold: VecDeque::new(),
        active_count: 0,
        max_simultaneous: config.max_simultaneous_downloads,
    };

    while let Some(message) = rx.recv().await {
        match message {
            WorkerMessage::Download(request, waiter) => {
                handle_download(&mut state, &tx, &client, request, waiter);
            }
            WorkerMessage::PerformerDone { uri, result } => {
                handle_done(&mut state, &tx, &client, uri, result);
            }
            WorkerMessage::Exit => break,
        }
    }
    info!("archive download worker shutting down");
}

fn handle_download(
    state: &mut WorkerState,
    tx: &mpsc::UnboundedSender<WorkerMessage>,
    client: &reqwest::Client,
    request: DownloadRequest,
    waiter: Waiter,
) {
    if let Some(waiters) = state.in_flight.get_mut(&request.uri) {
        debug!(uri = %request.uri, "duplicate request for in-flight download");
        waiters.push(waiter);
        return;
    }

    if state.active_count >= state.max_simultaneous {
        debug!(uri = %request.uri, "max simultaneous downloads reached, queuing on-hold");
        state.on_hold.push_back((request, waiter));
        return;
    }

    start_performer(state, tx, client, request, waiter);
}

fn start_performer(
    state: &mut WorkerState,
    tx: &mpsc::UnboundedSender<WorkerMessage>,
    client: &reqwest::Client,
    request: DownloadRequest,
    waiter: Waiter,
) {
    state.in_flight.insert(request.uri.clone(), vec![waiter]);
    state.active_count += 1;

    let tx = tx.clone();
    let client = client.clone();
    tokio::spawn(async move {
        let uri = request.uri.clone();
        let result = perform(&client, &request).await.map_err(|e| e.to_string());
        let _ = tx.send(WorkerMessage::PerformerDone { uri, result });
    });
}

fn handle_done(
    state: &mut WorkerState,
    tx: &mpsc::UnboundedSender<WorkerMessage>,
    client: &reqwest::Client,
    uri: String,
    result: std::result::Result<PathBuf, String>,
) {
    state.active_count = state.active_count.saturating_sub(1);

    if let Some(waiters) = state.in_flight.remove(&uri) {
        for (i, waiter) in waiters.into_iter().enumerate() {
            let answer = result.clone().map(|path| DownloadOutcome { uri: uri.clone(), path, is_duplicate: i > 0 });
            let _ = waiter.send(answer);
        }
    }

    if let Some((request, waiter)) = state.on_hold.pop_front() {
        debug!(uri = %request.uri, "popping on-hold download");
        start_performer(state, tx, client, request, waiter);
    }
}

/// A performer for URI `request.uri`: picks the highest-priority
/// method (here, simply `reqwest` — no alternate transport methods are
/// registered in this workspace), streams the body to a temp file,
/// verifies its hash, and renames it into place (§4.5.2 "A performer
/// for URI U").
async fn perform(client: &reqwest::Client, request: &DownloadRequest) -> Result<PathBuf> {
    let response = client.get(&request.uri).send().await.map_err(|e| Error::Request { uri: request.uri.clone(), message: e.to_string() })?;
    let response = response.error_for_status().map_err(|e| Error::Request { uri: request.uri.clone(), message: e.to_string() })?;

    let tmp_path = request.target_path.with_extension("part");
    let mut file = tokio::fs::File::create(&tmp_path).await.map_err(|e| Error::io(&tmp_path, e))?;

    let mut hasher = ContentHasher::new();
    let mut total = 0u64;
    let mut stream = response.bytes_stream();
    use futures_util::StreamExt;
    use tokio::io::AsyncWriteExt;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::Request { uri: request.uri.clone(), message: e.to_string() })?;
            hasher.update(&chunk);
        total += chunk.len() as u64;
        if let Some(expected) = request.expected_size {
            if total > expected {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(Error::SizeMismatch { uri: request.uri.clone(), expected, actual: total });
            }
        }
        file.write_all(&chunk).await.map_err(|e| Error::io(&tmp_path, e))?;
    }
    file.flush().await.map_err(|e| Error::io(&tmp_path, e))?;
    drop(file);

    verify_hash(&request.uri, &tmp_path, hasher, &request.hashes)?;

    tokio::fs::rename(&tmp_path, &request.target_path).await.map_err(|e| Error::io(&request.target_path, e))?;
    Ok(request.target_path.clone())
}

fn verify_hash(uri: &str, path: &Path, hasher: ContentHasher, declared: &FileHashes) -> Result<()> {
    let computed = hasher.finalize();
    for expected in [&declared.sha256, &declared.sha1, &declared.md5].into_iter().flatten() {
        if let Some(actual) = computed.iter().find(|c| c.algorithm == expected.algorithm) {
            if !apt_core::hash::verify(expected, actual) {
                warn!(uri = %uri, path = %path.display(), "hash mismatch");
                return Err(Error::HashMismatch { uri: uri.to_string(), expected: expected.hex.clone(), actual: actual.hex.clone() });
            }
            return Ok(());
        }
    }
    Ok(())
}
