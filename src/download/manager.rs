// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Coordinator for collection downloads.
//!
//! [`DownloadManager::prepare`] performs the fatal resolution phase (label ->
//! id, item listing, destination setup) and hands back a [`PreparedRun`];
//! [`PreparedRun::execute`] dispatches one task per file under a shared
//! semaphore and joins them all. Per-file failures never cancel siblings.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::api::{Collection, GalleryClient};
use crate::utils::expand_tilde;

use super::progress::ProgressTracker;
use super::types::{
    DownloadError, FileDescriptor, RunReport, TransferError, TransferFailure,
};

/// Default number of simultaneous transfers.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Base request timeout before a transfer is failed (in seconds). Covers
/// connection establishment through the end of the body.
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Map a reqwest transport failure onto the transfer error taxonomy.
fn classify_transfer(err: reqwest::Error, timeout: Duration) -> TransferError {
    if err.is_timeout() {
        TransferError::Timeout { timeout }
    } else {
        TransferError::Network(err)
    }
}

/// Coordinator for downloading a whole collection.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use wallgrab::api::GalleryClient;
/// use wallgrab::download::DownloadManager;
///
/// # async fn example() -> anyhow::Result<()> {
/// let manager = DownloadManager::new(GalleryClient::from_env()).with_concurrency(8);
/// let report = manager.run("alice", "Nature", Path::new("~/walls")).await?;
/// println!("{} done, {} failed", report.completed, report.failures.len());
/// # Ok(())
/// # }
/// ```
pub struct DownloadManager {
    client: GalleryClient,
    concurrency: usize,
    request_timeout: Duration,
}

impl DownloadManager {
    /// Create a manager with the default concurrency and timeout.
    pub fn new(client: GalleryClient) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }

    /// Set the number of simultaneous transfers. Values below 1 are treated
    /// as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the per-transfer request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Configured concurrency bound.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Configured per-transfer timeout.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Resolve the collection and set up everything a run needs, without
    /// starting any transfer.
    ///
    /// This is the fatal phase: any error here aborts the run before a single
    /// file is touched. The split from [`PreparedRun::execute`] exists so a
    /// presentation layer can grab the tracker before transfers start.
    pub async fn prepare(
        &self,
        username: &str,
        label: &str,
        dest_dir: &Path,
    ) -> Result<PreparedRun, DownloadError> {
        if username.trim().is_empty() {
            return Err(DownloadError::InvalidInput("username must not be empty"));
        }
        if label.trim().is_empty() {
            return Err(DownloadError::InvalidInput("collection label must not be empty"));
        }

        let collections = self.client.list_collections(Some(username)).await?;

        // Exact, case-sensitive match; with duplicate labels the first one in
        // listing order wins.
        let collection = collections
            .into_iter()
            .find(|collection| collection.label == label)
            .ok_or_else(|| DownloadError::CollectionNotFound {
                username: username.to_string(),
                label: label.to_string(),
            })?;

        debug!(id = collection.id, label = %collection.label, "resolved collection");

        let items = self.client.collection_items(username, collection.id).await?;
        let descriptors: Vec<FileDescriptor> = items.iter().map(FileDescriptor::from).collect();

        let dest_dir = expand_tilde(dest_dir);
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|source| DownloadError::Destination { path: dest_dir.clone(), source })?;

        let tracker = Arc::new(ProgressTracker::new(&descriptors));

        info!(
            collection = %collection.label,
            files = descriptors.len(),
            total_bytes = tracker.snapshot().total_bytes,
            "prepared download run"
        );

        Ok(PreparedRun {
            http: self.client.http().clone(),
            collection,
            descriptors,
            dest_dir,
            tracker,
            concurrency: self.concurrency,
            request_timeout: self.request_timeout,
        })
    }

    /// Resolve and download in one call: [`Self::prepare`] followed by
    /// [`PreparedRun::execute`].
    pub async fn run(
        &self,
        username: &str,
        label: &str,
        dest_dir: &Path,
    ) -> Result<RunReport, DownloadError> {
        let prepared = self.prepare(username, label, dest_dir).await?;
        Ok(prepared.execute().await)
    }
}

/// A resolved run, ready to execute.
pub struct PreparedRun {
    http: reqwest::Client,
    collection: Collection,
    descriptors: Vec<FileDescriptor>,
    dest_dir: PathBuf,
    tracker: Arc<ProgressTracker>,
    concurrency: usize,
    request_timeout: Duration,
}

impl PreparedRun {
    /// The resolved collection metadata.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Number of files this run will transfer.
    pub fn file_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Sum of the advertised file sizes.
    pub fn total_bytes(&self) -> u64 {
        self.tracker.snapshot().total_bytes
    }

    /// Destination directory, tilde-expanded.
    pub fn destination(&self) -> &Path {
        &self.dest_dir
    }

    /// Shared progress tracker for this run, for a presentation layer to poll.
    pub fn tracker(&self) -> Arc<ProgressTracker> {
        Arc::clone(&self.tracker)
    }

    /// Run every transfer under the concurrency bound and wait for all of
    /// them. An empty descriptor list completes immediately.
    ///
    /// Per-file failures are collected into the report; they never cancel or
    /// block sibling transfers.
    pub async fn execute(self) -> RunReport {
        let started_at = Utc::now();
        let total_bytes = self.tracker.snapshot().total_bytes;
        let slots = Arc::new(Semaphore::new(self.concurrency));

        let labels: Vec<(String, String)> = self
            .descriptors
            .iter()
            .map(|descriptor| (descriptor.name.clone(), descriptor.remote_url.clone()))
            .collect();

        let handles: Vec<_> = self
            .descriptors
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| {
                let http = self.http.clone();
                let dest_dir = self.dest_dir.clone();
                let tracker = Arc::clone(&self.tracker);
                let slots = Arc::clone(&slots);
                let request_timeout = self.request_timeout;
                tokio::spawn(async move {
                    transfer(http, descriptor, index, dest_dir, tracker, slots, request_timeout).await
                })
            })
            .collect();

        let mut completed = 0;
        let mut failures = Vec::new();

        for (index, (result, (name, remote_url))) in
            join_all(handles).await.into_iter().zip(labels).enumerate()
        {
            match result {
                Ok(Ok(())) => completed += 1,
                Ok(Err(failure)) => failures.push(failure),
                Err(join_error) => {
                    // The task died before reporting; make sure the tracker
                    // still reaches a terminal state.
                    self.tracker.mark_failed(index);
                    failures.push(TransferFailure {
                        name,
                        remote_url,
                        error: TransferError::Aborted(join_error.to_string()),
                    });
                }
            }
        }

        info!(
            collection = %self.collection.label,
            completed,
            failed = failures.len(),
            "download run finished"
        );

        RunReport {
            completed,
            failures,
            total_bytes,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// One transfer: acquire a slot, stream the file, keep the tracker exact.
async fn transfer(
    http: reqwest::Client,
    descriptor: FileDescriptor,
    index: usize,
    dest_dir: PathBuf,
    tracker: Arc<ProgressTracker>,
    slots: Arc<Semaphore>,
    request_timeout: Duration,
) -> Result<(), TransferFailure> {
    let outcome = fetch_file(
        &http,
        &descriptor,
        index,
        &dest_dir,
        &tracker,
        slots,
        request_timeout,
    )
    .await;

    match outcome {
        Ok(()) => {
            tracker.mark_completed(index);
            debug!(file = %descriptor.name, bytes = descriptor.size_bytes, "transfer complete");
            Ok(())
        }
        Err(error) => {
            tracker.mark_failed(index);
            warn!(file = %descriptor.name, %error, "transfer failed");
            Err(TransferFailure {
                name: descriptor.name,
                remote_url: descriptor.remote_url,
                error,
            })
        }
    }
}

async fn fetch_file(
    http: &reqwest::Client,
    descriptor: &FileDescriptor,
    index: usize,
    dest_dir: &Path,
    tracker: &ProgressTracker,
    slots: Arc<Semaphore>,
    request_timeout: Duration,
) -> Result<(), TransferError> {
    // Hold one slot for the whole transfer. The permit is released by drop on
    // every exit path below, so it cannot leak past an early return.
    let _permit = slots
        .acquire_owned()
        .await
        .map_err(|_| TransferError::Cancelled)?;

    tracker.mark_running(index);

    let response = http
        .get(&descriptor.remote_url)
        .timeout(request_timeout)
        .send()
        .await
        .map_err(|err| classify_transfer(err, request_timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TransferError::RemoteStatus { status });
    }

    let path = dest_dir.join(&descriptor.name);
    let mut file = File::create(&path)
        .await
        .map_err(|source| TransferError::Io { path: path.clone(), source })?;

    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(next) = stream.next().await {
        let chunk = next.map_err(|err| classify_transfer(err, request_timeout))?;
        let len = chunk.len() as u64;

        // Refuse to write past the advertised size, so the aggregate counter
        // can never pass its fixed total.
        if written + len > descriptor.size_bytes {
            return Err(TransferError::SizeMismatch {
                expected: descriptor.size_bytes,
                written: written + len,
            });
        }

        file.write_all(&chunk)
            .await
            .map_err(|source| TransferError::Io { path: path.clone(), source })?;
        written += len;

        // Both counters advance together, chunk by chunk.
        tracker.advance_item(index, len);
        tracker.advance_total(len);
    }

    file.flush()
        .await
        .map_err(|source| TransferError::Io { path: path.clone(), source })?;

    if written != descriptor.size_bytes {
        return Err(TransferError::SizeMismatch {
            expected: descriptor.size_bytes,
            written,
        });
    }

    Ok(())
}
