// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Types for collection downloads.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

use crate::api::{ApiError, Wallpaper};

/// Everything a transfer needs to know about one remote file.
///
/// Built once when the collection is resolved and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Local file name, the last path segment of the remote URL.
    pub name: String,
    /// Direct URL of the file.
    pub remote_url: String,
    /// Expected size in bytes, as reported by the gallery.
    pub size_bytes: u64,
}

impl FileDescriptor {
    pub fn new(remote_url: impl Into<String>, size_bytes: u64) -> Self {
        let remote_url = remote_url.into();
        Self {
            name: file_name_from_url(&remote_url),
            remote_url,
            size_bytes,
        }
    }
}

impl From<&Wallpaper> for FileDescriptor {
    fn from(wallpaper: &Wallpaper) -> Self {
        Self::new(wallpaper.path.clone(), wallpaper.file_size)
    }
}

/// Derive a local file name from the last path segment of a URL.
///
/// Two descriptors with the same basename resolve to the same local path and
/// the later write wins; an empty basename (URL ending in `/`) surfaces later
/// as that transfer's I/O failure.
pub fn file_name_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap_or(url).to_string()
}

/// Status of one transfer.
///
/// Transitions are `Pending -> Running -> {Completed | Failed}`; the terminal
/// states are sticky.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Waiting for a concurrency slot.
    Pending,
    /// Holding a slot, streaming bytes.
    Running,
    /// All bytes written and verified against the expected size.
    Completed,
    /// Errored; a truncated file may remain on disk.
    Failed,
}

impl TransferStatus {
    /// Returns true once the transfer can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Completed | TransferStatus::Failed)
    }

    /// Returns true while the transfer holds a concurrency slot.
    pub fn is_active(&self) -> bool {
        matches!(self, TransferStatus::Running)
    }
}

/// Error types for a single file transfer.
///
/// None of these abort the surrounding run; they are collected into the
/// [`RunReport`] while sibling transfers continue.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The file host answered with a non-success status.
    #[error("remote returned HTTP {status}")]
    RemoteStatus { status: StatusCode },

    /// The body did not match the size the gallery advertised.
    #[error("remote sent {written} bytes, expected {expected}")]
    SizeMismatch { expected: u64, written: u64 },

    /// Establishing the connection or receiving the body took too long.
    #[error("transfer timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// Local filesystem failure while writing the file.
    #[error("failed writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Transport failure other than a timeout.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The run was torn down before this transfer got a slot.
    #[error("transfer cancelled before a slot was acquired")]
    Cancelled,

    /// The transfer task itself died (panic or forced abort).
    #[error("transfer task aborted: {0}")]
    Aborted(String),
}

/// A failed transfer, identifying the file and the underlying cause.
#[derive(Debug, Error)]
#[error("{name}: {error}")]
pub struct TransferFailure {
    /// Local file name of the failed item.
    pub name: String,
    /// Remote URL the transfer was reading.
    pub remote_url: String,
    /// What went wrong.
    pub error: TransferError,
}

/// Fatal errors that abort a run before any transfer starts.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Username or collection label was empty.
    #[error("invalid request: {0}")]
    InvalidInput(&'static str),

    /// No collection with the requested label exists for that user.
    #[error("collection {label:?} not found for user {username:?}")]
    CollectionNotFound { username: String, label: String },

    /// A metadata call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The destination directory could not be created.
    #[error("cannot prepare destination {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one coordinator run.
#[derive(Debug)]
pub struct RunReport {
    /// Number of transfers that completed successfully.
    pub completed: usize,
    /// Every failed transfer, in no particular order.
    pub failures: Vec<TransferFailure>,
    /// Sum of the advertised sizes of all files in the collection.
    pub total_bytes: u64,
    /// When the dispatch phase started.
    pub started_at: DateTime<Utc>,
    /// When the last transfer finished.
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// True when every transfer completed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Wall-clock duration of the dispatch phase.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://w.wallhaven.cc/full/94/sunset.jpg"),
            "sunset.jpg"
        );
        assert_eq!(file_name_from_url("no-slashes"), "no-slashes");
        // Trailing slash yields an empty name; the transfer fails later with
        // an I/O error instead of being silently renamed.
        assert_eq!(file_name_from_url("https://host/dir/"), "");
    }

    #[test]
    fn test_descriptor_from_wallpaper() {
        let body = r#"{
            "id": "94x38z",
            "purity": "sfw",
            "file_size": 500,
            "path": "https://w.wallhaven.cc/full/94/sunset.jpg",
            "thumbs": {"large": "l", "original": "o", "small": "s"}
        }"#;
        let wallpaper: Wallpaper = serde_json::from_str(body).unwrap();

        let descriptor = FileDescriptor::from(&wallpaper);
        assert_eq!(descriptor.name, "sunset.jpg");
        assert_eq!(descriptor.size_bytes, 500);
        assert_eq!(descriptor.remote_url, wallpaper.path);
    }

    #[test]
    fn test_status_terminality() {
        assert!(!TransferStatus::Pending.is_terminal());
        assert!(!TransferStatus::Running.is_terminal());
        assert!(TransferStatus::Completed.is_terminal());
        assert!(TransferStatus::Failed.is_terminal());
        assert!(TransferStatus::Running.is_active());
        assert!(!TransferStatus::Completed.is_active());
    }

    #[test]
    fn test_report_success() {
        let now = Utc::now();
        let report = RunReport {
            completed: 2,
            failures: vec![],
            total_bytes: 1700,
            started_at: now,
            finished_at: now,
        };
        assert!(report.is_success());

        let report = RunReport {
            completed: 1,
            failures: vec![TransferFailure {
                name: "forest.jpg".into(),
                remote_url: "https://host/forest.jpg".into(),
                error: TransferError::Timeout { timeout: Duration::from_secs(10) },
            }],
            total_bytes: 1700,
            started_at: now,
            finished_at: now,
        };
        assert!(!report.is_success());
        assert!(report.failures[0].to_string().contains("forest.jpg"));
    }
}
