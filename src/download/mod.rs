// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Concurrent Collection Download System for wallgrab
//!
//! This module downloads every file of a resolved collection with:
//! - A fixed concurrency bound (default 4 simultaneous transfers)
//! - Streamed writes with live per-file and aggregate progress
//! - Per-file failure isolation (one bad file never stops the rest)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │ DownloadManager │────▶│ GalleryClient   │
//! │ (resolve+list)  │     │ (metadata)      │
//! └────────┬────────┘     └─────────────────┘
//!          │ one task per file
//!          ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ Semaphore (N)   │◀───▶│ transfer tasks  │
//! │ slot pool       │     │ (tokio)         │
//! └─────────────────┘     └────────┬────────┘
//!                                  │ per-chunk updates
//!                                  ▼
//!                         ┌─────────────────┐
//!                         │ ProgressTracker │
//!                         │ (polled by CLI) │
//!                         └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use wallgrab::api::GalleryClient;
//! use wallgrab::download::DownloadManager;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manager = DownloadManager::new(GalleryClient::from_env());
//!
//! // Resolve first, so the progress tracker is available while running.
//! let prepared = manager.prepare("alice", "Nature", Path::new("~/walls")).await?;
//! let tracker = prepared.tracker();
//!
//! let report = prepared.execute().await;
//! println!(
//!     "{}/{} files, {} bytes",
//!     report.completed,
//!     report.completed + report.failures.len(),
//!     tracker.snapshot().transferred_bytes
//! );
//! # Ok(())
//! # }
//! ```

pub mod manager;
pub mod progress;
pub mod types;

// Re-export commonly used items
pub use manager::{DownloadManager, PreparedRun, DEFAULT_CONCURRENCY, REQUEST_TIMEOUT_SECS};
pub use progress::{AggregateProgress, ItemSnapshot, ProgressTracker};
pub use types::{
    DownloadError, FileDescriptor, RunReport, TransferError, TransferFailure, TransferStatus,
};
