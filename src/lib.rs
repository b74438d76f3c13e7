// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! wallgrab - Concurrent wallhaven.cc collection downloader
//!
//! Whole collections, four at a time.
//!
//! wallgrab resolves a human-readable collection label to its id, lists the
//! collection's wallpapers, and streams every file to a local directory under
//! a fixed concurrency bound, with live per-file and aggregate progress.
//!
//! # Core Modules
//!
//! - [`api`] - Typed client for the wallhaven v1 API (collections, items,
//!   search, settings)
//! - [`download`] - Bounded-parallel download coordinator, transfers and
//!   progress tracking
//! - [`error`] - Consistent error formatting utilities
//! - [`utils`] - Path expansion, byte formatting, secret masking

pub mod api;
pub mod download;
pub mod error;
pub mod utils;

// Re-export commonly used types from the API client
pub use api::{
    ApiError, CategoryFilter, Collection, GalleryClient, Purity, PurityFilter, SearchQuery,
    SortOrder, Sorting, Thumbs, TopRange, UserSettings, Wallpaper,
};

// Re-export download types
pub use download::{
    AggregateProgress, DownloadError, DownloadManager, FileDescriptor, ItemSnapshot, PreparedRun,
    ProgressTracker, RunReport, TransferError, TransferFailure, TransferStatus,
    DEFAULT_CONCURRENCY,
};

// Re-export error utilities
pub use error::{format_error, format_simple_error, GITHUB_ISSUES_URL};

// Re-export utility helpers
pub use utils::{expand_tilde, format_bytes, mask_sensitive};
