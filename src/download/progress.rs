// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shared progress accounting for a download run.
//!
//! One tracker lives for the duration of a run. Transfers advance their own
//! item counter and the aggregate counter as each chunk lands; the
//! presentation layer polls [`ProgressTracker::snapshot`] and
//! [`ProgressTracker::item_snapshots`] to render whatever it likes. Readers
//! may observe a snapshot slightly behind the writers, but no increment is
//! ever lost: once every transfer is terminal the aggregate equals the exact
//! sum of bytes written.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use super::types::{FileDescriptor, TransferStatus};

/// Per-item progress state, owned by the tracker and updated by exactly one
/// transfer task.
struct ItemProgress {
    name: String,
    size_bytes: u64,
    transferred: AtomicU64,
    status: Mutex<TransferStatus>,
}

/// Point-in-time view of the aggregate counters.
#[derive(Debug, Clone, Copy)]
pub struct AggregateProgress {
    /// Sum of the advertised sizes of every file in the run.
    pub total_bytes: u64,
    /// Bytes written across all transfers so far.
    pub transferred_bytes: u64,
}

impl AggregateProgress {
    /// Progress percentage (0-100), or `None` for an empty run.
    pub fn percentage(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            None
        } else {
            Some((self.transferred_bytes as f64 / self.total_bytes as f64) * 100.0)
        }
    }
}

/// Point-in-time view of one item.
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    pub name: String,
    pub size_bytes: u64,
    pub transferred: u64,
    pub status: TransferStatus,
}

/// Concurrency-safe progress counters for one run.
pub struct ProgressTracker {
    total_bytes: u64,
    transferred: AtomicU64,
    items: Vec<ItemProgress>,
}

impl ProgressTracker {
    /// Build a tracker for the given descriptor list. The aggregate total is
    /// fixed here and never recomputed mid-run.
    pub fn new(descriptors: &[FileDescriptor]) -> Self {
        let items = descriptors
            .iter()
            .map(|descriptor| ItemProgress {
                name: descriptor.name.clone(),
                size_bytes: descriptor.size_bytes,
                transferred: AtomicU64::new(0),
                status: Mutex::new(TransferStatus::Pending),
            })
            .collect::<Vec<_>>();

        Self {
            total_bytes: items.iter().map(|item| item.size_bytes).sum(),
            transferred: AtomicU64::new(0),
            items,
        }
    }

    /// Number of items in the run.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Advance the aggregate counter by `n` bytes.
    pub fn advance_total(&self, n: u64) {
        let previous = self.transferred.fetch_add(n, Ordering::Relaxed);
        debug_assert!(previous + n <= self.total_bytes, "aggregate progress past total");
    }

    /// Advance one item's counter by `n` bytes.
    pub fn advance_item(&self, item: usize, n: u64) {
        self.items[item].transferred.fetch_add(n, Ordering::Relaxed);
    }

    /// Transition an item `Pending -> Running`. Any other current state is
    /// left untouched.
    pub fn mark_running(&self, item: usize) {
        let mut status = self.status_guard(item);
        if *status == TransferStatus::Pending {
            *status = TransferStatus::Running;
        }
    }

    /// Transition an item `Running -> Completed`. Terminal states are sticky.
    pub fn mark_completed(&self, item: usize) {
        let mut status = self.status_guard(item);
        if *status == TransferStatus::Running {
            *status = TransferStatus::Completed;
        }
    }

    /// Transition an item to `Failed`, from either `Pending` or `Running`.
    /// Terminal states are sticky.
    pub fn mark_failed(&self, item: usize) {
        let mut status = self.status_guard(item);
        if !status.is_terminal() {
            *status = TransferStatus::Failed;
        }
    }

    /// Current status of one item.
    pub fn status(&self, item: usize) -> TransferStatus {
        *self.status_guard(item)
    }

    /// Aggregate counters as of now. May lag in-flight writers; exact once
    /// every item is terminal.
    pub fn snapshot(&self) -> AggregateProgress {
        AggregateProgress {
            total_bytes: self.total_bytes,
            transferred_bytes: self.transferred.load(Ordering::Relaxed),
        }
    }

    /// Per-item counters as of now, in descriptor order.
    pub fn item_snapshots(&self) -> Vec<ItemSnapshot> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| ItemSnapshot {
                name: item.name.clone(),
                size_bytes: item.size_bytes,
                transferred: item.transferred.load(Ordering::Relaxed),
                status: self.status(index),
            })
            .collect()
    }

    /// True once every item is terminal. Vacuously true for an empty run.
    pub fn is_finished(&self) -> bool {
        self.items
            .iter()
            .enumerate()
            .all(|(index, _)| self.status(index).is_terminal())
    }

    /// Lock one item's status, recovering the guard if a writer panicked.
    fn status_guard(&self, item: usize) -> MutexGuard<'_, TransferStatus> {
        self.items[item]
            .status
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
