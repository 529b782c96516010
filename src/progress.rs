//! Progress-callback trait for per-record dispatch events.
//!
//! Inject an [`Arc<dyn DispatchProgressCallback>`] via
//! [`crate::dispatch::Dispatcher::with_progress`] to observe a dispatch run
//! as it walks the store. The binary uses this to drive a terminal progress
//! bar; a host application could forward events to a channel instead.
//!
//! # Example
//!
//! ```rust
//! use docsum::{DispatchProgressCallback, RecordOutcome};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     delivered: Arc<AtomicUsize>,
//! }
//!
//! impl DispatchProgressCallback for CountingCallback {
//!     fn on_record_complete(&self, _index: usize, _total: usize, outcome: &RecordOutcome) {
//!         if outcome.is_delivered() {
//!             self.delivered.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let cb: Arc<dyn DispatchProgressCallback> = Arc::new(CountingCallback {
//!     delivered: Arc::new(AtomicUsize::new(0)),
//! });
//! ```

use crate::dispatch::{DispatchReport, RecordOutcome};
use std::path::Path;
use std::sync::Arc;

/// Called by the dispatcher as it processes each record.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Records are dispatched sequentially, so calls never
/// overlap within one run.
pub trait DispatchProgressCallback: Send + Sync {
    /// Called once after the store has been listed.
    fn on_dispatch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a record is read.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the listing
    /// * `total` — records in the listing
    /// * `path`  — the record file
    fn on_record_start(&self, index: usize, total: usize, path: &Path) {
        let _ = (index, total, path);
    }

    /// Called when a record was processed, whatever its delivery outcome.
    fn on_record_complete(&self, index: usize, total: usize, outcome: &RecordOutcome) {
        let _ = (index, total, outcome);
    }

    /// Called when a record counted as an error (unreadable or not audited).
    fn on_record_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every record has been attempted.
    fn on_dispatch_complete(&self, report: &DispatchReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the dispatcher's default.
pub struct NoopProgressCallback;

impl DispatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type held by [`crate::dispatch::Dispatcher`].
pub type ProgressCallback = Arc<dyn DispatchProgressCallback>;
