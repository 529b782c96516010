//! Batch dispatch: forward every stored summary to its callback URL.
//!
//! Records are handled strictly one at a time against a snapshot of the
//! store listing. Per record:
//!
//! 1. read and parse (failure: counted as an error, no audit line);
//! 2. POST the payload to `apiFunction` if it is non-empty;
//! 3. append an audit line, whatever the delivery outcome;
//! 4. count the record as processed.
//!
//! Delivery failures are logged and reported per record but never raise the
//! error count. Archival is a separate step ([`RecordStore::archive_all`]).

use crate::config::ServiceConfig;
use crate::error::DocsumError;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::record::{DispatchPayload, SummaryRecord, UNKNOWN_DOCUMENT_ID};
use crate::store::RecordStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// What happened to one record during a dispatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Callback answered 200 or 201.
    Delivered { status: u16 },
    /// Callback answered with any other status.
    Rejected { status: u16 },
    /// Callback could not be reached (refused, DNS, timeout).
    Failed { reason: String },
    /// No callback URL on the record.
    Skipped,
    /// The file could not be read or parsed. Counted as an error.
    Unreadable { reason: String },
}

impl RecordOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, RecordOutcome::Delivered { .. })
    }
}

/// Per-record entry in a [`DispatchReport`].
#[derive(Debug, Clone, Serialize)]
pub struct RecordReport {
    pub path: PathBuf,
    /// `None` when the record never parsed.
    pub document_id: Option<String>,
    pub outcome: RecordOutcome,
    /// Set when the record could not be audited; such records count as errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordReport {
    /// Whether this record raised the run's error count.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || matches!(self.outcome, RecordOutcome::Unreadable { .. })
    }
}

/// Result of one [`Dispatcher::dispatch_all`] run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    /// Records read, offered for delivery and audited.
    pub processed: usize,
    /// Records that could not be read, parsed or audited.
    pub errors: usize,
    /// Processed records whose callback answered 200/201.
    pub delivered: usize,
    /// Processed records with a callback that was rejected or unreachable.
    pub undelivered: usize,
    pub records: Vec<RecordReport>,
    pub duration_ms: u64,
}

impl DispatchReport {
    /// Paths of the records this run processed, in dispatch order.
    pub fn processed_paths(&self) -> Vec<&Path> {
        self.records
            .iter()
            .filter(|r| !r.is_error())
            .map(|r| r.path.as_path())
            .collect()
    }

    fn push(&mut self, entry: RecordReport) {
        if entry.is_error() {
            self.errors += 1;
        } else {
            self.processed += 1;
            match &entry.outcome {
                RecordOutcome::Delivered { .. } => self.delivered += 1,
                RecordOutcome::Rejected { .. } | RecordOutcome::Failed { .. } => {
                    self.undelivered += 1
                }
                RecordOutcome::Skipped | RecordOutcome::Unreadable { .. } => {}
            }
        }
        self.records.push(entry);
    }
}

/// Sends stored records to their callbacks.
pub struct Dispatcher {
    store: RecordStore,
    client: reqwest::Client,
    progress: ProgressCallback,
}

impl Dispatcher {
    /// Dispatcher over the configured store with the configured callback timeout.
    pub fn new(config: &ServiceConfig) -> Result<Self, DocsumError> {
        Self::with_store(
            RecordStore::from_config(config),
            Duration::from_secs(config.callback_timeout_secs),
        )
    }

    pub fn with_store(store: RecordStore, callback_timeout: Duration) -> Result<Self, DocsumError> {
        let client = reqwest::Client::builder()
            .timeout(callback_timeout)
            .build()
            .map_err(|e| DocsumError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            store,
            client,
            progress: Arc::new(NoopProgressCallback),
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Run one pass over every record currently in the store.
    ///
    /// Fails only when the store itself cannot be listed.
    pub async fn dispatch_all(&self) -> Result<DispatchReport, DocsumError> {
        let start = Instant::now();
        let paths = self.store.list_all().await?;
        let total = paths.len();

        if total == 0 {
            info!("No JSON files found to process");
        } else {
            info!("Found {} JSON files to process", total);
        }
        self.progress.on_dispatch_start(total);

        let mut report = DispatchReport::default();
        for (i, path) in paths.iter().enumerate() {
            let index = i + 1;
            self.progress.on_record_start(index, total, path);

            let entry = self.dispatch_one(path).await;
            match (&entry.error, &entry.outcome) {
                (Some(e), _) | (None, RecordOutcome::Unreadable { reason: e }) => {
                    self.progress.on_record_error(index, total, e)
                }
                (None, outcome) => self.progress.on_record_complete(index, total, outcome),
            }
            report.push(entry);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Processing complete: {} successful, {} errors",
            report.processed, report.errors
        );
        self.progress.on_dispatch_complete(&report);
        Ok(report)
    }

    async fn dispatch_one(&self, path: &Path) -> RecordReport {
        let record = match self.store.read(path).await {
            Ok(record) => record,
            Err(e) => {
                error!("{e}");
                return RecordReport {
                    path: path.to_path_buf(),
                    document_id: None,
                    outcome: RecordOutcome::Unreadable {
                        reason: e.to_string(),
                    },
                    error: None,
                };
            }
        };

        let document_id = if record.document_id.is_empty() {
            UNKNOWN_DOCUMENT_ID.to_string()
        } else {
            record.document_id.clone()
        };
        info!("Processing document: {}", document_id);

        let outcome = self.deliver(&record, &document_id).await;

        let error = match self.store.append_audit(&document_id).await {
            Ok(()) => None,
            Err(e) => {
                error!("{e}");
                Some(e.to_string())
            }
        };

        RecordReport {
            path: path.to_path_buf(),
            document_id: Some(document_id),
            outcome,
            error,
        }
    }

    async fn deliver(&self, record: &SummaryRecord, document_id: &str) -> RecordOutcome {
        let url = record.api_function.as_str();
        if url.is_empty() {
            return RecordOutcome::Skipped;
        }

        let mut payload = DispatchPayload::from_record(record, processed_at_now());
        payload.document_id = document_id.to_string();

        match self.client.post(url).json(&payload).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status == 200 || status == 201 {
                    info!("Successfully sent {} to {}", document_id, url);
                    RecordOutcome::Delivered { status }
                } else {
                    let e = DocsumError::DeliveryRejected {
                        document_id: document_id.to_string(),
                        url: url.to_string(),
                        status,
                    };
                    warn!("{e}");
                    RecordOutcome::Rejected { status }
                }
            }
            Err(err) => {
                let e = DocsumError::DeliveryFailed {
                    document_id: document_id.to_string(),
                    url: url.to_string(),
                    reason: err.to_string(),
                };
                warn!("{e}");
                RecordOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Local time as ISO-8601 with microseconds and no offset.
fn processed_at_now() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}
