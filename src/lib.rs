//! # docsum
//!
//! Summarise uploaded PDFs with a locally hosted language model, keep each
//! summary as a JSON record, and relay the records to per-document callback
//! URLs in batch.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST /summarize
//!  │
//!  ├─ 1. Upload    validate fields, stage the PDF in a temp file
//!  ├─ 2. Extract   per page: text layer, else rasterise + OCR (spawn_blocking)
//!  ├─ 3. Generate  one non-streaming call to the generation endpoint
//!  └─ 4. Store     <store>/<documentID>.json (atomic write, last writer wins)
//!
//! docsum dispatch
//!  │
//!  ├─ 1. List      snapshot of <store>/*.json
//!  ├─ 2. Deliver   POST each record to its apiFunction (200/201 = success)
//!  ├─ 3. Audit     one line per record in processing_log.txt
//!  └─ 4. Archive   optional move into <store>/archive/
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docsum::{Dispatcher, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder().store_dir("summaries").build()?;
//!     let report = Dispatcher::new(&config)?.dispatch_all().await?;
//!     println!("{} processed, {} errors", report.processed, report.errors);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docsum` binary (clap + anyhow + tracing-subscriber + tracing-appender + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docsum = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod dispatch;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod server;
pub mod store;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use dispatch::{DispatchReport, Dispatcher, RecordOutcome, RecordReport};
pub use error::{DocsumError, ErrorKind, PageError};
pub use pipeline::extract::{
    ExtractedText, PageOutcome, PageReport, PdfiumExtractor, TextExtractor,
};
pub use pipeline::llm::{GenerateClient, Summarizer};
pub use pipeline::ocr::{OcrEngine, TesseractOcr};
pub use progress::{DispatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{DispatchPayload, RecordFields, RecordMeta, SummaryRecord};
pub use store::RecordStore;
pub use summarize::{SummaryOutcome, SummaryPipeline};
