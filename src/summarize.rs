//! Extraction pipeline entry points: PDF → text → summary → stored record.
//!
//! Each call runs to completion before returning. Nothing is persisted unless
//! both extraction and summarization succeed.

use crate::config::ServiceConfig;
use crate::error::DocsumError;
use crate::pipeline::extract::{PdfiumExtractor, TextExtractor};
use crate::pipeline::llm::{GenerateClient, Summarizer};
use crate::pipeline::upload::{persist_temp, ValidatedUpload};
use crate::record::{RecordFields, RecordMeta, SummaryRecord};
use crate::store::RecordStore;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Result of one successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryOutcome {
    /// Client-supplied file name of the PDF.
    pub input_file: String,
    /// Where the record was written.
    pub summary_file: PathBuf,
    pub record: SummaryRecord,
    /// Pages that went through OCR.
    pub ocr_pages: usize,
    pub duration_ms: u64,
}

/// The extractor, summarizer and store wired together.
#[derive(Clone)]
pub struct SummaryPipeline {
    config: Arc<ServiceConfig>,
    extractor: Arc<dyn TextExtractor>,
    summarizer: Arc<dyn Summarizer>,
    store: RecordStore,
}

impl SummaryPipeline {
    /// Production wiring: pdfium + tesseract, the configured generation
    /// endpoint, and the configured store.
    pub fn from_config(config: Arc<ServiceConfig>) -> Result<Self, DocsumError> {
        let summarizer = GenerateClient::new(&config)?;
        Ok(Self {
            extractor: Arc::new(PdfiumExtractor::new(Arc::clone(&config))),
            summarizer: Arc::new(summarizer),
            store: RecordStore::from_config(&config),
            config,
        })
    }

    pub fn new(
        config: Arc<ServiceConfig>,
        extractor: Arc<dyn TextExtractor>,
        summarizer: Arc<dyn Summarizer>,
        store: RecordStore,
    ) -> Self {
        Self {
            config,
            extractor,
            summarizer,
            store,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Summarize a PDF already on disk and store the record.
    pub async fn summarize_pdf(
        &self,
        pdf_path: &Path,
        input_file: &str,
        meta: RecordMeta,
    ) -> Result<SummaryOutcome, DocsumError> {
        let start = Instant::now();
        info!("Summarizing '{}' as {}", input_file, meta.document_id);

        let extracted = self.extractor.extract(pdf_path).await?;
        let summary = self.summarizer.summarize(&extracted.text).await?;

        let record = meta.into_record(summary);
        let summary_file = self.store.save(&record).await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Summarized '{}' in {}ms ({} pages, {} via OCR)",
            input_file,
            duration_ms,
            extracted.pages.len(),
            extracted.ocr_attempts()
        );

        Ok(SummaryOutcome {
            input_file: input_file.to_string(),
            summary_file,
            record,
            ocr_pages: extracted.ocr_attempts(),
            duration_ms,
        })
    }

    /// Stage an upload in a temporary file and run [`Self::summarize_pdf`].
    ///
    /// The staged copy is removed once the run finishes, successful or not.
    pub async fn summarize_upload(
        &self,
        upload: ValidatedUpload,
    ) -> Result<SummaryOutcome, DocsumError> {
        let staged = persist_temp(&upload.data, None).await?;
        self.summarize_pdf(staged.path(), &upload.filename, upload.meta)
            .await
    }

    /// Store a record with a caller-supplied (or default) summary, skipping
    /// extraction and generation. Used to exercise dispatch.
    pub async fn save_test_record(
        &self,
        fields: RecordFields,
        summary: Option<String>,
    ) -> Result<(PathBuf, SummaryRecord), DocsumError> {
        let meta = fields.validate()?;
        let summary = summary.unwrap_or_else(|| self.config.default_test_summary.clone());
        let record = meta.into_record(summary);
        let path = self.store.save(&record).await?;
        Ok((path, record))
    }
}
