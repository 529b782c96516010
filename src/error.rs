//! Error types for the docsum library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocsumError`] — **Fatal** for the operation at hand: a request cannot
//!   be answered (missing field, unreadable PDF, generation endpoint down) or
//!   a stored record cannot be used. Returned as `Err(DocsumError)`.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be rasterised or
//!   recognised, but the other pages are fine. Stored inside
//!   [`crate::pipeline::extract::PageOutcome`] so callers can tell "page had
//!   no text" apart from "OCR errored".
//!
//! Every [`DocsumError`] belongs to one [`ErrorKind`]; the HTTP layer and the
//! batch dispatcher decide what to do with an error from its kind alone.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of a [`DocsumError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller supplied a bad request. Reported as a client error.
    Validation,
    /// The PDF could not be opened or yielded no text.
    Extraction,
    /// The generation endpoint failed or answered with nothing usable.
    Summarization,
    /// A stored record is not valid JSON for a summary record.
    Parse,
    /// A dispatch callback failed. Never counted as a batch error.
    Delivery,
    /// Reading, writing or moving files in the record store failed.
    Storage,
    /// Invalid configuration.
    Config,
    /// Unexpected internal failure (task panicked, runtime unavailable).
    Internal,
}

/// All fatal errors returned by the docsum library.
///
/// Page-level failures use [`PageError`] and are stored in the extraction
/// report rather than propagated here.
#[derive(Debug, Error)]
pub enum DocsumError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The multipart request carried no `file` part.
    #[error("No file part in the request")]
    MissingFile,

    /// A required form or query field is absent or empty.
    #[error("Missing {field} parameter")]
    MissingField { field: &'static str },

    /// The `file` part has an empty file name.
    #[error("No selected file")]
    EmptyFilename,

    /// The uploaded file name does not end in `.pdf`.
    #[error("Invalid file type. Please upload a PDF.")]
    NotAPdf { filename: String },

    /// The multipart body itself could not be read.
    #[error("Malformed upload: {0}")]
    InvalidUpload(String),

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The PDF could not be opened (corrupt, truncated, not a PDF).
    #[error("Failed to open PDF '{path}': {detail}")]
    PdfOpenFailed { path: PathBuf, detail: String },

    /// The PDF requires a password but none (or a wrong one) was configured.
    #[error("PDF '{path}' is encrypted and requires a password.\nSet --pdf-password / DOCSUM_PDF_PASSWORD.")]
    PasswordRequired { path: PathBuf },

    /// Every page was processed but nothing readable came out.
    #[error("No text could be extracted from '{path}' ({pages} pages)")]
    NoTextExtracted { path: PathBuf, pages: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set DOCSUM_PDFIUM_LIB=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Summarization errors ──────────────────────────────────────────────
    /// The text handed to the summarizer was empty after trimming.
    #[error("Cannot summarize empty content")]
    EmptyInput,

    /// Connection refused, DNS failure, timeout, ...
    #[error("Generation endpoint '{url}' unreachable: {reason}")]
    GenerateUnreachable { url: String, reason: String },

    /// The generation endpoint answered with a non-2xx status.
    #[error("Generation endpoint '{url}' returned HTTP {status}")]
    GenerateStatus { url: String, status: u16 },

    /// The generation endpoint answered 2xx but the body was not understood.
    #[error("Malformed response from generation endpoint: {detail}")]
    MalformedResponse { detail: String },

    /// The generation endpoint answered with an empty summary.
    #[error("Generation endpoint returned an empty summary")]
    EmptySummary,

    // ── Record store errors ───────────────────────────────────────────────
    /// The store directory is missing.
    #[error("Record store directory '{path}' does not exist")]
    StoreUnavailable { path: PathBuf },

    /// Could not create or write a record file.
    #[error("Failed to write record '{path}': {source}")]
    RecordWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read a record file or list the store.
    #[error("Failed to read '{path}': {source}")]
    RecordReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record file exists but is not a valid summary record.
    #[error("Malformed record '{path}': {source}")]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be moved into the archive directory.
    #[error("Failed to archive '{path}': {source}")]
    ArchiveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The audit log could not be appended to.
    #[error("Failed to append to audit log '{path}': {source}")]
    AuditLogFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Delivery errors ───────────────────────────────────────────────────
    /// The callback could not be reached.
    #[error("Failed to send {document_id} to {url}: {reason}")]
    DeliveryFailed {
        document_id: String,
        url: String,
        reason: String,
    },

    /// The callback answered with a status other than 200/201.
    #[error("API returned status {status} for {document_id}")]
    DeliveryRejected {
        document_id: String,
        url: String,
        status: u16,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocsumError {
    /// The taxonomy bucket this error falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocsumError::MissingFile
            | DocsumError::MissingField { .. }
            | DocsumError::EmptyFilename
            | DocsumError::NotAPdf { .. }
            | DocsumError::InvalidUpload(_) => ErrorKind::Validation,

            DocsumError::PdfOpenFailed { .. }
            | DocsumError::PasswordRequired { .. }
            | DocsumError::NoTextExtracted { .. }
            | DocsumError::PdfiumBindingFailed(_) => ErrorKind::Extraction,

            DocsumError::EmptyInput
            | DocsumError::GenerateUnreachable { .. }
            | DocsumError::GenerateStatus { .. }
            | DocsumError::MalformedResponse { .. }
            | DocsumError::EmptySummary => ErrorKind::Summarization,

            DocsumError::MalformedRecord { .. } => ErrorKind::Parse,

            DocsumError::StoreUnavailable { .. }
            | DocsumError::RecordWriteFailed { .. }
            | DocsumError::RecordReadFailed { .. }
            | DocsumError::ArchiveFailed { .. }
            | DocsumError::AuditLogFailed { .. } => ErrorKind::Storage,

            DocsumError::DeliveryFailed { .. } | DocsumError::DeliveryRejected { .. } => {
                ErrorKind::Delivery
            }

            DocsumError::InvalidConfig(_) => ErrorKind::Config,
            DocsumError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::pipeline::extract::PageOutcome::OcrFailed`]. The
/// extraction continues with the next page.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page's text layer could not be read; the page falls through to OCR.
    #[error("Page {page}: text layer unreadable: {detail}")]
    TextLayerFailed { page: usize, detail: String },

    /// Page rasterisation failed, so OCR never ran.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The OCR engine could not be started or exited unsuccessfully.
    #[error("Page {page}: OCR failed: {detail}")]
    OcrFailed { page: usize, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_display_names_the_field() {
        let e = DocsumError::MissingField {
            field: "documentID",
        };
        assert_eq!(e.to_string(), "Missing documentID parameter");
        assert_eq!(e.kind(), ErrorKind::Validation);
    }

    #[test]
    fn not_a_pdf_message_is_stable() {
        let e = DocsumError::NotAPdf {
            filename: "notes.txt".into(),
        };
        assert_eq!(e.to_string(), "Invalid file type. Please upload a PDF.");
    }

    #[test]
    fn delivery_rejected_display() {
        let e = DocsumError::DeliveryRejected {
            document_id: "d7".into(),
            url: "http://cb".into(),
            status: 503,
        };
        assert!(e.to_string().contains("503"));
        assert!(e.to_string().contains("d7"));
        assert_eq!(e.kind(), ErrorKind::Delivery);
    }

    #[test]
    fn malformed_record_is_a_parse_error() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let e = DocsumError::MalformedRecord {
            path: PathBuf::from("summaries/bad.json"),
            source,
        };
        assert_eq!(e.kind(), ErrorKind::Parse);
        assert!(e.to_string().contains("bad.json"));
    }

    #[test]
    fn summarizer_errors_share_a_kind() {
        for e in [
            DocsumError::EmptyInput,
            DocsumError::EmptySummary,
            DocsumError::GenerateStatus {
                url: "http://localhost:11434/api/generate".into(),
                status: 500,
            },
        ] {
            assert_eq!(e.kind(), ErrorKind::Summarization, "{e}");
        }
    }

    #[test]
    fn page_error_display() {
        let e = PageError::OcrFailed {
            page: 3,
            detail: "tesseract: not found".into(),
        };
        assert!(e.to_string().starts_with("Page 3"));
    }
}
