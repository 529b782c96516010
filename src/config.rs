//! Service configuration.
//!
//! Every knob lives in [`ServiceConfig`], built once at startup via its
//! [`ServiceConfigBuilder`] and handed to each component behind an `Arc`.
//! Components never consult environment variables themselves; the binary
//! maps flags and `DOCSUM_*` variables onto the builder.

use crate::error::DocsumError;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Default generation endpoint (a local Ollama server).
pub const DEFAULT_GENERATE_URL: &str = "http://localhost:11434/api/generate";

/// Default model name sent with every generation request.
pub const DEFAULT_MODEL: &str = "llama3";

/// Summary stored by the diagnostic `/test-save` path when none is given.
pub const DEFAULT_TEST_SUMMARY: &str = "This is a test summary for testing purposes.";

/// Configuration shared by the extractor, summarizer, store and dispatcher.
///
/// # Example
/// ```rust
/// use docsum::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .store_dir("/var/lib/docsum/summaries")
///     .model("llama3.1")
///     .callback_timeout_secs(10)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "llama3.1");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    /// Directory holding one `<documentID>.json` file per record. Default: `summaries`.
    pub store_dir: PathBuf,

    /// Directory for the rotating diagnostic log. Default: `logs`.
    pub log_dir: PathBuf,

    /// URL of the generation endpoint. Default: [`DEFAULT_GENERATE_URL`].
    pub generate_url: String,

    /// Model name sent to the generation endpoint. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Timeout for one generation call. Default: none.
    pub generate_timeout_secs: Option<u64>,

    /// Timeout for one dispatch callback. Default: 30.
    pub callback_timeout_secs: u64,

    /// OCR executable. Default: `tesseract` (resolved through `PATH`).
    pub ocr_binary: PathBuf,

    /// OCR language code passed as `-l`. Default: `eng`.
    pub ocr_language: String,

    /// Longest edge, in pixels, of a page rasterised for OCR. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Explicit pdfium library to bind. If None, binds the system library.
    pub pdfium_library: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[serde(skip_serializing)]
    pub pdf_password: Option<String>,

    /// Summary used by `/test-save` when the request has none.
    pub default_test_summary: String,

    /// Largest accepted request body in bytes. Default: 100 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("summaries"),
            log_dir: PathBuf::from("logs"),
            generate_url: DEFAULT_GENERATE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            generate_timeout_secs: None,
            callback_timeout_secs: 30,
            ocr_binary: PathBuf::from("tesseract"),
            ocr_language: "eng".to_string(),
            max_rendered_pixels: 2000,
            pdfium_library: None,
            pdf_password: None,
            default_test_summary: DEFAULT_TEST_SUMMARY.to_string(),
            max_upload_bytes: 100 * 1024 * 1024,
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Path of the plaintext audit log inside the store.
    pub fn audit_log_path(&self) -> PathBuf {
        self.store_dir.join(crate::store::AUDIT_LOG_NAME)
    }

    /// Path of the archive directory inside the store.
    pub fn archive_dir(&self) -> PathBuf {
        self.store_dir.join(crate::store::ARCHIVE_DIR_NAME)
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn store_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.store_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn log_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.log_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn generate_url(mut self, url: impl Into<String>) -> Self {
        self.config.generate_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn generate_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.generate_timeout_secs = secs;
        self
    }

    pub fn callback_timeout_secs(mut self, secs: u64) -> Self {
        self.config.callback_timeout_secs = secs;
        self
    }

    pub fn ocr_binary(mut self, binary: impl AsRef<Path>) -> Self {
        self.config.ocr_binary = binary.as_ref().to_path_buf();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_language = lang.into();
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn pdfium_library(mut self, path: impl AsRef<Path>) -> Self {
        self.config.pdfium_library = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn pdf_password(mut self, pwd: impl Into<String>) -> Self {
        self.config.pdf_password = Some(pwd.into());
        self
    }

    pub fn default_test_summary(mut self, summary: impl Into<String>) -> Self {
        self.config.default_test_summary = summary.into();
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, DocsumError> {
        let c = &self.config;
        if !(c.generate_url.starts_with("http://") || c.generate_url.starts_with("https://")) {
            return Err(DocsumError::InvalidConfig(format!(
                "generate URL must be http(s), got '{}'",
                c.generate_url
            )));
        }
        if c.model.trim().is_empty() {
            return Err(DocsumError::InvalidConfig("model must not be empty".into()));
        }
        if c.callback_timeout_secs == 0 {
            return Err(DocsumError::InvalidConfig(
                "callback timeout must be ≥ 1 second".into(),
            ));
        }
        if c.generate_timeout_secs == Some(0) {
            return Err(DocsumError::InvalidConfig(
                "generate timeout must be ≥ 1 second when set".into(),
            ));
        }
        if c.ocr_language.trim().is_empty() {
            return Err(DocsumError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
