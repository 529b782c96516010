//! Optical character recognition for pages without a text layer.
//!
//! [`OcrEngine`] is the seam: production uses [`TesseractOcr`], which shells
//! out to the `tesseract` executable, and tests plug in scripted engines.
//! The executable only has to be on `PATH` on hosts that receive scanned PDFs.

use crate::config::ServiceConfig;
use crate::error::PageError;
use image::DynamicImage;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Recognise text in a rasterised page.
///
/// Implementations are called from a blocking thread and may block.
pub trait OcrEngine: Send + Sync {
    /// `page` is 1-indexed and only used for error reporting.
    fn recognise(&self, page: usize, image: &DynamicImage) -> Result<String, PageError>;
}

/// OCR via the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: PathBuf,
    language: String,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.ocr_binary.clone(), config.ocr_language.clone())
    }
}

impl OcrEngine for TesseractOcr {
    fn recognise(&self, page: usize, image: &DynamicImage) -> Result<String, PageError> {
        let fail = |detail: String| PageError::OcrFailed { page, detail };

        // tesseract reads from a file; the directory is removed on drop.
        let temp_dir = tempfile::tempdir().map_err(|e| fail(format!("temp dir: {e}")))?;
        let image_path = temp_dir.path().join(format!("page-{page}.png"));
        image
            .save_with_format(&image_path, image::ImageFormat::Png)
            .map_err(|e| fail(format!("PNG encoding failed: {e}")))?;

        let output = Command::new(&self.binary)
            .arg(&image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| fail(format!("failed to run {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Page {}: OCR produced {} chars", page, text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn blank_page() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 60, Rgba([255, 255, 255, 255])))
    }

    #[test]
    fn missing_binary_is_a_page_error() {
        let ocr = TesseractOcr::new("/definitely/not/tesseract", "eng");
        match ocr.recognise(4, &blank_page()) {
            Err(PageError::OcrFailed { page, detail }) => {
                assert_eq!(page, 4);
                assert!(detail.contains("failed to run"), "got: {detail}");
            }
            other => panic!("expected OcrFailed, got {other:?}"),
        }
    }

    #[test]
    fn from_config_uses_configured_language() {
        let config = ServiceConfig::builder()
            .ocr_binary("/opt/bin/tesseract")
            .ocr_language("deu")
            .build()
            .unwrap();
        let ocr = TesseractOcr::from_config(&config);
        assert_eq!(ocr.binary, PathBuf::from("/opt/bin/tesseract"));
        assert_eq!(ocr.language, "deu");
    }

    /// Needs a real tesseract on PATH.
    #[test]
    fn blank_page_yields_no_words() {
        if std::env::var("DOCSUM_E2E").is_err() {
            println!("SKIP — set DOCSUM_E2E=1 to run tesseract tests");
            return;
        }
        let ocr = TesseractOcr::new("tesseract", "eng");
        let text = ocr.recognise(1, &blank_page()).expect("tesseract should run");
        assert!(text.trim().is_empty(), "got: {text:?}");
    }
}
