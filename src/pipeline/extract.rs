//! Text extraction policy: text layer first, OCR per page as fallback.
//!
//! Each page ends in exactly one [`PageOutcome`]. A page whose OCR step
//! fails does not abort the document; the failure is logged and kept in the
//! page report, and the next page is processed. The document as a whole
//! fails only when it cannot be opened or when no page contributed text.

use crate::config::ServiceConfig;
use crate::error::{DocsumError, PageError};
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::render::{self, PdfiumPages};
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Random access to the pages of an open document.
///
/// Indices are 0-based. Implemented by [`PdfiumPages`] and by in-memory
/// fakes in tests.
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Raw text layer of the page, possibly empty.
    fn text_layer(&self, index: usize) -> Result<String, PageError>;

    /// Rasterise the page for OCR.
    fn rasterise(&self, index: usize) -> Result<DynamicImage, PageError>;
}

/// How a single page contributed to the extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "detail", rename_all = "snake_case")]
pub enum PageOutcome {
    /// The text layer was non-empty and used verbatim.
    TextLayer(String),
    /// The text layer was empty and OCR produced text.
    Ocr(String),
    /// Neither the text layer nor OCR produced anything.
    Empty,
    /// The text layer was empty and rasterisation or OCR errored.
    OcrFailed(PageError),
}

impl PageOutcome {
    /// Text this page contributed, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            PageOutcome::TextLayer(t) | PageOutcome::Ocr(t) => Some(t),
            PageOutcome::Empty | PageOutcome::OcrFailed(_) => None,
        }
    }
}

/// Per-page entry of an extraction report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageReport {
    /// 1-indexed page number.
    pub page_num: usize,
    pub outcome: PageOutcome,
}

/// Result of running the extraction policy over a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    /// Concatenated page texts, each followed by a newline.
    pub text: String,
    pub pages: Vec<PageReport>,
}

impl ExtractedText {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Number of pages on which OCR was attempted.
    pub fn ocr_attempts(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| !matches!(p.outcome, PageOutcome::TextLayer(_)))
            .count()
    }

    /// Pages whose rasterisation or OCR failed.
    pub fn failed_pages(&self) -> impl Iterator<Item = &PageReport> {
        self.pages
            .iter()
            .filter(|p| matches!(p.outcome, PageOutcome::OcrFailed(_)))
    }
}

/// Walk every page of `source` in order and apply the extraction policy.
///
/// Never fails: per-page problems are recorded in the returned report.
pub fn extract_pages<S>(source: &S, ocr: &dyn OcrEngine) -> ExtractedText
where
    S: PageSource + ?Sized,
{
    let total = source.page_count();
    let mut out = ExtractedText {
        text: String::new(),
        pages: Vec::with_capacity(total),
    };

    for index in 0..total {
        let page_num = index + 1;

        let layer = source.text_layer(index).unwrap_or_else(|e| {
            warn!("{}", e);
            String::new()
        });

        let outcome = if !layer.trim().is_empty() {
            debug!("Page {}: extracted text directly", page_num);
            PageOutcome::TextLayer(layer)
        } else {
            debug!("Page {}: no text layer, attempting OCR", page_num);
            match source
                .rasterise(index)
                .and_then(|image| ocr.recognise(page_num, &image))
            {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("Page {}: extracted text via OCR", page_num);
                    PageOutcome::Ocr(text)
                }
                Ok(_) => {
                    debug!("Page {}: OCR did not yield any text", page_num);
                    PageOutcome::Empty
                }
                Err(e) => {
                    warn!("{}", e);
                    PageOutcome::OcrFailed(e)
                }
            }
        };

        if let Some(text) = outcome.text() {
            out.text.push_str(text);
            out.text.push('\n');
        }
        out.pages.push(PageReport { page_num, outcome });
    }

    out
}

/// Run [`extract_pages`] and turn an empty result into an error.
pub fn extract_document<S>(
    source: &S,
    ocr: &dyn OcrEngine,
    pdf_path: &Path,
) -> Result<ExtractedText, DocsumError>
where
    S: PageSource + ?Sized,
{
    let extracted = extract_pages(source, ocr);
    if extracted.is_empty() {
        return Err(DocsumError::NoTextExtracted {
            path: pdf_path.to_path_buf(),
            pages: extracted.pages.len(),
        });
    }
    info!(
        "Extracted {} chars from {} pages ({} needed OCR, {} failed)",
        extracted.text.len(),
        extracted.pages.len(),
        extracted.ocr_attempts(),
        extracted.failed_pages().count()
    );
    Ok(extracted)
}

/// Produce text from a PDF on disk.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, pdf_path: &Path) -> Result<ExtractedText, DocsumError>;
}

/// The production extractor: pdfium for text layers and rendering, an
/// [`OcrEngine`] for pages without text.
pub struct PdfiumExtractor {
    config: Arc<ServiceConfig>,
    ocr: Arc<dyn OcrEngine>,
}

impl PdfiumExtractor {
    /// Extractor using tesseract as configured.
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        let ocr = Arc::new(TesseractOcr::from_config(&config));
        Self::with_ocr(config, ocr)
    }

    pub fn with_ocr(config: Arc<ServiceConfig>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { config, ocr }
    }
}

#[async_trait]
impl TextExtractor for PdfiumExtractor {
    async fn extract(&self, pdf_path: &Path) -> Result<ExtractedText, DocsumError> {
        let config = Arc::clone(&self.config);
        let ocr = Arc::clone(&self.ocr);
        let path: PathBuf = pdf_path.to_path_buf();

        tokio::task::spawn_blocking(move || extract_with_pdfium(&config, ocr.as_ref(), &path))
            .await
            .map_err(|e| DocsumError::Internal(format!("Extraction task panicked: {e}")))?
    }
}

fn extract_with_pdfium(
    config: &ServiceConfig,
    ocr: &dyn OcrEngine,
    pdf_path: &Path,
) -> Result<ExtractedText, DocsumError> {
    let pdfium = render::bind_pdfium(config.pdfium_library.as_deref())?;
    let pages = PdfiumPages::open(
        &pdfium,
        pdf_path,
        config.pdf_password.as_deref(),
        config.max_rendered_pixels,
    )?;
    extract_document(&pages, ocr, pdf_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory document: each page is (text layer, renders?).
    struct FakeDoc {
        pages: Vec<(String, bool)>,
    }

    impl FakeDoc {
        fn new(pages: &[(&str, bool)]) -> Self {
            Self {
                pages: pages.iter().map(|(t, r)| (t.to_string(), *r)).collect(),
            }
        }
    }

    impl PageSource for FakeDoc {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn text_layer(&self, index: usize) -> Result<String, PageError> {
            Ok(self.pages[index].0.clone())
        }

        fn rasterise(&self, index: usize) -> Result<DynamicImage, PageError> {
            if self.pages[index].1 {
                Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                    4,
                    4,
                    Rgba([0, 0, 0, 255]),
                )))
            } else {
                Err(PageError::RenderFailed {
                    page: index + 1,
                    detail: "bitmap allocation failed".into(),
                })
            }
        }
    }

    /// OCR engine answering from a script, one entry per call.
    struct ScriptedOcr {
        answers: Vec<Result<String, String>>,
        calls: AtomicUsize,
    }

    impl ScriptedOcr {
        fn new(answers: Vec<Result<&str, &str>>) -> Self {
            Self {
                answers: answers
                    .into_iter()
                    .map(|a| a.map(str::to_string).map_err(str::to_string))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OcrEngine for ScriptedOcr {
        fn recognise(&self, page: usize, _image: &DynamicImage) -> Result<String, PageError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.answers[n] {
                Ok(text) => Ok(text.clone()),
                Err(detail) => Err(PageError::OcrFailed {
                    page,
                    detail: detail.clone(),
                }),
            }
        }
    }

    #[test]
    fn text_layer_is_used_verbatim_without_ocr() {
        let doc = FakeDoc::new(&[("Invoice 42\nTotal: 10 EUR", true)]);
        let ocr = ScriptedOcr::new(vec![]);

        let out = extract_pages(&doc, &ocr);

        assert_eq!(out.text, "Invoice 42\nTotal: 10 EUR\n");
        assert_eq!(ocr.calls(), 0);
        assert_eq!(
            out.pages[0].outcome,
            PageOutcome::TextLayer("Invoice 42\nTotal: 10 EUR".into())
        );
    }

    #[test]
    fn scanned_pages_are_ocred_once_each() {
        let doc = FakeDoc::new(&[("", true), ("  \n", true), ("", true)]);
        let ocr = ScriptedOcr::new(vec![Ok("first"), Ok("   "), Ok("third")]);

        let out = extract_pages(&doc, &ocr);

        assert_eq!(ocr.calls(), 3);
        assert_eq!(out.text, "first\nthird\n");
        assert_eq!(out.pages[1].outcome, PageOutcome::Empty);
        assert_eq!(out.ocr_attempts(), 3);
    }

    #[test]
    fn mixed_document_only_ocrs_empty_pages() {
        let doc = FakeDoc::new(&[("typed page", true), ("", true)]);
        let ocr = ScriptedOcr::new(vec![Ok("scanned page")]);

        let out = extract_pages(&doc, &ocr);

        assert_eq!(ocr.calls(), 1);
        assert_eq!(out.text, "typed page\nscanned page\n");
    }

    #[test]
    fn ocr_failure_is_recorded_and_processing_continues() {
        let doc = FakeDoc::new(&[("", true), ("", true)]);
        let ocr = ScriptedOcr::new(vec![Err("tesseract crashed"), Ok("page two")]);

        let out = extract_pages(&doc, &ocr);

        assert_eq!(out.text, "page two\n");
        assert!(matches!(
            out.pages[0].outcome,
            PageOutcome::OcrFailed(PageError::OcrFailed { page: 1, .. })
        ));
        assert_eq!(out.failed_pages().count(), 1);
    }

    #[test]
    fn render_failure_skips_ocr_for_that_page() {
        let doc = FakeDoc::new(&[("", false), ("", true)]);
        let ocr = ScriptedOcr::new(vec![Ok("second")]);

        let out = extract_pages(&doc, &ocr);

        assert_eq!(ocr.calls(), 1);
        assert!(matches!(
            out.pages[0].outcome,
            PageOutcome::OcrFailed(PageError::RenderFailed { page: 1, .. })
        ));
        assert_eq!(out.text, "second\n");
    }

    #[test]
    fn zero_pages_is_an_extraction_error() {
        let doc = FakeDoc::new(&[]);
        let ocr = ScriptedOcr::new(vec![]);

        let err = extract_document(&doc, &ocr, Path::new("empty.pdf")).unwrap_err();
        assert!(matches!(err, DocsumError::NoTextExtracted { pages: 0, .. }));
    }

    #[test]
    fn all_pages_empty_is_an_extraction_error() {
        let doc = FakeDoc::new(&[("", true), ("", true)]);
        let ocr = ScriptedOcr::new(vec![Ok(""), Ok("\n")]);

        let err = extract_document(&doc, &ocr, Path::new("blank.pdf")).unwrap_err();
        assert!(matches!(err, DocsumError::NoTextExtracted { pages: 2, .. }));
        assert_eq!(ocr.calls(), 2);
    }

    #[test]
    fn outcomes_serialise_with_source_tag() {
        let report = PageReport {
            page_num: 2,
            outcome: PageOutcome::Empty,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["source"], "empty");
    }
}
