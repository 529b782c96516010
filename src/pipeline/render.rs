//! PDF access via pdfium: open a document, read page text layers, rasterise
//! pages for OCR.
//!
//! pdfium wraps a C++ library with thread-local state, so everything here is
//! blocking and is driven from `spawn_blocking` by
//! [`crate::pipeline::extract::PdfiumExtractor`].
//!
//! Rasterisation caps the longest edge at `max_rendered_pixels`.

use crate::error::{DocsumError, PageError};
use crate::pipeline::extract::PageSource;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Bind to pdfium, either at an explicit library path or the system library.
pub fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium, DocsumError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| DocsumError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// An open PDF document exposed as a [`PageSource`].
pub struct PdfiumPages<'a> {
    document: PdfDocument<'a>,
    render_config: PdfRenderConfig,
}

impl<'a> PdfiumPages<'a> {
    /// Open `pdf_path`, mapping pdfium's load errors onto [`DocsumError`].
    pub fn open(
        pdfium: &'a Pdfium,
        pdf_path: &Path,
        password: Option<&'a str>,
        max_pixels: u32,
    ) -> Result<Self, DocsumError> {
        let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
            let detail = format!("{e:?}");
            if detail.contains("Password") || detail.contains("password") {
                DocsumError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                DocsumError::PdfOpenFailed {
                    path: pdf_path.to_path_buf(),
                    detail,
                }
            }
        })?;

        info!(
            "PDF loaded: {} ({} pages)",
            pdf_path.display(),
            document.pages().len()
        );

        let render_config = PdfRenderConfig::new()
            .set_target_width(max_pixels as i32)
            .set_maximum_height(max_pixels as i32);

        Ok(Self {
            document,
            render_config,
        })
    }

    fn page(&self, index: usize) -> Result<PdfPage<'a>, PdfiumError> {
        self.document.pages().get(index as u16)
    }
}

impl PageSource for PdfiumPages<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn text_layer(&self, index: usize) -> Result<String, PageError> {
        let fail = |e: PdfiumError| PageError::TextLayerFailed {
            page: index + 1,
            detail: format!("{e:?}"),
        };
        let page = self.page(index).map_err(fail)?;
        let text = page.text().map_err(fail)?;
        Ok(text.all())
    }

    fn rasterise(&self, index: usize) -> Result<DynamicImage, PageError> {
        let fail = |e: PdfiumError| PageError::RenderFailed {
            page: index + 1,
            detail: format!("{e:?}"),
        };
        let page = self.page(index).map_err(fail)?;
        let bitmap = page.render_with_config(&self.render_config).map_err(fail)?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
