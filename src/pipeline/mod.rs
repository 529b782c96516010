//! Pipeline stages for PDF summarization.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped (a different OCR engine, a different model server)
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ render ──▶ extract ──▶ llm
//! (multipart) (pdfium)   (text│OCR)   (generate)
//!                 │          ▲
//!                 └─▶ ocr ───┘
//! ```
//!
//! 1. [`upload`]  — validate the four record fields and the uploaded file
//! 2. [`render`]  — open the PDF with pdfium, read text layers, rasterise pages
//! 3. [`ocr`]     — recognise text in a rasterised page
//! 4. [`extract`] — per-page policy: text layer first, OCR fallback
//! 5. [`llm`]     — one call to the generation endpoint; the only stage with
//!    network I/O

pub mod extract;
pub mod llm;
pub mod ocr;
pub mod render;
pub mod upload;
