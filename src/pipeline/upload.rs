//! Upload stage: multipart body → validated PDF on disk plus record metadata.
//!
//! Parsing and validation are split so the validation order stays in one
//! place: file part, then the four fields, then the filename checks.

use crate::error::DocsumError;
use crate::record::{RecordFields, RecordMeta};
use axum::extract::Multipart;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// The `file` part of an upload.
#[derive(Debug, Clone)]
pub struct UploadedPdf {
    /// Client-supplied file name, empty when the part had none.
    pub filename: String,
    pub data: Vec<u8>,
}

/// Everything a `/summarize` request carried, before validation.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedPdf>,
    pub fields: RecordFields,
}

/// An upload that passed validation.
#[derive(Debug)]
pub struct ValidatedUpload {
    pub filename: String,
    pub data: Vec<u8>,
    pub meta: RecordMeta,
}

/// Read every part of a multipart body. Unknown parts are drained and ignored.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadForm, DocsumError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DocsumError::InvalidUpload(format!("failed to read form field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| DocsumError::InvalidUpload(format!("failed to read file data: {e}")))?
                    .to_vec();
                debug!("Received file part '{}' ({} bytes)", filename, data.len());
                form.file = Some(UploadedPdf { filename, data });
            }
            "apiFunction" | "documentID" | "dataSearchField" | "dataField" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| DocsumError::InvalidUpload(format!("failed to read {name}: {e}")))?;
                let slot = match name.as_str() {
                    "apiFunction" => &mut form.fields.api_function,
                    "documentID" => &mut form.fields.document_id,
                    "dataSearchField" => &mut form.fields.data_search_field,
                    _ => &mut form.fields.data_field,
                };
                *slot = Some(value);
            }
            _ => {
                field.bytes().await.map_err(|e| {
                    DocsumError::InvalidUpload(format!("failed to read {name}: {e}"))
                })?;
            }
        }
    }

    Ok(form)
}

impl UploadForm {
    /// Apply the request checks in their fixed order.
    pub fn validate(self) -> Result<ValidatedUpload, DocsumError> {
        let file = self.file.ok_or(DocsumError::MissingFile)?;
        let meta = self.fields.validate()?;

        if file.filename.is_empty() {
            return Err(DocsumError::EmptyFilename);
        }
        if !has_pdf_extension(&file.filename) {
            return Err(DocsumError::NotAPdf {
                filename: file.filename,
            });
        }

        Ok(ValidatedUpload {
            filename: file.filename,
            data: file.data,
            meta,
        })
    }
}

/// Case-insensitive `.pdf` suffix check. Content is not sniffed; a file that
/// is not really a PDF fails later at extraction.
pub fn has_pdf_extension(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".pdf")
}

/// Write upload bytes to a temporary `.pdf` file removed when dropped.
pub async fn persist_temp(data: &[u8], dir: Option<&Path>) -> Result<NamedTempFile, DocsumError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("docsum-upload-").suffix(".pdf");
    let temp = match dir {
        Some(d) => builder.tempfile_in(d),
        None => builder.tempfile(),
    }
    .map_err(|e| DocsumError::Internal(format!("cannot create upload temp file: {e}")))?;

    tokio::fs::write(temp.path(), data)
        .await
        .map_err(|e| DocsumError::Internal(format!("cannot write upload temp file: {e}")))?;

    info!("Upload staged at {} ({} bytes)", temp.path().display(), data.len());
    Ok(temp)
}
