//! Route handlers and the mapping from pipeline errors to HTTP responses.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use super::AppState;
use crate::error::{DocsumError, ErrorKind};
use crate::pipeline::upload;
use crate::record::{RecordFields, SummaryRecord};

const EXTRACTION_FAILED: &str = "Could not extract any text from the PDF.";
const SUMMARY_FAILED: &str = "Failed to generate summary. Is the generation endpoint running?";
const SAVE_FAILED: &str = "Failed to save summary.";
const TEST_SAVE_FAILED: &str = "Failed to save test data.";

/// A JSON `{"error": ...}` response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Map a library error by kind. Client errors keep their own message;
    /// server errors get a fixed message and the detail goes to the log.
    fn from_error(e: DocsumError, storage_message: &str) -> Self {
        match e.kind() {
            ErrorKind::Validation => {
                warn!("Rejected request: {e}");
                Self::new(StatusCode::BAD_REQUEST, e.to_string())
            }
            kind => {
                error!("{e}");
                let message = match kind {
                    ErrorKind::Extraction => EXTRACTION_FAILED,
                    ErrorKind::Summarization => SUMMARY_FAILED,
                    _ => storage_message,
                };
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: &self.message,
        });
        (self.status, body).into_response()
    }
}

pub async fn index() -> &'static str {
    "docsum is running"
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub message: &'static str,
    pub input_file: String,
    pub summary_file: String,
    pub summary_content: String,
}

/// `POST /summarize`: multipart upload of one PDF plus the record fields.
pub async fn summarize(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let fail = |e: DocsumError| ApiError::from_error(e, SAVE_FAILED);

    // A body that is not multipart at all cannot carry a file part.
    let multipart = multipart.map_err(|_| fail(DocsumError::MissingFile))?;
    let form = upload::parse_multipart(multipart).await.map_err(fail)?;
    let upload = form.validate().map_err(fail)?;

    let outcome = state.pipeline.summarize_upload(upload).await.map_err(fail)?;

    Ok(Json(SummarizeResponse {
        message: "File processed successfully.",
        input_file: outcome.input_file,
        summary_file: outcome.summary_file.display().to_string(),
        summary_content: outcome.record.summary,
    }))
}

/// Query string of `POST /test-save`.
#[derive(Debug, Default, Deserialize)]
pub struct TestSaveParams {
    #[serde(rename = "apiFunction")]
    pub api_function: Option<String>,
    #[serde(rename = "documentID")]
    pub document_id: Option<String>,
    #[serde(rename = "dataSearchField")]
    pub data_search_field: Option<String>,
    #[serde(rename = "dataField")]
    pub data_field: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TestSaveResponse {
    pub message: &'static str,
    pub output_file: String,
    pub data: SummaryRecord,
}

/// `POST /test-save`: store a record without touching a PDF or the model.
pub async fn test_save(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TestSaveParams>,
) -> Result<Json<TestSaveResponse>, ApiError> {
    let fields = RecordFields {
        api_function: params.api_function,
        document_id: params.document_id,
        data_search_field: params.data_search_field,
        data_field: params.data_field,
    };

    let (path, record) = state
        .pipeline
        .save_test_record(fields, params.summary)
        .await
        .map_err(|e| ApiError::from_error(e, TEST_SAVE_FAILED))?;

    Ok(Json(TestSaveResponse {
        message: "Test data saved successfully.",
        output_file: path.display().to_string(),
        data: record,
    }))
}
