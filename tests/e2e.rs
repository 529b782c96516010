//! End-to-end integration tests for docsum.
//!
//! The upload → store → dispatch → archive flow runs everywhere with stub
//! extraction and generation. Tests that need a real pdfium library, a
//! tesseract binary, or a running Ollama server are gated behind the
//! `DOCSUM_E2E` environment variable.
//!
//! Run the gated tests with:
//!   DOCSUM_E2E=1 DOCSUM_PDFIUM_LIB=/path/to/libpdfium.so cargo test --test e2e -- --nocapture

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use docsum::server::{router, AppState};
use docsum::{
    DocsumError, Dispatcher, ExtractedText, GenerateClient, NoopProgressCallback,
    PageOutcome, PdfiumExtractor, RecordStore, ServiceConfig, Summarizer, SummaryPipeline,
    SummaryRecord, TextExtractor,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless DOCSUM_E2E is set.
macro_rules! e2e_skip_unless_enabled {
    () => {{
        if std::env::var("DOCSUM_E2E").is_err() {
            println!("SKIP — set DOCSUM_E2E=1 to run e2e tests");
            return;
        }
    }};
}

/// Extractor that checks the staged upload and returns fixed text.
struct StagedText(&'static str);

#[async_trait]
impl TextExtractor for StagedText {
    async fn extract(&self, path: &Path) -> Result<ExtractedText, DocsumError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            DocsumError::Internal(format!("staged upload unreadable: {e}"))
        })?;
        assert!(bytes.starts_with(b"%PDF"), "staged upload is not the PDF");
        Ok(ExtractedText {
            text: format!("{}\n", self.0),
            pages: Vec::new(),
        })
    }
}

/// Summarizer that always answers `S`.
struct AlwaysS;

#[async_trait]
impl Summarizer for AlwaysS {
    async fn summarize(&self, text: &str) -> Result<String, DocsumError> {
        assert!(!text.trim().is_empty());
        Ok("S".into())
    }
}

fn config_for(store: &Path) -> Arc<ServiceConfig> {
    let mut builder = ServiceConfig::builder().store_dir(store);
    if let Ok(lib) = std::env::var("DOCSUM_PDFIUM_LIB") {
        builder = builder.pdfium_library(lib);
    }
    Arc::new(builder.build().unwrap())
}

fn stub_app(store: &Path) -> Router {
    let pipeline = SummaryPipeline::new(
        config_for(store),
        Arc::new(StagedText("Quarterly results were strong.")),
        Arc::new(AlwaysS),
        RecordStore::new(store),
    );
    router(Arc::new(AppState { pipeline }))
}

fn summarize_request(fields: &[(&str, &str)], filename: &str, pdf: &[u8]) -> Request<Body> {
    const BOUNDARY: &str = "e2e-boundary-7f3a";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(pdf);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/summarize")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Callback endpoint recording every payload it receives.
async fn spawn_callback() -> (String, Arc<Mutex<Vec<serde_json::Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let app = Router::new().route(
        "/hook",
        post(move |Json(body): Json<serde_json::Value>| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().unwrap().push(body);
                StatusCode::CREATED
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/hook"), seen)
}

/// A one-page PDF. With `text`, the page carries a Helvetica text layer;
/// without, the page is blank and has no content stream.
fn minimal_pdf(text: Option<&str>) -> Vec<u8> {
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
    ];
    match text {
        Some(text) => {
            let content = format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET");
            objects.push(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
                 /Resources << /Font << /F1 5 0 R >> >> >>"
                    .to_string(),
            );
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ));
            objects.push("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string());
        }
        None => objects.push(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> >>".to_string(),
        ),
    }

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

fn write_pdf(dir: &Path, name: &str, text: Option<&str>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, minimal_pdf(text)).unwrap();
    path
}

// ── Upload → store → dispatch → archive ─────────────────────────────────────

#[tokio::test]
async fn test_upload_stores_exact_record() {
    let dir = tempfile::tempdir().unwrap();
    let app = stub_app(dir.path());

    let response = app
        .oneshot(summarize_request(
            &[
                ("documentID", "d1"),
                ("apiFunction", "http://cb"),
                ("dataSearchField", "a"),
                ("dataField", "b"),
            ],
            "quarterly.pdf",
            &minimal_pdf(Some("Hello")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["summary_content"], "S");
    assert_eq!(body["input_file"], "quarterly.pdf");

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("d1.json")).unwrap())
            .unwrap();
    assert_eq!(
        stored,
        serde_json::json!({
            "documentID": "d1",
            "DataSearchField": "a",
            "DataField": "b",
            "apiFunction": "http://cb",
            "summary": "S"
        })
    );
}

#[tokio::test]
async fn test_upload_then_dispatch_then_archive() {
    let dir = tempfile::tempdir().unwrap();
    let (hook, seen) = spawn_callback().await;

    for id in ["alpha", "beta"] {
        let response = stub_app(dir.path())
            .oneshot(summarize_request(
                &[
                    ("apiFunction", hook.as_str()),
                    ("documentID", id),
                    ("dataSearchField", "customer"),
                    ("dataField", "notes"),
                ],
                "in.pdf",
                &minimal_pdf(Some("Hello")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    // A record nobody can parse sits alongside the good ones.
    std::fs::write(dir.path().join("corrupt.json"), "{\"documentID\": ").unwrap();

    let store = RecordStore::new(dir.path());
    let dispatcher = Dispatcher::with_store(store.clone(), Duration::from_secs(5))
        .unwrap()
        .with_progress(Arc::new(NoopProgressCallback));
    let report = dispatcher.dispatch_all().await.unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.errors, 1);
    assert_eq!(report.delivered, 2);

    let payloads = seen.lock().unwrap().clone();
    let ids: Vec<_> = payloads
        .iter()
        .map(|p| p["documentID"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["alpha", "beta"]);
    assert!(payloads.iter().all(|p| p["summary"] == "S"));

    let audit = std::fs::read_to_string(store.audit_log_path()).unwrap();
    assert_eq!(audit.lines().count(), 2);

    assert_eq!(store.archive_paths(&report.processed_paths()).await, 2);
    assert_eq!(
        store.list_all().await.unwrap(),
        vec![dir.path().join("corrupt.json")]
    );
    assert!(dir.path().join("archive/alpha.json").exists());

    assert_eq!(store.archive_all().await.unwrap(), 1);
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_test_save_record_is_dispatchable() {
    let dir = tempfile::tempdir().unwrap();
    let (hook, seen) = spawn_callback().await;

    let uri = format!(
        "/test-save?apiFunction={}&documentID=t9&dataSearchField=x&dataField=y&summary=hello",
        hook.replace(':', "%3A").replace('/', "%2F")
    );
    let response = stub_app(dir.path())
        .oneshot(Request::post(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = Dispatcher::with_store(RecordStore::new(dir.path()), Duration::from_secs(5))
        .unwrap()
        .dispatch_all()
        .await
        .unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(seen.lock().unwrap()[0]["summary"], "hello");
}

#[test]
fn test_store_round_trip_outside_async_context() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordStore::new(dir.path());
    let record = SummaryRecord {
        document_id: "doc123".into(),
        data_search_field: "a".into(),
        data_field: "b".into(),
        api_function: "http://cb".into(),
        summary: "S".into(),
    };

    let read_back = tokio_test::block_on(async {
        let path = store.save(&record).await.unwrap();
        store.read(&path).await.unwrap()
    });
    assert_eq!(read_back, record);
}

#[test]
fn test_noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<NoopProgressCallback>();
    assert_send_sync::<SummaryPipeline>();
    assert_send_sync::<Dispatcher>();
}

// ── Real pdfium / tesseract / Ollama (gated) ─────────────────────────────────

#[tokio::test]
async fn test_pdfium_reads_text_layer() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "hello.pdf", Some("Hello docsum"));

    let extracted = PdfiumExtractor::new(config_for(dir.path()))
        .extract(&pdf)
        .await
        .expect("text-layer PDF should extract");

    assert!(extracted.text.contains("Hello docsum"), "{:?}", extracted.text);
    assert_eq!(extracted.pages.len(), 1);
    assert!(matches!(
        extracted.pages[0].outcome,
        PageOutcome::TextLayer(_)
    ));
    assert_eq!(extracted.ocr_attempts(), 0);
}

#[tokio::test]
async fn test_blank_page_goes_through_ocr_and_fails_extraction() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(dir.path(), "blank.pdf", None);

    let err = PdfiumExtractor::new(config_for(dir.path()))
        .extract(&pdf)
        .await
        .unwrap_err();
    assert!(
        matches!(err, DocsumError::NoTextExtracted { pages: 1, .. }),
        "{err}"
    );
}

#[tokio::test]
async fn test_corrupt_pdf_is_an_open_failure() {
    e2e_skip_unless_enabled!();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"%PDF-1.4\nthis is not a pdf").unwrap();

    let err = PdfiumExtractor::new(config_for(dir.path()))
        .extract(&path)
        .await
        .unwrap_err();
    assert!(matches!(err, DocsumError::PdfOpenFailed { .. }), "{err}");
}

async fn ollama_is_available() -> bool {
    reqwest::Client::new()
        .get("http://localhost:11434/api/tags")
        .timeout(Duration::from_secs(2))
        .send()
        .await
        .map(|r| r.status().is_success())
        .unwrap_or(false)
}

/// Full production wiring against a local Ollama.
///
/// Requires:
/// - `DOCSUM_E2E=1`
/// - pdfium (system library or `DOCSUM_PDFIUM_LIB`)
/// - Ollama on localhost:11434 with the model named by `DOCSUM_MODEL` (default llama3)
#[tokio::test]
async fn test_real_pipeline_with_ollama() {
    e2e_skip_unless_enabled!();
    if !ollama_is_available().await {
        println!("SKIP — Ollama is not running on localhost:11434");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let pdf = write_pdf(
        dir.path(),
        "memo.pdf",
        Some("The board approved the new budget on Monday."),
    );

    let mut builder = ServiceConfig::builder().store_dir(dir.path().join("summaries"));
    if let Ok(model) = std::env::var("DOCSUM_MODEL") {
        builder = builder.model(model);
    }
    if let Ok(lib) = std::env::var("DOCSUM_PDFIUM_LIB") {
        builder = builder.pdfium_library(lib);
    }
    let config = Arc::new(builder.build().unwrap());

    // Sanity-check the client on its own before the full pipeline.
    let client = GenerateClient::new(&config).unwrap();
    assert!(!client.summarize("A short note.").await.unwrap().is_empty());

    let pipeline = SummaryPipeline::from_config(Arc::clone(&config)).unwrap();
    let meta = docsum::RecordFields {
        api_function: Some("http://cb".into()),
        document_id: Some("memo".into()),
        data_search_field: Some("a".into()),
        data_field: Some("b".into()),
    }
    .validate()
    .unwrap();

    let outcome = pipeline.summarize_pdf(&pdf, "memo.pdf", meta).await.unwrap();
    assert!(!outcome.record.summary.is_empty());
    assert!(outcome.summary_file.exists());
}
