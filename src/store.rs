//! Directory-backed record store.
//!
//! Layout under the store directory:
//!
//! ```text
//! <store>/<documentID>.json     one record per document, last writer wins
//! <store>/processing_log.txt    append-only audit of dispatched records
//! <store>/archive/              records moved out of the active listing
//! ```
//!
//! The directory listing is the only index. `documentID` is used verbatim as
//! the file stem.

use crate::config::ServiceConfig;
use crate::error::DocsumError;
use crate::record::SummaryRecord;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// File name of the audit log inside the store.
pub const AUDIT_LOG_NAME: &str = "processing_log.txt";

/// Name of the archive subdirectory inside the store.
pub const ARCHIVE_DIR_NAME: &str = "archive";

/// Log files that may sit next to the records and are never listed.
const LOG_FILE_NAMES: &[&str] = &[AUDIT_LOG_NAME, "processing.log"];

const RECORD_EXTENSION: &str = "json";

/// Handle on a record store directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(&config.store_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.dir.join(ARCHIVE_DIR_NAME)
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.dir.join(AUDIT_LOG_NAME)
    }

    /// Where the record for `document_id` lives.
    pub fn record_path(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{document_id}.{RECORD_EXTENSION}"))
    }

    /// Persist `record`, replacing any earlier record with the same ID.
    ///
    /// Atomic write: serialise to a uniquely named sibling temp file, then
    /// rename over the target. Concurrent saves of one ID never share a temp
    /// file; the last rename wins.
    pub async fn save(&self, record: &SummaryRecord) -> Result<PathBuf, DocsumError> {
        let path = self.record_path(&record.document_id);
        let write_err = |source: std::io::Error| DocsumError::RecordWriteFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.dir).await.map_err(write_err)?;

        let body = to_pretty_json(record).map_err(|e| {
            write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        let dir = self.dir.clone();
        let prefix = format!("{}.", record.document_id);
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &prefix, &body, &target))
            .await
            .map_err(|e| DocsumError::Internal(format!("record write task: {e}")))?
            .map_err(write_err)?;

        info!("Summary saved to '{}'", path.display());
        Ok(path)
    }

    /// Record files directly inside the store, sorted by name.
    ///
    /// Fails with [`DocsumError::StoreUnavailable`] when the directory does
    /// not exist.
    pub async fn list_all(&self) -> Result<Vec<PathBuf>, DocsumError> {
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            return Err(DocsumError::StoreUnavailable {
                path: self.dir.clone(),
            });
        }

        let read_err = |source| DocsumError::RecordReadFailed {
            path: self.dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(read_err)?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            let path = entry.path();
            if is_file && is_record_file(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        debug!("Listed {} records in {}", paths.len(), self.dir.display());
        Ok(paths)
    }

    /// Read and parse one record file. See [`SummaryRecord::from_stored_json`]
    /// for how missing keys are filled in.
    pub async fn read(&self, path: &Path) -> Result<SummaryRecord, DocsumError> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DocsumError::RecordReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        SummaryRecord::from_stored_json(&raw).map_err(|source| DocsumError::MalformedRecord {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Move a record into the archive directory, returning its new path.
    ///
    /// Archiving a file that has already been moved returns the archive path.
    pub async fn archive(&self, path: &Path) -> Result<PathBuf, DocsumError> {
        let archive_err = |source| DocsumError::ArchiveFailed {
            path: path.to_path_buf(),
            source,
        };
        let file_name = path.file_name().ok_or_else(|| {
            archive_err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no file name",
            ))
        })?;

        let archive_dir = self.archive_dir();
        let destination = archive_dir.join(file_name);

        if path.parent() == Some(archive_dir.as_path()) {
            return Ok(path.to_path_buf());
        }
        if !tokio::fs::try_exists(path).await.unwrap_or(false)
            && tokio::fs::try_exists(&destination).await.unwrap_or(false)
        {
            debug!("{} already archived", destination.display());
            return Ok(destination);
        }

        tokio::fs::create_dir_all(&archive_dir)
            .await
            .map_err(archive_err)?;
        tokio::fs::rename(path, &destination)
            .await
            .map_err(archive_err)?;

        debug!("Archived {}", destination.display());
        Ok(destination)
    }

    /// Archive every listed record. Individual failures are logged and skipped.
    pub async fn archive_all(&self) -> Result<usize, DocsumError> {
        let paths = self.list_all().await?;
        Ok(self.archive_paths(&paths).await)
    }

    /// Archive exactly `paths`, returning how many moved.
    pub async fn archive_paths<P: AsRef<Path>>(&self, paths: &[P]) -> usize {
        let mut archived = 0;
        for path in paths {
            match self.archive(path.as_ref()).await {
                Ok(_) => archived += 1,
                Err(e) => warn!("{e}"),
            }
        }
        if archived > 0 {
            info!(
                "Archived {} files to {}",
                archived,
                self.archive_dir().display()
            );
        }
        archived
    }

    /// Append `[<local timestamp>] Processed <documentID>` to the audit log.
    pub async fn append_audit(&self, document_id: &str) -> Result<(), DocsumError> {
        let path = self.audit_log_path();
        let line = audit_line(document_id, chrono::Local::now().naive_local());

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| DocsumError::AuditLogFailed {
                path: path.clone(),
                source,
            })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|source| DocsumError::AuditLogFailed {
                path: path.clone(),
                source,
            })?;
        file.flush()
            .await
            .map_err(|source| DocsumError::AuditLogFailed { path, source })
    }
}

fn is_record_file(path: &Path) -> bool {
    let has_extension = path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION);
    let is_log = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| LOG_FILE_NAMES.contains(&n));
    has_extension && !is_log
}

fn write_atomically(dir: &Path, prefix: &str, body: &[u8], target: &Path) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// JSON with four-space indentation, matching the records already on disk.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}

fn audit_line(document_id: &str, at: chrono::NaiveDateTime) -> String {
    format!(
        "[{}] Processed {}\n",
        at.format("%Y-%m-%d %H:%M:%S%.6f"),
        document_id
    )
}
