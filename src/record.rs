//! Persisted and transmitted data shapes.
//!
//! The JSON key spelling (`documentID`, `DataSearchField`, `DataField`,
//! `apiFunction`) is part of the on-disk and callback contract and must not
//! change.

use serde::{Deserialize, Serialize};

/// Stand-in for a stored record with no `documentID`.
pub const UNKNOWN_DOCUMENT_ID: &str = "Unknown";

/// Stand-in for a stored record with no `summary`.
pub const MISSING_SUMMARY: &str = "No summary";

/// One stored summary, the only persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(rename = "documentID")]
    pub document_id: String,

    #[serde(rename = "DataSearchField")]
    pub data_search_field: String,

    #[serde(rename = "DataField")]
    pub data_field: String,

    #[serde(rename = "apiFunction")]
    pub api_function: String,

    pub summary: String,
}

impl SummaryRecord {
    /// Parse a record file as found on disk.
    ///
    /// Any JSON object is accepted. Absent or `null` keys take their
    /// stand-ins (`Unknown` for `documentID`, `No summary` for `summary`,
    /// empty for the rest) and non-string values are kept as their JSON text.
    /// Only text that is not JSON, or JSON that is not an object, fails.
    pub fn from_stored_json(raw: &str) -> Result<Self, serde_json::Error> {
        use serde::de::Error as _;

        let map = match serde_json::from_str::<serde_json::Value>(raw)? {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(serde_json::Error::custom(format!(
                    "expected a JSON object, found {}",
                    json_type_name(&other)
                )))
            }
        };

        let field = |key: &str, fallback: &str| match map.get(key) {
            None | Some(serde_json::Value::Null) => fallback.to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        Ok(Self {
            document_id: field("documentID", UNKNOWN_DOCUMENT_ID),
            data_search_field: field("DataSearchField", ""),
            data_field: field("DataField", ""),
            api_function: field("apiFunction", ""),
            summary: field("summary", MISSING_SUMMARY),
        })
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// The four caller-supplied fields that accompany every upload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct RecordFields {
    #[serde(rename = "apiFunction", default)]
    pub api_function: Option<String>,
    #[serde(rename = "documentID", default)]
    pub document_id: Option<String>,
    #[serde(rename = "dataSearchField", default)]
    pub data_search_field: Option<String>,
    #[serde(rename = "dataField", default)]
    pub data_field: Option<String>,
}

/// Validated form of [`RecordFields`]: all four values present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMeta {
    pub api_function: String,
    pub document_id: String,
    pub data_search_field: String,
    pub data_field: String,
}

impl RecordFields {
    /// Check the fields in the order callers are told about them.
    ///
    /// The first missing or empty field wins, so error messages are stable.
    pub fn validate(self) -> Result<RecordMeta, crate::error::DocsumError> {
        fn required(
            value: Option<String>,
            field: &'static str,
        ) -> Result<String, crate::error::DocsumError> {
            match value {
                Some(v) if !v.is_empty() => Ok(v),
                _ => Err(crate::error::DocsumError::MissingField { field }),
            }
        }

        Ok(RecordMeta {
            api_function: required(self.api_function, "apiFunction")?,
            document_id: required(self.document_id, "documentID")?,
            data_search_field: required(self.data_search_field, "dataSearchField")?,
            data_field: required(self.data_field, "dataField")?,
        })
    }
}

impl RecordMeta {
    /// Attach a summary, producing the record to persist.
    pub fn into_record(self, summary: impl Into<String>) -> SummaryRecord {
        SummaryRecord {
            document_id: self.document_id,
            data_search_field: self.data_search_field,
            data_field: self.data_field,
            api_function: self.api_function,
            summary: summary.into(),
        }
    }
}

/// Body POSTed to a record's callback URL during dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPayload {
    #[serde(rename = "documentID")]
    pub document_id: String,
    #[serde(rename = "DataSearchField")]
    pub data_search_field: String,
    #[serde(rename = "DataField")]
    pub data_field: String,
    pub summary: String,
    /// Local time the record was dispatched, ISO-8601 without offset.
    pub processed_at: String,
}

impl DispatchPayload {
    pub fn from_record(record: &SummaryRecord, processed_at: impl Into<String>) -> Self {
        Self {
            document_id: record.document_id.clone(),
            data_search_field: record.data_search_field.clone(),
            data_field: record.data_field.clone(),
            summary: record.summary.clone(),
            processed_at: processed_at.into(),
        }
    }
}
