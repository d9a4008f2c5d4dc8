//! Request and response shapes shared by the resource APIs.

use bytes::Bytes;
use glassdoc_http::multipart::Part;
use mime::Mime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Business envelope returned by every JSON endpoint
///
/// A 2xx response with `success: false` is still returned as `Ok`; only
/// transport and HTTP status failures become [`ApiError`](crate::ApiError).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Payload, if the backend sent one
    #[must_use]
    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

/// Payload type for endpoints whose `data` carries nothing of interest
pub type NoData = serde::de::IgnoredAny;

/// Page metadata attached to list responses
///
/// Template, upload history and session listings only send the first four
/// fields; the rest default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u32,
    #[serde(default)]
    pub has_prev: bool,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub prev_num: Option<u32>,
    #[serde(default)]
    pub next_num: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortInfo {
    pub sort_by: String,
    pub sort_order: String,
}

/// Paging, search and sort parameters accepted by list endpoints
///
/// Unset fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BaseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
}

impl BaseQuery {
    #[must_use]
    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    #[must_use]
    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    #[must_use]
    pub fn sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(order);
        self
    }
}

/// A file held in memory, ready to be sent as a multipart part
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime: Option<Mime>,
    pub bytes: Bytes,
}

impl UploadFile {
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    /// Set the part content type
    #[must_use]
    pub fn with_mime(mut self, mime: Mime) -> Self {
        self.mime = Some(mime);
        self
    }

    /// Read a file from disk, guessing the content type from its extension
    ///
    /// # Errors
    /// Returns the I/O error if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime = path
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .and_then(mime_for_extension)
            .and_then(|m| m.parse().ok());
        Ok(Self {
            name,
            mime,
            bytes: Bytes::from(bytes),
        })
    }

    /// Size of the file in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Convert into a multipart part carrying the file name and content type
    #[must_use]
    pub fn into_part(self) -> Part {
        let part = Part::bytes(self.bytes).file_name(self.name);
        match self.mime {
            Some(mime) => part.mime(mime),
            None => part,
        }
    }
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let mime = match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

/// Result of `POST /mvp/upload-file`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUploadResult {
    pub url: String,
    pub filename: String,
    pub original_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    pub size: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Expired,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Completed => "completed",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: String,
    pub last_activity: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub documents_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Docx,
    Pdf,
    Xlsx,
}

/// Body of every `generate-*` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentGenerationRequest {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_name: Option<String>,
}

impl DocumentGenerationRequest {
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            output_format: None,
            template_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentGenerationResult {
    pub download_url: String,
    pub filename: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub generated_at: String,
}

/// Body of `GET /health`, which is not wrapped in the business envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Binary payload returned by export and download endpoints
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Bytes,
    pub content_type: Option<String>,
    /// File name from `Content-Disposition`, when present
    pub file_name: Option<String>,
}

/// Loosely typed JSON object used where the backend schema is open-ended
pub type JsonObject = serde_json::Map<String, Value>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::non_ascii_literal)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Stats {
        total: u64,
    }

    #[test]
    fn test_envelope_payload_needs_no_default() {
        let resp: ApiResponse<Stats> =
            serde_json::from_str(r#"{"success":true,"data":{"total":7}}"#).unwrap();
        assert_eq!(resp.into_data(), Some(Stats { total: 7 }));

        let resp: ApiResponse<Stats> = serde_json::from_str(r#"{"success":false}"#).unwrap();
        assert!(!resp.success);
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_envelope_without_data() {
        let resp: ApiResponse<NoData> =
            serde_json::from_str(r#"{"success":true,"message":"deleted"}"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.message.as_deref(), Some("deleted"));
        assert!(resp.data.is_none());
    }

    #[test]
    fn test_pagination_without_navigation_fields() {
        let page: Pagination =
            serde_json::from_str(r#"{"page":2,"per_page":20,"total":45,"pages":3}"#).unwrap();
        assert_eq!(page.pages, 3);
        assert!(!page.has_next);
        assert!(page.next_num.is_none());
    }

    #[test]
    fn test_base_query_skips_unset_fields() {
        let query = BaseQuery::default().search("玻璃").sort("created_at", SortOrder::Desc);
        let encoded = serde_urlencoded::to_string(&query).unwrap();
        assert_eq!(
            encoded,
            "search=%E7%8E%BB%E7%92%83&sort_by=created_at&sort_order=desc"
        );
        assert_eq!(serde_urlencoded::to_string(&BaseQuery::default()).unwrap(), "");
    }

    #[test]
    fn test_generation_request_omits_optional_fields() {
        let body = serde_json::to_value(DocumentGenerationRequest::new("s-1")).unwrap();
        assert_eq!(body, serde_json::json!({"session_id": "s-1"}));
    }

    #[tokio::test]
    async fn test_upload_file_from_path_guesses_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.PDF");
        tokio::fs::write(&path, b"%PDF-1.7").await.unwrap();

        let file = UploadFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "report.PDF");
        assert_eq!(file.mime, Some(mime::APPLICATION_PDF));
        assert_eq!(file.len(), 8);
    }

    #[tokio::test]
    async fn test_upload_file_from_missing_path() {
        let result = UploadFile::from_path("/definitely/not/here.bin").await;
        assert!(result.is_err());
    }
}
