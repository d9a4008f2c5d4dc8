use super::segment;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::types::{ApiResponse, FileUploadResult, NoData, Pagination, UploadFile};
use futures::{StreamExt, TryStreamExt, stream};
use glassdoc_http::ProgressCallback;
use glassdoc_http::multipart::Form;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE: &str = "/mvp/upload-file";

/// Uploads `upload_many` keeps in flight at once
pub const MAX_CONCURRENT_UPLOADS: usize = 4;

/// Classification sent alongside an uploaded file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    /// e.g. `company`, `document`, `temp`
    pub category: Option<String>,
    /// e.g. `marks`, `picture`, `signature`
    pub subcategory: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl UploadOptions {
    #[must_use]
    pub fn new(category: impl Into<String>, subcategory: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            subcategory: Some(subcategory.into()),
            ..Self::default()
        }
    }

    fn into_form(self, file: UploadFile) -> Form {
        let mut form = Form::new().part("file", file.into_part());
        let fields = [
            ("category", self.category),
            ("subcategory", self.subcategory),
            ("description", self.description),
        ];
        for (name, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                form = form.text(name, value);
            }
        }
        for tag in self.tags {
            form = form.text("tags[]", tag);
        }
        form
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedFileInfo {
    pub filename: String,
    pub original_name: String,
    pub size: u64,
    pub mime_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: String,
    pub uploaded_at: String,
    pub url: String,
}

/// Filters for the upload history
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadHistoryQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadHistory {
    #[serde(default)]
    pub files: Vec<Value>,
    pub pagination: Pagination,
}

/// `/mvp/upload-file` endpoints
#[derive(Debug, Clone)]
pub struct UploadsApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> UploadsApi<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Upload one file with its classification
    pub async fn upload(
        &self,
        file: UploadFile,
        options: UploadOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<FileUploadResult>, ApiError> {
        self.gateway
            .upload(&Method::POST, BASE, options.into_form(file), progress)
            .await
    }

    /// Trade mark image (`company/marks`)
    pub async fn upload_trade_mark(
        &self,
        file: UploadFile,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<FileUploadResult>, ApiError> {
        self.upload(file, UploadOptions::new("company", "marks"), progress)
            .await
    }

    /// Company picture (`company/picture`)
    pub async fn upload_company_picture(
        &self,
        file: UploadFile,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<FileUploadResult>, ApiError> {
        self.upload(file, UploadOptions::new("company", "picture"), progress)
            .await
    }

    /// Company signature (`company/signature`)
    pub async fn upload_company_signature(
        &self,
        file: UploadFile,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<FileUploadResult>, ApiError> {
        self.upload(file, UploadOptions::new("company", "signature"), progress)
            .await
    }

    /// Document of the given type (`document/{document_type}`)
    pub async fn upload_document(
        &self,
        file: UploadFile,
        document_type: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<FileUploadResult>, ApiError> {
        self.upload(file, UploadOptions::new("document", document_type), progress)
            .await
    }

    /// Upload several files with the same options, at most
    /// [`MAX_CONCURRENT_UPLOADS`] at a time
    ///
    /// Fails with the first error; results keep the order of `files`.
    /// `progress` is shared by all uploads.
    pub async fn upload_many(
        &self,
        files: Vec<UploadFile>,
        options: &UploadOptions,
        progress: Option<ProgressCallback>,
    ) -> Result<Vec<ApiResponse<FileUploadResult>>, ApiError> {
        stream::iter(files)
            .map(|file| self.upload(file, options.clone(), progress.clone()))
            .buffered(MAX_CONCURRENT_UPLOADS)
            .try_collect()
            .await
    }

    pub async fn delete(&self, filename: &str) -> Result<ApiResponse<NoData>, ApiError> {
        self.gateway
            .delete(&format!("{BASE}/{}", segment(filename)))
            .await
    }

    pub async fn info(&self, filename: &str) -> Result<ApiResponse<UploadedFileInfo>, ApiError> {
        self.gateway
            .get(&format!("{BASE}/{}/info", segment(filename)))
            .await
    }

    pub async fn history(
        &self,
        query: &UploadHistoryQuery,
    ) -> Result<ApiResponse<UploadHistory>, ApiError> {
        self.gateway
            .get_with_query(&format!("{BASE}/history"), query)
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::api::testing::gateway_for;
    use crate::error::ErrorCode;
    use httpmock::prelude::*;
    use std::sync::{Arc, Mutex};

    const RESULT: &str = r#"{"success":true,"message":"ok","data":{
        "url":"/uploads/company/marks/a.png","filename":"a.png","original_name":"mark.png",
        "category":"company","subcategory":"marks","size":3,"mime_type":"image/png"}}"#;

    fn png(name: &str) -> UploadFile {
        UploadFile::new(name, &b"PNG"[..]).with_mime(mime::IMAGE_PNG)
    }

    #[test]
    fn test_options_skip_empty_fields() {
        let options = UploadOptions {
            category: Some("document".to_owned()),
            subcategory: Some(String::new()),
            description: None,
            tags: vec!["a".to_owned(), "b".to_owned()],
        };
        let form = options.into_form(png("x.png"));
        // file, category and two tags
        assert_eq!(form.len(), 4);
    }

    #[tokio::test]
    async fn test_trade_mark_upload_sends_classification() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/mvp/upload-file")
                .body_includes("name=\"file\"; filename=\"mark.png\"")
                .body_includes("name=\"category\"")
                .body_includes("\r\n\r\ncompany\r\n")
                .body_includes("name=\"subcategory\"")
                .body_includes("\r\n\r\nmarks\r\n");
            then.status(200).body(RESULT);
        });

        let resp = gateway_for(&server)
            .uploads()
            .upload_trade_mark(png("mark.png"), None)
            .await
            .unwrap();

        mock.assert();
        let data = resp.data.unwrap();
        assert_eq!(data.original_name, "mark.png");
        assert_eq!(data.size, 3);
    }

    #[tokio::test]
    async fn test_tags_are_repeated_fields() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/mvp/upload-file")
                .body_includes("name=\"tags[]\"")
                .body_includes("\r\n\r\nfront\r\n")
                .body_includes("name=\"tags[]\"")
                .body_includes("\r\n\r\nrear\r\n")
                .body_includes("name=\"description\"")
                .body_includes("\r\n\r\nwindscreen\r\n");
            then.status(200).body(RESULT);
        });

        let options = UploadOptions {
            description: Some("windscreen".to_owned()),
            tags: vec!["front".to_owned(), "rear".to_owned()],
            ..UploadOptions::new("document", "photos")
        };
        gateway_for(&server)
            .uploads()
            .upload(png("p.png"), options, None)
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_upload_many_keeps_order_and_shares_progress() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/mvp/upload-file");
            then.status(200).body(RESULT);
        });

        let calls = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&calls);
        let progress: ProgressCallback = Arc::new(move |_| *counter.lock().unwrap() += 1);

        let files = vec![png("1.png"), png("2.png"), png("3.png")];
        let results = gateway_for(&server)
            .uploads()
            .upload_many(files, &UploadOptions::new("document", "if"), Some(progress))
            .await
            .unwrap();

        mock.assert_calls(3);
        assert_eq!(results.len(), 3);
        assert!(*calls.lock().unwrap() >= 3);
    }

    #[tokio::test]
    async fn test_upload_many_handles_more_files_than_connections() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/mvp/upload-file");
            then.status(200)
                .delay(std::time::Duration::from_millis(200))
                .body(RESULT);
        });

        let files = (0..12).map(|i| png(&format!("{i}.png"))).collect();
        let results = gateway_for(&server)
            .uploads()
            .upload_many(files, &UploadOptions::new("document", "if"), None)
            .await
            .unwrap();

        mock.assert_calls(12);
        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|resp| resp.success));
    }

    #[tokio::test]
    async fn test_upload_many_fails_on_first_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/mvp/upload-file");
            then.status(413);
        });

        let err = gateway_for(&server)
            .uploads()
            .upload_many(vec![png("a.png"), png("b.png")], &UploadOptions::default(), None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), &ErrorCode::HttpStatus(413));
    }

    #[tokio::test]
    async fn test_info_delete_and_history() {
        let server = MockServer::start();
        let info = server.mock(|when, then| {
            when.method(GET).path("/api/mvp/upload-file/a.png/info");
            then.status(200).body(
                r#"{"success":true,"data":{"filename":"a.png","original_name":"m.png","size":3,
                    "mime_type":"image/png","category":"company","subcategory":"marks",
                    "uploaded_at":"2024-05-01T10:00:00","url":"/uploads/a.png"}}"#,
            );
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/api/mvp/upload-file/a.png");
            then.status(200).body(r#"{"success":true}"#);
        });
        let history = server.mock(|when, then| {
            when.method(GET)
                .path("/api/mvp/upload-file/history")
                .query_param("category", "company")
                .query_param("per_page", "5");
            then.status(200).body(
                r#"{"success":true,"data":{"files":[],"pagination":{"page":1,"per_page":5,"total":0,"pages":0}}}"#,
            );
        });

        let gateway = gateway_for(&server);
        let api = gateway.uploads();
        let file = api.info("a.png").await.unwrap().data.unwrap();
        assert_eq!(file.uploaded_at, "2024-05-01T10:00:00");
        api.delete("a.png").await.unwrap();
        let query = UploadHistoryQuery {
            category: Some("company".to_owned()),
            per_page: Some(5),
            ..UploadHistoryQuery::default()
        };
        let page = api.history(&query).await.unwrap().data.unwrap();
        assert!(page.files.is_empty());

        info.assert();
        delete.assert();
        history.assert();
    }
}
