use super::segment;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::types::{
    ApiResponse, DocumentGenerationRequest, DocumentGenerationResult, Download, JsonObject,
    NoData, Pagination, SessionInfo, SessionStatus, UploadFile,
};
use glassdoc_http::ProgressCallback;
use glassdoc_http::multipart::Form;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const BASE: &str = "/mvp";

/// Application form and test report uploaded together to open a session
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub application_file: UploadFile,
    pub report_file: UploadFile,
}

impl DocumentUpload {
    fn into_form(self) -> Form {
        Form::new()
            .part("application_file", self.application_file.into_part())
            .part("report_file", self.report_file.into_part())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentUploadResult {
    pub session_id: String,
    #[serde(default)]
    pub uploaded_files: Vec<String>,
    #[serde(default)]
    pub processing_status: Option<GenerationStatus>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionLanguage {
    Zh,
    En,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<ExtractionLanguage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extract_fields: Vec<String>,
}

/// Body of `POST /mvp/extract-info`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractInfoRequest {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_options: Option<ExtractionOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractionReport {
    pub extraction_result: JsonObject,
    pub confidence_scores: HashMap<String, f64>,
    /// Seconds
    pub extraction_time: f64,
    pub fields_extracted: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveType {
    #[default]
    Draft,
    Final,
}

/// Body of `POST /mvp/save-form-data`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormDataSave {
    pub session_id: String,
    pub form_data: JsonObject,
    pub save_type: SaveType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormDataSaved {
    pub session_id: String,
    pub saved_at: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredFormData {
    pub form_data: JsonObject,
    #[serde(default)]
    pub saved_at: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub session_info: Option<SessionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationIssue>,
    #[serde(default)]
    pub warnings: Vec<ValidationIssue>,
}

#[derive(Serialize)]
struct ValidateBody<'a> {
    session_id: &'a str,
    form_data: &'a Value,
}

/// Document produced by one of the `generate-*` endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    If,
    Cert,
    Other,
    Tr,
    Tm,
    ReviewControlSheet,
    /// Every document of the session in one archive
    All,
}

impl DocumentKind {
    pub const ALL_KINDS: [Self; 7] = [
        Self::If,
        Self::Cert,
        Self::Other,
        Self::Tr,
        Self::Tm,
        Self::ReviewControlSheet,
        Self::All,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::If => "if",
            Self::Cert => "cert",
            Self::Other => "other",
            Self::Tr => "tr",
            Self::Tm => "tm",
            Self::ReviewControlSheet => "review-control-sheet",
            Self::All => "documents",
        }
    }

    fn endpoint(self) -> String {
        format!("{BASE}/generate-{}", self.as_str())
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown document kind '{0}'")]
pub struct UnknownDocumentKind(String);

impl FromStr for DocumentKind {
    type Err = UnknownDocumentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "all" {
            return Ok(Self::All);
        }
        Self::ALL_KINDS
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownDocumentKind(s.to_owned()))
    }
}

/// Optional body of `POST /mvp/session`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionCreated {
    pub session_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<SessionInfo>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

impl GenerationStatus {
    /// No further progress will be reported
    #[must_use]
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GenerationProgress {
    pub status: GenerationStatus,
    /// Percent complete
    pub progress: f64,
    #[serde(default)]
    pub current_step: String,
    /// Seconds
    #[serde(default)]
    pub estimated_time: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// `/mvp` document-generation workflow
#[derive(Debug, Clone)]
pub struct MvpApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> MvpApi<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// Upload the application form and test report; the backend opens a session
    pub async fn upload_documents(
        &self,
        documents: DocumentUpload,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<DocumentUploadResult>, ApiError> {
        self.gateway
            .upload(
                &Method::POST,
                &format!("{BASE}/upload-documents"),
                documents.into_form(),
                progress,
            )
            .await
    }

    pub async fn extract_info(
        &self,
        request: &ExtractInfoRequest,
    ) -> Result<ApiResponse<ExtractionReport>, ApiError> {
        self.gateway
            .post(&format!("{BASE}/extract-info"), request)
            .await
    }

    /// Extract fields from a single document without a session
    pub async fn document_extract(&self, file: UploadFile) -> Result<ApiResponse<JsonObject>, ApiError> {
        let form = Form::new().part("file", file.into_part());
        self.gateway
            .upload(&Method::POST, &format!("{BASE}/document-extract"), form, None)
            .await
    }

    pub async fn save_form_data(
        &self,
        data: &FormDataSave,
    ) -> Result<ApiResponse<FormDataSaved>, ApiError> {
        self.gateway
            .post(&format!("{BASE}/save-form-data"), data)
            .await
    }

    pub async fn get_form_data(
        &self,
        session_id: &str,
    ) -> Result<ApiResponse<StoredFormData>, ApiError> {
        self.gateway
            .get(&format!("{BASE}/get-form-data/{}", segment(session_id)))
            .await
    }

    pub async fn validate_form_data(
        &self,
        session_id: &str,
        form_data: &Value,
    ) -> Result<ApiResponse<ValidationReport>, ApiError> {
        let body = ValidateBody {
            session_id,
            form_data,
        };
        self.gateway
            .post(&format!("{BASE}/validate-form-data"), &body)
            .await
    }

    pub async fn generate(
        &self,
        kind: DocumentKind,
        request: &DocumentGenerationRequest,
    ) -> Result<ApiResponse<DocumentGenerationResult>, ApiError> {
        self.gateway.post(&kind.endpoint(), request).await
    }

    pub async fn download_document(&self, filename: &str) -> Result<Download, ApiError> {
        self.gateway
            .download(&format!("{BASE}/download/{}", segment(filename)), &())
            .await
    }

    pub async fn create_session(
        &self,
        metadata: &SessionMetadata,
    ) -> Result<ApiResponse<SessionCreated>, ApiError> {
        self.gateway
            .post(&format!("{BASE}/session"), metadata)
            .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<ApiResponse<SessionInfo>, ApiError> {
        self.gateway
            .get(&format!("{BASE}/session/{}", segment(session_id)))
            .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<ApiResponse<NoData>, ApiError> {
        self.gateway
            .delete(&format!("{BASE}/session/{}", segment(session_id)))
            .await
    }

    pub async fn sessions(
        &self,
        query: &SessionListQuery,
    ) -> Result<ApiResponse<SessionList>, ApiError> {
        self.gateway
            .get_with_query(&format!("{BASE}/sessions"), query)
            .await
    }

    /// Poll the generation state of a session
    pub async fn generation_progress(
        &self,
        session_id: &str,
    ) -> Result<ApiResponse<GenerationProgress>, ApiError> {
        self.gateway
            .get(&format!("{BASE}/generation-progress/{}", segment(session_id)))
            .await
    }

    pub async fn cancel_generation(&self, session_id: &str) -> Result<ApiResponse<NoData>, ApiError> {
        self.gateway
            .post_empty(&format!("{BASE}/cancel-generation/{}", segment(session_id)))
            .await
    }
}
