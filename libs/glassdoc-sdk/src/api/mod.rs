//! Typed wrappers over the backend REST resources.
//!
//! Each wrapper borrows a [`Gateway`] and maps one method to one endpoint.
//! They carry no logic beyond building paths, query strings and bodies; every
//! failure is the gateway's normalized [`ApiError`](crate::ApiError), so the
//! `# Errors` section is the same everywhere and is not repeated.

#![allow(clippy::missing_errors_doc)]

mod applications;
mod companies;
mod mvp;
mod system;
mod templates;
mod uploads;

pub use applications::{
    Application, ApplicationFilters, ApplicationList, ApplicationListQuery, ApplicationStats,
    ApplicationsApi, Approval, CreateApplication, UpdateApplication,
};
pub use companies::{CompaniesApi, Company, CompanyList, CompanyUpdate, CreateCompany};
pub use mvp::{
    DocumentKind, DocumentUpload, DocumentUploadResult, ExtractInfoRequest, ExtractionLanguage,
    ExtractionOptions, ExtractionReport, FormDataSave, FormDataSaved, GenerationProgress,
    GenerationStatus, MvpApi, SaveType, SessionCreated, SessionList, SessionListQuery,
    SessionMetadata, StoredFormData, UnknownDocumentKind, ValidationIssue, ValidationReport,
};
pub use system::SystemApi;
pub use templates::{
    CreateTemplate, Template, TemplateList, TemplateListQuery, TemplatePreview, TemplateStats,
    TemplateVariable, TemplatesApi, UpdateTemplate,
};
pub use uploads::{
    MAX_CONCURRENT_UPLOADS, UploadHistory, UploadHistoryQuery, UploadOptions, UploadsApi,
    UploadedFileInfo,
};

use serde::Deserialize;

/// `data` of batch update calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct UpdatedCount {
    pub updated_count: u64,
}

/// `data` of batch delete calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeletedCount {
    pub deleted_count: u64,
}

/// Escape a caller-supplied value for use as one path segment.
fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
