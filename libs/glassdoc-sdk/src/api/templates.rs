use super::{UpdatedCount, segment};
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::types::{ApiResponse, BaseQuery, Download, NoData, Pagination, UploadFile};
use glassdoc_http::multipart::Form;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE: &str = "/template/templates";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: u64,
    pub template_name: String,
    pub display_name: String,
    pub description: Option<String>,
    pub category: String,
    pub version: String,
    #[serde(default)]
    pub variables: Vec<String>,
    pub source_template: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Filters for `GET /template/templates`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateListQuery {
    #[serde(flatten)]
    pub base: BaseQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateList {
    pub templates: Vec<Template>,
    pub pagination: Pagination,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// A variable templates may reference
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TemplateVariable {
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    pub default_value: Option<Value>,
    #[serde(default)]
    pub validation_rules: Vec<String>,
}

/// Body of `POST /template/templates`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateTemplate {
    pub template_name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub category: String,
    pub selected_variables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_template: Option<String>,
}

/// Body of template updates; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplatePreview {
    pub preview_url: String,
    #[serde(default)]
    pub variables_used: Vec<String>,
    #[serde(default)]
    pub missing_variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateStats {
    pub total_templates: u64,
    pub active_templates: u64,
    pub categories_count: u64,
    pub most_used_template: Option<String>,
    #[serde(default)]
    pub recently_updated: Vec<Template>,
}

#[derive(Serialize)]
struct CopyBody<'a> {
    new_name: &'a str,
}

#[derive(Serialize)]
struct StatusBody {
    is_active: bool,
}

#[derive(Serialize)]
struct PreviewBody<'a> {
    sample_data: Option<&'a Value>,
}

#[derive(Serialize)]
struct BatchUpdate<'a> {
    template_names: &'a [String],
    data: &'a UpdateTemplate,
}

/// `/template/templates` endpoints; templates are addressed by name
#[derive(Debug, Clone)]
pub struct TemplatesApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> TemplatesApi<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, query: &TemplateListQuery) -> Result<ApiResponse<TemplateList>, ApiError> {
        self.gateway.get_with_query(BASE, query).await
    }

    pub async fn variables(&self) -> Result<ApiResponse<Vec<TemplateVariable>>, ApiError> {
        self.gateway.get(&format!("{BASE}/variables")).await
    }

    pub async fn create(&self, template: &CreateTemplate) -> Result<ApiResponse<Template>, ApiError> {
        self.gateway.post(BASE, template).await
    }

    /// Template configuration
    pub async fn get(&self, name: &str) -> Result<ApiResponse<Template>, ApiError> {
        self.gateway.get(&path(name, "")).await
    }

    pub async fn update(
        &self,
        name: &str,
        changes: &UpdateTemplate,
    ) -> Result<ApiResponse<Template>, ApiError> {
        self.gateway.put(&path(name, ""), changes).await
    }

    pub async fn delete(&self, name: &str) -> Result<ApiResponse<NoData>, ApiError> {
        self.gateway.delete(&path(name, "")).await
    }

    /// The template document itself
    pub async fn download(&self, name: &str) -> Result<Download, ApiError> {
        self.gateway.download(&path(name, "/download"), &()).await
    }

    pub async fn copy(&self, name: &str, new_name: &str) -> Result<ApiResponse<Template>, ApiError> {
        self.gateway
            .post(&path(name, "/copy"), &CopyBody { new_name })
            .await
    }

    /// Activate or deactivate a template
    pub async fn set_status(
        &self,
        name: &str,
        is_active: bool,
    ) -> Result<ApiResponse<Template>, ApiError> {
        self.gateway
            .patch(&path(name, "/status"), &StatusBody { is_active })
            .await
    }

    pub async fn preview(
        &self,
        name: &str,
        sample_data: Option<&Value>,
    ) -> Result<ApiResponse<TemplatePreview>, ApiError> {
        self.gateway
            .post(&path(name, "/preview"), &PreviewBody { sample_data })
            .await
    }

    pub async fn stats(&self) -> Result<ApiResponse<TemplateStats>, ApiError> {
        self.gateway.get(&format!("{BASE}/stats")).await
    }

    pub async fn batch_update(
        &self,
        template_names: &[String],
        changes: &UpdateTemplate,
    ) -> Result<ApiResponse<UpdatedCount>, ApiError> {
        let body = BatchUpdate {
            template_names,
            data: changes,
        };
        self.gateway
            .put(&format!("{BASE}/batch-update"), &body)
            .await
    }

    /// Template configuration as a file
    pub async fn export_config(&self, name: &str) -> Result<Download, ApiError> {
        self.gateway.download(&path(name, "/export"), &()).await
    }

    /// Import a configuration file (multipart field `config_file`)
    pub async fn import_config(&self, file: UploadFile) -> Result<ApiResponse<Template>, ApiError> {
        let form = Form::new().part("config_file", file.into_part());
        self.gateway
            .upload(&Method::POST, &format!("{BASE}/import"), form, None)
            .await
    }
}

fn path(name: &str, suffix: &str) -> String {
    format!("{BASE}/{}{suffix}", segment(name))
}
