use super::UpdatedCount;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::types::{ApiResponse, BaseQuery, Download, NoData, Pagination, SortInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const BASE: &str = "/applications";

/// A certification application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: u64,
    pub application_number: String,
    pub title: String,
    pub application_type: String,
    pub status: String,
    pub company_name: Option<String>,
    pub company_address: Option<String>,
    pub approval_no: Option<String>,
    pub information_folder_no: Option<String>,
    pub windscreen_thick: Option<String>,
    pub interlayer_thick: Option<String>,
    pub glass_layers: Option<String>,
    pub interlayer_layers: Option<String>,
    pub interlayer_type: Option<String>,
    pub glass_treatment: Option<String>,
    pub coating_type: Option<String>,
    pub coating_thick: Option<String>,
    pub coating_color: Option<String>,
    pub material_nature: Option<String>,
    pub safety_class: Option<String>,
    pub pane_desc: Option<String>,
    #[serde(default)]
    pub vehicles: Vec<Value>,
    pub remarks: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub submitted_at: Option<String>,
    pub approved_at: Option<String>,
}

/// Filters for `GET /applications`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplicationListQuery {
    #[serde(flatten)]
    pub base: BaseQuery,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicationFilters {
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default)]
    pub application_type: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplicationList {
    pub applications: Vec<Application>,
    pub pagination: Pagination,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filters: ApplicationFilters,
    #[serde(default)]
    pub sort: Option<SortInfo>,
}

/// Body of `POST /applications`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateApplication {
    pub title: String,
    pub application_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub information_folder_no: Option<String>,
    /// Technical fields (`windscreen_thick`, `glass_layers`, ...) sent as-is
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vehicles: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// Body of `PUT /applications/{id}`; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UpdateApplication {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

/// Body of `POST /applications/{id}/approve`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Approval {
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct ApplicationStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub draft: u64,
}

#[derive(Serialize)]
struct BatchUpdate<'a> {
    ids: &'a [u64],
    data: &'a UpdateApplication,
}

/// `/applications` endpoints
#[derive(Debug, Clone)]
pub struct ApplicationsApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> ApplicationsApi<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(
        &self,
        query: &ApplicationListQuery,
    ) -> Result<ApiResponse<ApplicationList>, ApiError> {
        self.gateway.get_with_query(BASE, query).await
    }

    pub async fn get(&self, id: u64) -> Result<ApiResponse<Application>, ApiError> {
        self.gateway.get(&format!("{BASE}/{id}")).await
    }

    pub async fn create(
        &self,
        application: &CreateApplication,
    ) -> Result<ApiResponse<Application>, ApiError> {
        self.gateway.post(BASE, application).await
    }

    pub async fn update(
        &self,
        id: u64,
        changes: &UpdateApplication,
    ) -> Result<ApiResponse<Application>, ApiError> {
        self.gateway.put(&format!("{BASE}/{id}"), changes).await
    }

    pub async fn delete(&self, id: u64) -> Result<ApiResponse<NoData>, ApiError> {
        self.gateway.delete(&format!("{BASE}/{id}")).await
    }

    pub async fn submit(&self, id: u64) -> Result<ApiResponse<Application>, ApiError> {
        self.gateway.post_empty(&format!("{BASE}/{id}/submit")).await
    }

    pub async fn approve(
        &self,
        id: u64,
        approval: &Approval,
    ) -> Result<ApiResponse<Application>, ApiError> {
        self.gateway
            .post(&format!("{BASE}/{id}/approve"), approval)
            .await
    }

    pub async fn stats(&self) -> Result<ApiResponse<ApplicationStats>, ApiError> {
        self.gateway.get(&format!("{BASE}/stats")).await
    }

    pub async fn batch_update(
        &self,
        ids: &[u64],
        changes: &UpdateApplication,
    ) -> Result<ApiResponse<UpdatedCount>, ApiError> {
        let body = BatchUpdate { ids, data: changes };
        self.gateway
            .put(&format!("{BASE}/batch-update"), &body)
            .await
    }

    /// Export matching applications; paging fields of `query` are ignored
    pub async fn export(&self, query: &ApplicationListQuery) -> Result<Download, ApiError> {
        let query = ApplicationListQuery {
            base: BaseQuery {
                page: None,
                per_page: None,
                ..query.base.clone()
            },
            ..query.clone()
        };
        self.gateway
            .download(&format!("{BASE}/export"), &query)
            .await
    }
}
