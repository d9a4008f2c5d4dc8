use super::DeletedCount;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::types::{ApiResponse, BaseQuery, Download, NoData, Pagination, SortInfo, UploadFile};
use glassdoc_http::ProgressCallback;
use glassdoc_http::multipart::Form;
use http::Method;
use serde::{Deserialize, Serialize};

const BASE: &str = "/companies";

/// Page size used to fetch every company in one call
const ALL_COMPANIES_PAGE: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: u64,
    pub name: String,
    pub address: Option<String>,
    /// Stored path of the signature image
    pub signature: Option<String>,
    /// Stored path of the company picture
    pub picture: Option<String>,
    #[serde(default)]
    pub trade_names: Vec<String>,
    #[serde(default)]
    pub trade_marks: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompanyList {
    pub companies: Vec<Company>,
    pub pagination: Pagination,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sort: Option<SortInfo>,
}

/// Body of `POST /companies`
///
/// Trade names and marks are always sent, as empty lists when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreateCompany {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub trade_names: Vec<String>,
    pub trade_marks: Vec<String>,
}

/// Body of `PUT /companies/{id}`; only set fields are sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompanyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_marks: Option<Vec<String>>,
}

#[derive(Serialize)]
struct Ids<'a> {
    ids: &'a [u64],
}

/// Query of the export endpoint, which ignores paging
#[derive(Serialize)]
struct ExportQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort_by: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort_order: Option<crate::types::SortOrder>,
}

/// `/companies` endpoints
#[derive(Debug, Clone)]
pub struct CompaniesApi<'a> {
    gateway: &'a Gateway,
}

impl<'a> CompaniesApi<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self, query: &BaseQuery) -> Result<ApiResponse<CompanyList>, ApiError> {
        self.gateway.get_with_query(BASE, query).await
    }

    /// Every company in one page, for pickers
    pub async fn list_all(&self) -> Result<ApiResponse<CompanyList>, ApiError> {
        let query = BaseQuery {
            per_page: Some(ALL_COMPANIES_PAGE),
            ..BaseQuery::default()
        };
        self.gateway.get_with_query(BASE, &query).await
    }

    pub async fn get(&self, id: u64) -> Result<ApiResponse<Company>, ApiError> {
        self.gateway.get(&format!("{BASE}/{id}")).await
    }

    pub async fn create(&self, company: &CreateCompany) -> Result<ApiResponse<Company>, ApiError> {
        self.gateway.post(BASE, company).await
    }

    pub async fn update(
        &self,
        id: u64,
        changes: &CompanyUpdate,
    ) -> Result<ApiResponse<Company>, ApiError> {
        self.gateway.put(&format!("{BASE}/{id}"), changes).await
    }

    pub async fn delete(&self, id: u64) -> Result<ApiResponse<NoData>, ApiError> {
        self.gateway.delete(&format!("{BASE}/{id}")).await
    }

    /// Replace the company picture (multipart field `picture`)
    pub async fn upload_picture(
        &self,
        id: u64,
        file: UploadFile,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<Company>, ApiError> {
        self.upload_asset(id, "picture", file, progress).await
    }

    /// Replace the signature image (multipart field `signature`)
    pub async fn upload_signature(
        &self,
        id: u64,
        file: UploadFile,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<Company>, ApiError> {
        self.upload_asset(id, "signature", file, progress).await
    }

    pub async fn batch_delete(&self, ids: &[u64]) -> Result<ApiResponse<DeletedCount>, ApiError> {
        self.gateway
            .post(&format!("{BASE}/batch-delete"), &Ids { ids })
            .await
    }

    /// Export companies matching `query`; paging fields are ignored
    pub async fn export(&self, query: &BaseQuery) -> Result<Download, ApiError> {
        let query = ExportQuery {
            search: query.search.as_deref(),
            sort_by: query.sort_by.as_deref(),
            sort_order: query.sort_order,
        };
        self.gateway
            .download(&format!("{BASE}/export"), &query)
            .await
    }

    async fn upload_asset(
        &self,
        id: u64,
        field: &str,
        file: UploadFile,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<Company>, ApiError> {
        let form = Form::new().part(field, file.into_part());
        self.gateway
            .upload(&Method::PUT, &format!("{BASE}/{id}"), form, progress)
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::non_ascii_literal)]
mod tests {
    use super::*;
    use crate::api::testing::gateway_for;
    use crate::error::ErrorCode;
    use httpmock::prelude::*;
    use serde_json::json;

    const COMPANY: &str = r#"{
        "id": 3,
        "name": "福耀玻璃",
        "address": "福清",
        "signature": null,
        "picture": "uploads/company/picture/3.png",
        "trade_names": ["FY"],
        "trade_marks": []
    }"#;

    #[tokio::test]
    async fn test_list_all_requests_large_page() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/companies")
                .query_param("per_page", "1000");
            then.status(200).body(format!(
                r#"{{"success":true,"data":{{"companies":[{COMPANY}],
                    "pagination":{{"page":1,"per_page":1000,"total":1,"pages":1}}}}}}"#
            ));
        });

        let list = gateway_for(&server)
            .companies()
            .list_all()
            .await
            .unwrap()
            .data
            .unwrap();

        mock.assert();
        assert_eq!(list.companies[0].name, "福耀玻璃");
        assert_eq!(list.companies[0].trade_names, vec!["FY"]);
        assert!(list.companies[0].signature.is_none());
    }

    #[tokio::test]
    async fn test_create_always_sends_trade_lists() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/companies").json_body(json!({
                "name": "New Glass",
                "trade_names": [],
                "trade_marks": []
            }));
            then.status(201)
                .body(format!(r#"{{"success":true,"data":{COMPANY}}}"#));
        });

        let body = CreateCompany {
            name: "New Glass".to_owned(),
            ..CreateCompany::default()
        };
        gateway_for(&server)
            .companies()
            .create(&body)
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_update_sends_only_provided_fields() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/companies/3")
                .json_body(json!({"address": "上海", "trade_marks": []}));
            then.status(200)
                .body(format!(r#"{{"success":true,"data":{COMPANY}}}"#));
        });

        let changes = CompanyUpdate {
            address: Some("上海".to_owned()),
            trade_marks: Some(Vec::new()),
            ..CompanyUpdate::default()
        };
        gateway_for(&server)
            .companies()
            .update(3, &changes)
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_upload_signature_uses_multipart_put() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/companies/3")
                .body_includes("name=\"signature\"; filename=\"sign.png\"")
                .body_includes("image/png");
            then.status(200)
                .body(format!(r#"{{"success":true,"data":{COMPANY}}}"#));
        });

        let file = UploadFile::new("sign.png", &b"PNG"[..]).with_mime(mime::IMAGE_PNG);
        gateway_for(&server)
            .companies()
            .upload_signature(3, file, None)
            .await
            .unwrap();

        mock.assert();
    }

    #[tokio::test]
    async fn test_batch_delete() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/companies/batch-delete")
                .json_body(json!({"ids": [4, 5]}));
            then.status(200)
                .body(r#"{"success":true,"data":{"deleted_count":2}}"#);
        });

        let resp = gateway_for(&server)
            .companies()
            .batch_delete(&[4, 5])
            .await
            .unwrap();

        mock.assert();
        assert_eq!(resp.data.unwrap().deleted_count, 2);
    }

    #[tokio::test]
    async fn test_export_forwards_search_and_sort_only() {
        let server = MockServer::start();
        let paged = server.mock(|when, then| {
            when.method(GET)
                .path("/api/companies/export")
                .query_param_exists("per_page");
            then.status(500);
        });
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/companies/export")
                .query_param("search", "glass")
                .query_param("sort_by", "name");
            then.status(200).body("csv");
        });

        let query = BaseQuery::default()
            .page(2, 10)
            .search("glass")
            .sort("name", crate::types::SortOrder::Asc);
        gateway_for(&server)
            .companies()
            .export(&query)
            .await
            .unwrap();

        paged.assert_calls(0);
        mock.assert();
    }

    #[tokio::test]
    async fn test_duplicate_company_keeps_business_code() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/companies");
            then.status(409)
                .header("content-type", "application/json")
                .body(r#"{"success":false,"code":"COMPANY_ALREADY_EXISTS","message":"企业已存在"}"#);
        });

        let err = gateway_for(&server)
            .companies()
            .create(&CreateCompany::default())
            .await
            .unwrap_err();

        assert_eq!(err.code(), &ErrorCode::HttpStatus(409));
        assert_eq!(err.message(), "企业已存在");
        assert_eq!(
            err.business_code(),
            Some(crate::error::BusinessCode::CompanyAlreadyExists)
        );
    }
}
