//! The request gateway.
//!
//! A [`Gateway`] owns the HTTP clients and the resolved [`Endpoint`]. Every
//! resource API call goes through it: paths are joined onto the `/api`
//! prefix, JSON envelopes are unwrapped, and any failure is converted into
//! one [`ApiError`] and logged at this boundary.

use crate::api::{ApplicationsApi, CompaniesApi, MvpApi, SystemApi, TemplatesApi, UploadsApi};
use crate::endpoint::{ConfigError, Endpoint, EndpointSources};
use crate::error::ApiError;
use crate::types::{ApiResponse, Download};
use glassdoc_http::multipart::Form;
use glassdoc_http::{
    HttpClient, HttpClientBuilder, HttpClientConfig, HttpError, ProgressCallback, RequestBuilder,
    TransportSecurity,
};
use http::Method;
use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Default User-Agent sent by the gateway
pub const GATEWAY_USER_AGENT: &str = concat!("glassdoc-sdk/", env!("CARGO_PKG_VERSION"));

/// Gateway tuning
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Timeout for ordinary JSON calls (default: 10 seconds)
    pub timeout: Duration,
    /// Timeout for multipart uploads and binary downloads (default: 300 seconds)
    pub upload_timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
    /// Response size limit for JSON calls (default: 10 MB)
    pub max_body_size: usize,
    /// Response size limit for downloads (default: 100 MB)
    pub upload_max_body_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            upload_timeout: Duration::from_secs(300),
            user_agent: GATEWAY_USER_AGENT.to_owned(),
            max_body_size: 10 * 1024 * 1024,
            upload_max_body_size: 100 * 1024 * 1024,
        }
    }
}

/// Builder for [`Gateway`]
#[derive(Debug, Clone, Default)]
pub struct GatewayBuilder {
    config: GatewayConfig,
}

impl GatewayBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Set the timeout for JSON calls
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the timeout for uploads and downloads
    #[must_use]
    pub fn upload_timeout(mut self, timeout: Duration) -> Self {
        self.config.upload_timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    #[must_use]
    pub fn upload_max_body_size(mut self, size: usize) -> Self {
        self.config.upload_max_body_size = size;
        self
    }

    /// Resolve the endpoint from `sources` and build the gateway
    ///
    /// # Errors
    /// Returns `ConfigError` if the endpoint cannot be resolved or the HTTP
    /// clients cannot be initialized.
    pub fn build(self, sources: &EndpointSources) -> Result<Gateway, ConfigError> {
        let endpoint = sources.resolve()?;
        self.build_for(endpoint)
    }

    /// Build a gateway for an already resolved endpoint
    ///
    /// # Errors
    /// Returns `ConfigError::Transport` if the HTTP clients cannot be initialized.
    pub fn build_for(self, endpoint: Endpoint) -> Result<Gateway, ConfigError> {
        let transport = if endpoint.is_insecure() {
            warn!(
                base_url = %endpoint,
                "backend reached over plain HTTP - traffic will NOT be encrypted"
            );
            TransportSecurity::AllowInsecureHttp
        } else {
            TransportSecurity::TlsOnly
        };

        let config = self.config;
        let http = HttpClientBuilder::with_config(HttpClientConfig::default())
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .max_body_size(config.max_body_size)
            .transport(transport)
            .build()?;
        let uploads = HttpClientBuilder::with_config(HttpClientConfig::upload())
            .timeout(config.upload_timeout)
            .user_agent(config.user_agent)
            .max_body_size(config.upload_max_body_size)
            .transport(transport)
            .build()?;

        info!(
            base_url = %endpoint,
            source = %endpoint.source(),
            "request gateway ready"
        );

        Ok(Gateway {
            http,
            uploads,
            endpoint: Arc::new(endpoint),
        })
    }
}

/// Shared entry point for all backend calls
///
/// Cheap to clone; clones share connection pools and the endpoint.
#[derive(Clone)]
pub struct Gateway {
    http: HttpClient,
    uploads: HttpClient,
    endpoint: Arc<Endpoint>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("endpoint", &self.endpoint.base_url())
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Build a gateway with default settings
    ///
    /// # Errors
    /// Returns `ConfigError` if the endpoint cannot be resolved or the HTTP
    /// clients cannot be initialized.
    pub fn new(sources: &EndpointSources) -> Result<Self, ConfigError> {
        GatewayBuilder::new().build(sources)
    }

    /// Build a gateway from the `GLASSDOC_*` environment
    ///
    /// # Errors
    /// Returns `ConfigError` if the environment is malformed or the endpoint
    /// cannot be resolved.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&EndpointSources::from_env()?)
    }

    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Resolved backend endpoint
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    #[must_use]
    pub fn applications(&self) -> ApplicationsApi<'_> {
        ApplicationsApi::new(self)
    }

    #[must_use]
    pub fn companies(&self) -> CompaniesApi<'_> {
        CompaniesApi::new(self)
    }

    #[must_use]
    pub fn templates(&self) -> TemplatesApi<'_> {
        TemplatesApi::new(self)
    }

    #[must_use]
    pub fn uploads(&self) -> UploadsApi<'_> {
        UploadsApi::new(self)
    }

    #[must_use]
    pub fn mvp(&self) -> MvpApi<'_> {
        MvpApi::new(self)
    }

    #[must_use]
    pub fn system(&self) -> SystemApi<'_> {
        SystemApi::new(self)
    }

    /// `GET` an envelope
    ///
    /// # Errors
    /// Returns the normalized `ApiError` for any transport or status failure.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.get_json(path, &()).await
    }

    /// `GET` an envelope with a query string built from `query`
    ///
    /// Fields serialized as absent are left out; an empty query adds no `?`.
    ///
    /// # Errors
    /// Returns `REQUEST_ERROR` if `query` cannot be encoded, otherwise the
    /// normalized error for any transport or status failure.
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.get_json(path, query).await
    }

    /// `GET` any JSON document, for the few endpoints that skip the envelope
    ///
    /// # Errors
    /// Returns the normalized `ApiError` for any transport or status failure.
    pub async fn get_json<R, Q>(&self, path: &str, query: &Q) -> Result<R, ApiError>
    where
        R: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(&Method::GET, path, query)?;
        self.execute(&Method::GET, path, Ok(self.http.get(&url)))
            .await
    }

    /// `POST` a JSON body
    ///
    /// # Errors
    /// Returns `REQUEST_ERROR` if `body` cannot be serialized, otherwise the
    /// normalized error for any transport or status failure.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(&Method::POST, path, Some(body)).await
    }

    /// `POST` without a body
    ///
    /// # Errors
    /// Returns the normalized `ApiError` for any transport or status failure.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.send_json::<T, ()>(&Method::POST, path, None).await
    }

    /// `PUT` a JSON body
    ///
    /// # Errors
    /// Returns `REQUEST_ERROR` if `body` cannot be serialized, otherwise the
    /// normalized error for any transport or status failure.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(&Method::PUT, path, Some(body)).await
    }

    /// `PATCH` a JSON body
    ///
    /// # Errors
    /// Returns `REQUEST_ERROR` if `body` cannot be serialized, otherwise the
    /// normalized error for any transport or status failure.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(&Method::PATCH, path, Some(body)).await
    }

    /// `DELETE` a resource
    ///
    /// # Errors
    /// Returns the normalized `ApiError` for any transport or status failure.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>, ApiError> {
        self.send_json::<T, ()>(&Method::DELETE, path, None).await
    }

    /// Send a `multipart/form-data` body, optionally observing upload progress
    ///
    /// Uses the upload client, so the longer upload timeout applies.
    ///
    /// # Errors
    /// Returns the normalized `ApiError` for any transport or status failure.
    pub async fn upload<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        form: Form,
        progress: Option<ProgressCallback>,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = self.url(method, path, &())?;
        let mut request = self.uploads.request(method.clone(), &url).multipart(form);
        if let Some(progress) = progress {
            request = request.on_upload_progress(move |pct| progress(pct));
        }
        self.execute(method, path, Ok(request)).await
    }

    /// `GET` a binary resource (exports, generated documents)
    ///
    /// # Errors
    /// Returns the normalized `ApiError` for any transport or status failure.
    pub async fn download<Q: Serialize + ?Sized>(&self, path: &str, query: &Q) -> Result<Download, ApiError> {
        let url = self.url(&Method::GET, path, query)?;
        debug!(method = "GET", path, "gateway download");

        let result = async {
            let response = self.uploads.get(&url).send().await?;
            let content_type = header_string(response.headers(), &CONTENT_TYPE);
            let file_name = header_string(response.headers(), &CONTENT_DISPOSITION)
                .as_deref()
                .and_then(disposition_file_name);
            let bytes = response.checked_bytes().await?;
            Ok::<_, HttpError>(Download {
                bytes,
                content_type,
                file_name,
            })
        }
        .await;

        result.map_err(|e| self.fail(&Method::GET, path, e))
    }

    async fn send_json<T, B>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(method, path, &())?;
        let request = self.http.request(method.clone(), &url);
        let request = match body {
            Some(body) => request.json(body),
            None => Ok(request),
        };
        self.execute(method, path, request).await
    }

    /// Single exit for every JSON call: send, read, classify, log.
    async fn execute<R: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        request: Result<RequestBuilder, HttpError>,
    ) -> Result<R, ApiError> {
        debug!(method = %method, path, "gateway request");

        let request = match request {
            Ok(request) => request,
            Err(e) => return Err(self.fail_before_send(method, path, e)),
        };

        let response = request.send().await.map_err(|e| self.fail(method, path, e))?;
        let status = response.status();
        response.json::<R>().await.map_err(|e| match e {
            HttpError::Json(_) if status.is_success() => {
                let api = ApiError::unreadable_body(status.as_u16(), e);
                self.log_failure(method, path, &api);
                api
            }
            e => self.fail(method, path, e),
        })
    }

    fn url<Q: Serialize + ?Sized>(
        &self,
        method: &Method,
        path: &str,
        query: &Q,
    ) -> Result<String, ApiError> {
        let url = self.endpoint.api_url(path);
        let query = serde_urlencoded::to_string(query)
            .map_err(|e| self.fail_before_send(method, path, HttpError::FormEncode(e)))?;
        if query.is_empty() {
            Ok(url)
        } else {
            Ok(format!("{url}?{query}"))
        }
    }

    fn fail(&self, method: &Method, path: &str, err: HttpError) -> ApiError {
        let api = ApiError::from_http(err);
        self.log_failure(method, path, &api);
        api
    }

    fn fail_before_send(&self, method: &Method, path: &str, err: HttpError) -> ApiError {
        let api = ApiError::request_error(err);
        self.log_failure(method, path, &api);
        api
    }

    fn log_failure(&self, method: &Method, path: &str, api: &ApiError) {
        let raw = api.http_error().map(ToString::to_string).unwrap_or_default();
        error!(
            method = %method,
            path,
            base_url = %self.endpoint,
            code = %api.code(),
            status = api.status(),
            error = raw,
            "API request failed: {}",
            api.message()
        );
    }
}

fn header_string(headers: &http::HeaderMap, name: &http::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// File name from a `Content-Disposition` value; `filename*` wins over `filename`.
fn disposition_file_name(value: &str) -> Option<String> {
    let mut plain = None;
    for param in value.split(';').map(str::trim) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = raw
                    .trim()
                    .split_once("''")
                    .map_or(raw.trim(), |(_, rest)| rest);
                if let Ok(decoded) = urlencoding::decode(encoded) {
                    return Some(decoded.into_owned());
                }
            }
            "filename" => {
                plain = Some(raw.trim().trim_matches('"').to_owned());
            }
            _ => {}
        }
    }
    plain.filter(|name| !name.is_empty())
}
