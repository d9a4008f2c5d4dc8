use crate::body::RequestBody;
use crate::config::{HttpClientConfig, PoolConfig, TransportSecurity};
use crate::error::HttpError;
use crate::layers::{DefaultHeadersLayer, RequestSpanLayer};
use crate::response::ResponseBody;
use bytes::Bytes;
use http::Response;
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::sync::Arc;
use std::time::Duration;
use tower::buffer::Buffer;
use tower::limit::ConcurrencyLimitLayer;
use tower::load_shed::LoadShedLayer;
use tower::timeout::TimeoutLayer;
use tower::util::BoxCloneService;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::decompression::DecompressionLayer;
use tower_http::follow_redirect::FollowRedirectLayer;
use tower_http::follow_redirect::policy::Limited;

type InnerService =
    BoxCloneService<http::Request<RequestBody>, http::Response<ResponseBody>, HttpError>;

/// Builder for an [`HttpClient`](crate::HttpClient)
#[derive(Debug, Clone, Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.config.accept = accept.into();
        self
    }

    /// Largest accepted response body, measured after decompression
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Shorthand for `.transport(TransportSecurity::AllowInsecureHttp)`
    ///
    /// Debug builds only, unless the `allow-insecure-http` feature is on.
    #[must_use]
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(self) -> Self {
        self.transport(TransportSecurity::AllowInsecureHttp)
    }

    /// Cap on requests in flight; `None` removes the cap
    #[must_use]
    pub fn max_in_flight(mut self, limit: Option<usize>) -> Self {
        self.config.max_in_flight = limit;
        self
    }

    /// Requests that may queue for the worker (at least 1)
    #[must_use]
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.config.queue_depth = depth.max(1);
        self
    }

    /// Redirect hops to follow; `0` hands 3xx responses back unchanged
    #[must_use]
    pub fn redirect_limit(mut self, hops: usize) -> Self {
        self.config.redirect_limit = hops;
        self
    }

    #[must_use]
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.config.pool = pool;
        self
    }

    /// Assemble the tower stack around a pooled hyper client
    ///
    /// Outer to inner: buffer, request span, load shed and concurrency limit
    /// (when `max_in_flight` is set), timeout, default headers,
    /// decompression, redirects, hyper. Every HTTP status comes back as
    /// `Ok`; only transport, TLS and timeout failures are errors here.
    ///
    /// # Errors
    /// Fails if rustls cannot be initialized or the `User-Agent` / `Accept`
    /// values are not valid header values.
    pub fn build(self) -> Result<crate::HttpClient, HttpError> {
        let config = self.config;
        if config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                target: "glassdoc_http::security",
                "insecure HTTP enabled; requests to http:// URLs are sent unencrypted"
            );
        }

        let defaults = DefaultHeadersLayer::try_new(&config.user_agent, &config.accept)?;
        let hyper_client = pooled_client(&config.pool, https_connector(config.transport)?);

        let timeout = config.timeout;
        let mut service: InnerService = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .layer(defaults)
            .layer(DecompressionLayer::new())
            .layer(FollowRedirectLayer::with_policy(Limited::new(
                config.redirect_limit,
            )))
            .service(hyper_client)
            .map_response(box_response_body)
            .map_err(move |e: tower::BoxError| classify_stack_error(e, Some(timeout)))
            .boxed_clone();

        if let Some(limit) = config.max_in_flight {
            service = ServiceBuilder::new()
                .layer(LoadShedLayer::new())
                .layer(ConcurrencyLimitLayer::new(limit.max(1)))
                .service(service)
                .map_err(|e: tower::BoxError| classify_stack_error(e, None))
                .boxed_clone();
        }

        let service = ServiceBuilder::new()
            .layer(RequestSpanLayer::new())
            .service(service)
            .boxed_clone();

        Ok(crate::HttpClient {
            service: Buffer::new(service, config.queue_depth.max(1)),
            max_body_size: config.max_body_size,
            transport_security: config.transport,
        })
    }
}

fn pooled_client(
    pool: &PoolConfig,
    connector: HttpsConnector<HttpConnector>,
) -> Client<HttpsConnector<HttpConnector>, RequestBody> {
    let mut builder = Client::builder(TokioExecutor::new());
    // idle_timeout is ignored without a timer
    builder
        .pool_timer(TokioTimer::new())
        .pool_max_idle_per_host(pool.max_idle_per_host);
    if let Some(idle) = pool.idle_timeout {
        builder.pool_idle_timeout(idle);
    }
    builder.build(connector)
}

/// Turn a boxed stack error back into `HttpError`
///
/// `timeout` is set only for the layer that owns the timeout.
fn classify_stack_error(err: tower::BoxError, timeout: Option<Duration>) -> HttpError {
    if let Some(timeout) = timeout
        && err.is::<tower::timeout::error::Elapsed>()
    {
        return HttpError::Timeout(timeout);
    }
    if err.is::<tower::load_shed::error::Overloaded>() {
        return HttpError::Overloaded;
    }
    match err.downcast::<HttpError>() {
        Ok(typed) => *typed,
        Err(other) => HttpError::Transport(other),
    }
}

fn box_response_body<B>(response: Response<B>) -> Response<ResponseBody>
where
    B: hyper::body::Body<Data = Bytes> + Send + Sync + 'static,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    response.map(|body| body.map_err(Into::into).boxed())
}

/// Rustls over webpki roots, h2 and http/1.1 offered through ALPN
///
/// An installed process-wide crypto provider is reused; aws-lc-rs otherwise.
fn https_connector(transport: TransportSecurity) -> Result<HttpsConnector<HttpConnector>, HttpError> {
    let provider = rustls::crypto::CryptoProvider::get_default()
        .cloned()
        .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));
    let builder = hyper_rustls::HttpsConnectorBuilder::new()
        .with_provider_and_webpki_roots(provider)
        .map_err(|e| HttpError::Tls(Box::new(e)))?;

    Ok(if transport == TransportSecurity::AllowInsecureHttp {
        builder.https_or_http().enable_all_versions().build()
    } else {
        builder.https_only().enable_all_versions().build()
    })
}
