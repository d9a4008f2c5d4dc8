use crate::body::RequestBody;
use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::request::RequestBuilder;
use crate::response::ResponseBody;
use http::{Method, Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::task::Poll;
use tower::Service;
use tower::buffer::Buffer;

/// Future returned by the type-erased inner service
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, HttpError>> + Send>>;

/// Buffered service shared by all clones of an [`HttpClient`]
pub type BufferedService = Buffer<Request<RequestBody>, ServiceFuture>;

/// Client for the backend's REST surface
///
/// Clones share the connection pool and the buffer worker. See
/// [`HttpClientBuilder::build`] for the layers every request passes through.
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: BufferedService,
    pub(crate) max_body_size: usize,
    pub(crate) transport_security: TransportSecurity,
}

impl HttpClient {
    /// Client with [`HttpClientConfig::default`](crate::HttpClientConfig::default)
    ///
    /// # Errors
    /// Fails if rustls cannot be initialized.
    pub fn new() -> Result<Self, HttpError> {
        HttpClientBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Start a request; `url` must be absolute or `send()` fails with
    /// [`HttpError::InvalidUri`]
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(
            self.service.clone(),
            self.max_body_size,
            method,
            url.to_owned(),
            self.transport_security,
        )
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    #[must_use]
    pub fn transport_security(&self) -> TransportSecurity {
        self.transport_security
    }
}

/// Errors out of the buffer are either ours, passed through, or its worker dying
pub fn buffer_error(err: tower::BoxError) -> HttpError {
    err.downcast::<HttpError>().map_or_else(
        |closed| {
            tracing::error!(error = %closed, "HTTP client worker stopped");
            HttpError::ServiceClosed
        },
        |typed| *typed,
    )
}

/// Take a queue slot or fail with `Overloaded`; never waits
pub async fn reserve_slot(service: &mut BufferedService) -> Result<(), HttpError> {
    let ready = std::future::poll_fn(|cx| Poll::Ready(service.poll_ready(cx))).await;
    match ready {
        Poll::Ready(Ok(())) => Ok(()),
        Poll::Ready(Err(e)) => Err(buffer_error(e)),
        Poll::Pending => Err(HttpError::Overloaded),
    }
}
