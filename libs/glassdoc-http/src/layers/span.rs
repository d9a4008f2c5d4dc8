use crate::body::RequestBody;
use http::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{Instrument, Level};

/// Tower layer that wraps each outbound request in an `outgoing_http` span
///
/// Span fields:
/// - `http.method`
/// - `http.url` (scheme, authority and path; the query string is dropped)
/// - `http.status_code`, recorded once a response arrives
/// - `error`, set for 4xx/5xx responses and transport failures
#[derive(Clone, Debug, Default)]
pub struct RequestSpanLayer;

impl RequestSpanLayer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestSpanLayer {
    type Service = RequestSpanService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestSpanService { inner }
    }
}

/// Service produced by [`RequestSpanLayer`]
#[derive(Clone, Debug)]
pub struct RequestSpanService<S> {
    inner: S,
}

/// Render a URI without its query string.
fn sanitized_url(uri: &http::Uri) -> String {
    format!(
        "{}://{}{}",
        uri.scheme_str().unwrap_or("https"),
        uri.authority().map_or("", http::uri::Authority::as_str),
        uri.path()
    )
}

impl<S, ResBody> Service<Request<RequestBody>> for RequestSpanService<S>
where
    S: Service<Request<RequestBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<RequestBody>) -> Self::Future {
        let span = tracing::span!(
            Level::INFO, "outgoing_http",
            http.method = %req.method(),
            http.url = %sanitized_url(req.uri()),
            http.status_code = tracing::field::Empty,
            error = tracing::field::Empty,
        );

        // Call the instance that was poll_ready'd and keep a fresh clone for the next cycle.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let result = inner.call(req).instrument(span.clone()).await;

            match &result {
                Ok(response) => {
                    let status = response.status();
                    span.record("http.status_code", status.as_u16());
                    if status.is_client_error() || status.is_server_error() {
                        span.record("error", true);
                    }
                }
                Err(_) => {
                    span.record("error", true);
                }
            }

            result
        })
    }
}
