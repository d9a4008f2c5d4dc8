use crate::error::HttpError;
use http::{HeaderValue, Request, Response, header};
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer that sets `User-Agent` and `Accept` on requests that lack them
#[derive(Clone, Debug)]
pub struct DefaultHeadersLayer {
    user_agent: HeaderValue,
    accept: HeaderValue,
}

impl DefaultHeadersLayer {
    /// Create the layer from header values
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if either value is not a valid header value
    pub fn try_new(user_agent: impl AsRef<str>, accept: impl AsRef<str>) -> Result<Self, HttpError> {
        Ok(Self {
            user_agent: HeaderValue::from_str(user_agent.as_ref())?,
            accept: HeaderValue::from_str(accept.as_ref())?,
        })
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeadersService {
            inner,
            user_agent: self.user_agent.clone(),
            accept: self.accept.clone(),
        }
    }
}

/// Service produced by [`DefaultHeadersLayer`]
#[derive(Clone, Debug)]
pub struct DefaultHeadersService<S> {
    inner: S,
    user_agent: HeaderValue,
    accept: HeaderValue,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for DefaultHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let headers = req.headers_mut();
        headers
            .entry(header::USER_AGENT)
            .or_insert_with(|| self.user_agent.clone());
        headers
            .entry(header::ACCEPT)
            .or_insert_with(|| self.accept.clone());
        self.inner.call(req)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::body::RequestBody;
    use http::{Method, StatusCode};
    use tower::ServiceExt;

    /// Echoes the headers it received back as response headers.
    #[derive(Clone)]
    struct EchoHeaders;

    impl Service<Request<RequestBody>> for EchoHeaders {
        type Response = Response<()>;
        type Error = std::convert::Infallible;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<RequestBody>) -> Self::Future {
            let mut resp = Response::builder().status(StatusCode::OK);
            for (name, value) in req.headers() {
                resp = resp.header(name, value);
            }
            std::future::ready(Ok(resp.body(()).unwrap()))
        }
    }

    fn request(extra: Option<(header::HeaderName, &'static str)>) -> Request<RequestBody> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri("http://localhost:5000/api/health");
        if let Some((name, value)) = extra {
            builder = builder.header(name, value);
        }
        builder.body(RequestBody::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let layer = DefaultHeadersLayer::try_new("glassdoc-test/1.0", "application/json").unwrap();
        let resp = layer.layer(EchoHeaders).oneshot(request(None)).await.unwrap();

        assert_eq!(resp.headers()[header::USER_AGENT], "glassdoc-test/1.0");
        assert_eq!(resp.headers()[header::ACCEPT], "application/json");
    }

    #[tokio::test]
    async fn test_caller_headers_win() {
        let layer = DefaultHeadersLayer::try_new("glassdoc-test/1.0", "application/json").unwrap();
        let resp = layer
            .layer(EchoHeaders)
            .oneshot(request(Some((header::ACCEPT, "application/octet-stream"))))
            .await
            .unwrap();

        assert_eq!(resp.headers()[header::ACCEPT], "application/octet-stream");
        assert_eq!(resp.headers()[header::USER_AGENT], "glassdoc-test/1.0");
    }

    #[test]
    fn test_invalid_value_rejected() {
        let result = DefaultHeadersLayer::try_new("bad\x00agent", "application/json");
        assert!(matches!(result, Err(HttpError::InvalidHeaderValue(_))));
    }
}
