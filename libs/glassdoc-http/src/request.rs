use crate::body::{ProgressCallback, RequestBody};
use crate::client::{BufferedService, buffer_error, reserve_slot};
use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use crate::multipart::Form;
use crate::response::{HttpResponse, ResponseBody};
use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{Request, Response};
use serde::Serialize;
use std::sync::Arc;
use tower::Service;

#[derive(Clone, Debug)]
enum BodyKind {
    Empty,
    Bytes(Bytes),
    /// Serialized JSON
    Json(Bytes),
    /// Serialized `application/x-www-form-urlencoded`
    Form(Bytes),
    /// Encoded lazily at send time
    Multipart(Form),
}

/// One request under construction
///
/// A bad header is remembered and returned by [`send`](Self::send) (or by
/// the next fallible body setter). Query strings belong in the URL:
///
/// ```ignore
/// let query = serde_urlencoded::to_string(&params)?;
/// let resp = client
///     .get(&format!("{base}/api/applications?{query}"))
///     .send()
///     .await?;
/// ```
#[must_use = "RequestBuilder does nothing until .send() is called"]
pub struct RequestBuilder {
    service: BufferedService,
    max_body_size: usize,
    method: http::Method,
    url: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: BodyKind,
    progress: Option<ProgressCallback>,
    /// First error captured while building, reported by `send()`
    error: Option<HttpError>,
    transport_security: TransportSecurity,
}

impl RequestBuilder {
    pub(crate) fn new(
        service: BufferedService,
        max_body_size: usize,
        method: http::Method,
        url: String,
        transport_security: TransportSecurity,
    ) -> Self {
        Self {
            service,
            max_body_size,
            method,
            url,
            headers: Vec::new(),
            body: BodyKind::Empty,
            progress: None,
            error: None,
            transport_security,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => self.headers.push((name, value)),
            (Err(e), _) => self.error = Some(HttpError::InvalidHeaderName(e)),
            (_, Err(e)) => self.error = Some(HttpError::InvalidHeaderValue(e)),
        }
        self
    }

    pub fn headers(self, headers: Vec<(String, String)>) -> Self {
        headers
            .iter()
            .fold(self, |builder, (name, value)| builder.header(name, value))
    }

    /// JSON body; `Content-Type: application/json` unless already set
    ///
    /// # Errors
    /// A remembered header error, or `HttpError::Json`.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        self.body = BodyKind::Json(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// `application/x-www-form-urlencoded` body
    ///
    /// # Errors
    /// A remembered header error, or `HttpError::FormEncode`.
    pub fn form<T: Serialize + ?Sized>(mut self, fields: &T) -> Result<Self, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        self.body = BodyKind::Form(Bytes::from(serde_urlencoded::to_string(fields)?));
        Ok(self)
    }

    /// `multipart/form-data` body; its `Content-Type` (with boundary) always wins
    pub fn multipart(mut self, form: Form) -> Self {
        self.body = BodyKind::Multipart(form);
        self
    }

    pub fn body_bytes(mut self, body: Bytes) -> Self {
        self.body = BodyKind::Bytes(body);
        self
    }

    pub fn body_string(mut self, body: String) -> Self {
        self.body = BodyKind::Bytes(Bytes::from(body));
        self
    }

    /// Observe upload progress as a percentage in `0..=100`
    ///
    /// Called as the body is written to the connection. Requests without a
    /// body never invoke it.
    pub fn on_upload_progress(mut self, progress: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    fn validate_url(&self) -> Result<http::Uri, HttpError> {
        let uri: http::Uri =
            self.url
                .parse()
                .map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
                    url: self.url.clone(),
                    kind: InvalidUriKind::ParseError,
                    reason: e.to_string(),
                })?;

        if uri.authority().is_none() {
            return Err(HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::MissingAuthority,
                reason: "missing host/authority".to_owned(),
            });
        }

        match uri.scheme_str() {
            Some("https") => Ok(uri),
            Some("http") => match self.transport_security {
                TransportSecurity::AllowInsecureHttp => Ok(uri),
                TransportSecurity::TlsOnly => Err(HttpError::InvalidScheme {
                    scheme: "http".to_owned(),
                    reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
                }),
            },
            Some(scheme) => Err(HttpError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            }),
            None => Err(HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::MissingScheme,
                reason: "missing scheme".to_owned(),
            }),
        }
    }

    /// Send and wait for the response head
    ///
    /// 4xx and 5xx are `Ok` here; the checked readers on [`HttpResponse`]
    /// turn them into `HttpError::HttpStatus`.
    ///
    /// # Errors
    /// Request-side failures (header, URL, scheme, body encoding) before anything is
    /// sent, `Overloaded` when the queue is full, `Timeout`, `Transport` or
    /// `Tls` once on the wire.
    pub async fn send(mut self) -> Result<HttpResponse, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        let uri = self.validate_url()?;
        let mut builder = Request::builder().method(self.method).uri(uri);

        let (default_content_type, body_bytes) = match self.body {
            BodyKind::Empty => (None, Bytes::new()),
            BodyKind::Bytes(b) => (None, b),
            BodyKind::Json(b) => (Some("application/json".to_owned()), b),
            BodyKind::Form(b) => (Some("application/x-www-form-urlencoded".to_owned()), b),
            BodyKind::Multipart(form) => {
                // The boundary must match the encoded body.
                self.headers.retain(|(name, _)| name != header::CONTENT_TYPE);
                let (content_type, body) = form.encode().await?;
                (Some(content_type), body)
            }
        };

        let has_content_type = self
            .headers
            .iter()
            .any(|(name, _)| name == header::CONTENT_TYPE);
        if let Some(content_type) = default_content_type
            && !has_content_type
        {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }

        for (name, value) in self.headers {
            builder = builder.header(name, value);
        }

        let mut body = RequestBody::new(body_bytes);
        if let Some(progress) = self.progress {
            body = body.with_progress(progress);
        }
        let request = builder.body(body)?;

        reserve_slot(&mut self.service).await?;

        let inner: Response<ResponseBody> =
            self.service.call(request).await.map_err(buffer_error)?;

        Ok(HttpResponse {
            inner,
            max_body_size: self.max_body_size,
        })
    }
}
