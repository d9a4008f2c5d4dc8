use crate::error::HttpError;
use bytes::Bytes;
use http::{HeaderMap, Response, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

/// How much of a non-2xx body `HttpError::HttpStatus` shows in `Display`
///
/// The error itself keeps the whole body, up to the client's `max_body_size`.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

/// Boxed response body, raw or decompressed (gzip/br/deflate).
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// Response returned by [`RequestBuilder::send`](crate::RequestBuilder::send)
///
/// Any status is a successful send. The `checked_*`, `json` and `text`
/// readers turn non-2xx into `HttpError::HttpStatus`; `bytes` does not.
/// Every reader stops at the client's `max_body_size`.
#[derive(Debug)]
pub struct HttpResponse {
    pub(crate) inner: Response<ResponseBody>,
    pub(crate) max_body_size: usize,
}

impl HttpResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// `Content-Type` header, if present and valid UTF-8
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        content_type_of(self.inner.headers())
    }

    /// Underlying response, body already decompressed
    #[must_use]
    pub fn into_inner(self) -> Response<ResponseBody> {
        self.inner
    }

    /// Fail on non-2xx without touching the body (left empty)
    ///
    /// # Errors
    /// `HttpError::HttpStatus` for any non-2xx status.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if self.inner.status().is_success() {
            return Ok(self);
        }

        Err(HttpError::HttpStatus {
            status: self.inner.status(),
            body: String::new(),
            content_type: content_type_of(self.inner.headers()).map(String::from),
        })
    }

    /// Whole body, whatever the status
    ///
    /// # Errors
    /// `HttpError::BodyTooLarge` past the limit, `Transport` if the stream breaks.
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        read_capped(self.inner, self.max_body_size).await
    }

    /// Whole body of a 2xx response
    ///
    /// # Errors
    /// `HttpError::HttpStatus` with a body preview for non-2xx,
    /// `BodyTooLarge` past the limit.
    pub async fn checked_bytes(self) -> Result<Bytes, HttpError> {
        read_checked(self.inner, self.max_body_size).await
    }

    /// Deserialize a 2xx body
    ///
    /// # Errors
    /// As [`checked_bytes`](Self::checked_bytes), plus `HttpError::Json`
    /// when the body does not match `T`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let body = read_checked(self.inner, self.max_body_size).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// 2xx body as text, invalid UTF-8 replaced
    ///
    /// # Errors
    /// As [`checked_bytes`](Self::checked_bytes).
    pub async fn text(self) -> Result<String, HttpError> {
        let body = read_checked(self.inner, self.max_body_size).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }
}

fn content_type_of(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
}

async fn read_checked(
    response: Response<ResponseBody>,
    max_body_size: usize,
) -> Result<Bytes, HttpError> {
    let status = response.status();
    if status.is_success() {
        return read_capped(response, max_body_size).await;
    }

    let content_type = content_type_of(response.headers()).map(String::from);

    // the status must survive an oversized error body
    let body = match read_capped(response, max_body_size).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(HttpError::BodyTooLarge { limit, .. }) => format!("<error body over {limit} bytes>"),
        Err(e) => return Err(e),
    };

    Err(HttpError::HttpStatus {
        status,
        body,
        content_type,
    })
}

/// Collect the body, failing once more than `limit` decompressed bytes arrive.
async fn read_capped(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<Bytes, HttpError> {
    let body = response.into_body();
    let mut body = std::pin::pin!(body);
    let mut collected = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(HttpError::BodyTooLarge {
                    limit,
                    actual: collected.len() + chunk.len(),
                });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
