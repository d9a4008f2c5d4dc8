use crate::response::ERROR_BODY_PREVIEW_LIMIT;
use std::time::Duration;
use thiserror::Error;

/// Why a URL was rejected before sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    ParseError,
    /// Relative URL, e.g. `/api/health`
    MissingAuthority,
    MissingScheme,
}

/// Failure of a single HTTP exchange
///
/// Never sent: `RequestBuild`, `InvalidHeaderName`, `InvalidHeaderValue`,
/// `InvalidUri`, `InvalidScheme`, `FormEncode`, `InvalidContentType`,
/// `MultipartEncode`.
/// Refused by the local stack: `Overloaded`, `ServiceClosed`.
/// Sent without a usable answer: `Timeout`, `Transport`, `Tls`, `BodyTooLarge`.
/// Answered with a non-2xx status: `HttpStatus`.
///
/// `Json` covers both request serialization and response parsing.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    #[error("cannot build request: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// `url` is the rejected input; `reason` is for logs only
    #[error("invalid URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    /// Scheme not permitted by the client's [`TransportSecurity`](crate::TransportSecurity)
    #[error("URL scheme '{scheme}' rejected: {reason}")]
    InvalidScheme { scheme: String, reason: String },

    #[error("cannot encode form: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// A multipart part declared an unparsable content type
    #[error("invalid content type: {0}")]
    InvalidContentType(#[from] mime::FromStrError),

    #[error("cannot encode multipart body: {0}")]
    MultipartEncode(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Concurrency limit reached; the request was shed
    #[error("client overloaded: too many requests in flight")]
    Overloaded,

    /// The buffer worker is gone
    #[error("client service closed")]
    ServiceClosed,

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection refused, reset, DNS failure and the like
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Decompressed body exceeded the client's `max_body_size`
    #[error("response body of {actual} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { limit: usize, actual: usize },

    /// `body` is read up to the client's `max_body_size`; `Display` shows
    /// only the first `ERROR_BODY_PREVIEW_LIMIT` bytes of it
    #[error("HTTP {status}: {}", preview(body))]
    HttpStatus {
        status: http::StatusCode,
        body: String,
        content_type: Option<String>,
    },
}

impl HttpError {
    /// Nothing reached the wire
    #[must_use]
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::RequestBuild(_)
                | Self::InvalidHeaderName(_)
                | Self::InvalidHeaderValue(_)
                | Self::InvalidUri { .. }
                | Self::InvalidScheme { .. }
                | Self::FormEncode(_)
                | Self::InvalidContentType(_)
                | Self::MultipartEncode(_)
        )
    }

    /// Status of an `HttpStatus` failure
    #[must_use]
    pub fn status(&self) -> Option<http::StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Leading part of an error body, cut on a character boundary
fn preview(body: &str) -> &str {
    let mut end = body.len().min(ERROR_BODY_PREVIEW_LIMIT);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body.get(..end).unwrap_or_default()
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}
