//! Normalized API errors.
//!
//! Every failed call made through the [`Gateway`](crate::Gateway) surfaces as
//! one [`ApiError`], built exactly once from the transport error by
//! [`ApiError::from_http`]. Classification, first match wins:
//!
//! | Condition                  | Code                  |
//! |----------------------------|-----------------------|
//! | status 400                 | `BAD_REQUEST`         |
//! | status 401                 | `UNAUTHORIZED`        |
//! | status 403                 | `FORBIDDEN`           |
//! | status 404                 | `NOT_FOUND`           |
//! | status 422                 | `VALIDATION_ERROR`    |
//! | status 500                 | `SERVER_ERROR`        |
//! | status 502                 | `BAD_GATEWAY`         |
//! | status 503                 | `SERVICE_UNAVAILABLE` |
//! | any other status           | `HTTP_{status}`       |
//! | sent, no usable response   | `NO_RESPONSE`         |
//! | never sent                 | `REQUEST_ERROR`       |

use glassdoc_http::HttpError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// User-facing messages attached to normalized errors.
#[allow(clippy::non_ascii_literal)]
pub mod messages {
    pub const BAD_REQUEST: &str = "请求参数错误";
    pub const UNAUTHORIZED: &str = "未授权，请重新登录";
    pub const FORBIDDEN: &str = "拒绝访问";
    pub const NOT_FOUND: &str = "请求的资源不存在";
    pub const VALIDATION_ERROR: &str = "数据验证失败";
    pub const SERVER_ERROR: &str = "服务器内部错误";
    pub const BAD_GATEWAY: &str = "网关错误";
    pub const SERVICE_UNAVAILABLE: &str = "服务暂不可用";
    pub const NETWORK_ERROR: &str = "网络错误，请稍后重试";
    pub const NO_RESPONSE: &str = "网络连接失败，请检查网络设置";
    pub const REQUEST_ERROR: &str = "请求配置错误";

    /// Generic message for statuses without a dedicated code
    #[must_use]
    pub fn http_status(status: u16) -> String {
        format!("请求失败 ({status})")
    }
}

/// Error codes reported by the backend in the `code` field of an error body
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BusinessCode {
    CompanyNotFound,
    CompanyAlreadyExists,
    InvalidCompanyData,
    FileUploadFailed,
    PermissionDenied,
    RateLimitExceeded,
    AiExtractionFailed,
    DocumentGenerationFailed,
    TemplateNotFound,
    SessionExpired,
    /// Any code this client does not know yet
    Other(String),
}

impl BusinessCode {
    /// Wire representation, e.g. `COMPANY_NOT_FOUND`
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::CompanyNotFound => "COMPANY_NOT_FOUND",
            Self::CompanyAlreadyExists => "COMPANY_ALREADY_EXISTS",
            Self::InvalidCompanyData => "INVALID_COMPANY_DATA",
            Self::FileUploadFailed => "FILE_UPLOAD_FAILED",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::AiExtractionFailed => "AI_EXTRACTION_FAILED",
            Self::DocumentGenerationFailed => "DOCUMENT_GENERATION_FAILED",
            Self::TemplateNotFound => "TEMPLATE_NOT_FOUND",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::Other(code) => code,
        }
    }
}

impl From<&str> for BusinessCode {
    fn from(code: &str) -> Self {
        match code {
            "COMPANY_NOT_FOUND" => Self::CompanyNotFound,
            "COMPANY_ALREADY_EXISTS" => Self::CompanyAlreadyExists,
            "INVALID_COMPANY_DATA" => Self::InvalidCompanyData,
            "FILE_UPLOAD_FAILED" => Self::FileUploadFailed,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "RATE_LIMIT_EXCEEDED" => Self::RateLimitExceeded,
            "AI_EXTRACTION_FAILED" => Self::AiExtractionFailed,
            "DOCUMENT_GENERATION_FAILED" => Self::DocumentGenerationFailed,
            "TEMPLATE_NOT_FOUND" => Self::TemplateNotFound,
            "SESSION_EXPIRED" => Self::SessionExpired,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for BusinessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized error code
///
/// Displays and serializes as the upper-case wire form
/// (`NOT_FOUND`, `HTTP_418`, `COMPANY_NOT_FOUND`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    ValidationError,
    ServerError,
    BadGateway,
    ServiceUnavailable,
    NetworkError,
    NoResponse,
    RequestError,
    /// Status without a dedicated code
    HttpStatus(u16),
    /// Code supplied by the backend
    Business(BusinessCode),
}

impl ErrorCode {
    /// Code for an HTTP status
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            422 => Self::ValidationError,
            500 => Self::ServerError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            other => Self::HttpStatus(other),
        }
    }

    /// Fixed user-facing message for this code
    #[must_use]
    pub fn default_message(&self) -> String {
        match self {
            Self::BadRequest => messages::BAD_REQUEST.to_owned(),
            Self::Unauthorized => messages::UNAUTHORIZED.to_owned(),
            Self::Forbidden => messages::FORBIDDEN.to_owned(),
            Self::NotFound => messages::NOT_FOUND.to_owned(),
            Self::ValidationError => messages::VALIDATION_ERROR.to_owned(),
            Self::ServerError => messages::SERVER_ERROR.to_owned(),
            Self::BadGateway => messages::BAD_GATEWAY.to_owned(),
            Self::ServiceUnavailable => messages::SERVICE_UNAVAILABLE.to_owned(),
            Self::NetworkError => messages::NETWORK_ERROR.to_owned(),
            Self::NoResponse => messages::NO_RESPONSE.to_owned(),
            Self::RequestError => messages::REQUEST_ERROR.to_owned(),
            Self::HttpStatus(status) => messages::http_status(*status),
            Self::Business(code) => code.as_str().to_owned(),
        }
    }

    /// Whether the server's own message replaces the fixed one
    fn prefers_server_message(&self) -> bool {
        matches!(
            self,
            Self::BadRequest | Self::ValidationError | Self::HttpStatus(_)
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => f.write_str("BAD_REQUEST"),
            Self::Unauthorized => f.write_str("UNAUTHORIZED"),
            Self::Forbidden => f.write_str("FORBIDDEN"),
            Self::NotFound => f.write_str("NOT_FOUND"),
            Self::ValidationError => f.write_str("VALIDATION_ERROR"),
            Self::ServerError => f.write_str("SERVER_ERROR"),
            Self::BadGateway => f.write_str("BAD_GATEWAY"),
            Self::ServiceUnavailable => f.write_str("SERVICE_UNAVAILABLE"),
            Self::NetworkError => f.write_str("NETWORK_ERROR"),
            Self::NoResponse => f.write_str("NO_RESPONSE"),
            Self::RequestError => f.write_str("REQUEST_ERROR"),
            Self::HttpStatus(status) => write!(f, "HTTP_{status}"),
            Self::Business(code) => f.write_str(code.as_str()),
        }
    }
}

impl FromStr for ErrorCode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "BAD_REQUEST" => Self::BadRequest,
            "UNAUTHORIZED" => Self::Unauthorized,
            "FORBIDDEN" => Self::Forbidden,
            "NOT_FOUND" => Self::NotFound,
            "VALIDATION_ERROR" => Self::ValidationError,
            "SERVER_ERROR" => Self::ServerError,
            "BAD_GATEWAY" => Self::BadGateway,
            "SERVICE_UNAVAILABLE" => Self::ServiceUnavailable,
            "NETWORK_ERROR" => Self::NetworkError,
            "NO_RESPONSE" => Self::NoResponse,
            "REQUEST_ERROR" => Self::RequestError,
            other => match other
                .strip_prefix("HTTP_")
                .and_then(|n| n.parse::<u16>().ok())
            {
                Some(status) => Self::HttpStatus(status),
                None => Self::Business(BusinessCode::from(other)),
            },
        })
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let Ok(code) = raw.parse::<ErrorCode>();
        Ok(code)
    }
}

/// The single error shape returned by every gateway call
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    message: String,
    code: ErrorCode,
    status: Option<u16>,
    data: Option<Value>,
    #[source]
    source: Option<HttpError>,
}

impl ApiError {
    /// Create an error that did not come from the transport
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            status: None,
            data: None,
            source: None,
        }
    }

    /// Classify a transport failure
    #[must_use]
    pub fn from_http(err: HttpError) -> Self {
        if let HttpError::HttpStatus {
            status,
            body,
            ..
        } = &err
        {
            let status = status.as_u16();
            let code = ErrorCode::from_status(status);
            let data = serde_json::from_str::<Value>(body).ok();
            let message = data
                .as_ref()
                .filter(|_| code.prefers_server_message())
                .and_then(server_message)
                .unwrap_or_else(|| code.default_message());
            return Self {
                message,
                code,
                status: Some(status),
                data,
                source: Some(err),
            };
        }

        if err.is_request_error() || matches!(err, HttpError::Overloaded | HttpError::ServiceClosed)
        {
            return Self::request_error(err);
        }

        Self {
            message: messages::NO_RESPONSE.to_owned(),
            code: ErrorCode::NoResponse,
            status: None,
            data: None,
            source: Some(err),
        }
    }

    /// A response arrived but its body could not be read as the expected JSON
    ///
    /// Classified like a missing response, keeping the status that was received.
    #[must_use]
    pub fn unreadable_body(status: u16, err: HttpError) -> Self {
        Self {
            status: Some(status),
            ..Self::from_http(err)
        }
    }

    /// Classify a failure that happened before the request was sent
    ///
    /// Used for errors raised while encoding a body, where the transport
    /// error type alone cannot tell sending from receiving apart.
    #[must_use]
    pub fn request_error(err: HttpError) -> Self {
        let message = err.to_string();
        Self {
            message: if message.is_empty() {
                messages::REQUEST_ERROR.to_owned()
            } else {
                message
            },
            code: ErrorCode::RequestError,
            status: None,
            data: None,
            source: Some(err),
        }
    }

    /// User-facing message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Normalized code
    #[must_use]
    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    /// HTTP status, when a response was received
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Parsed JSON error body, when the server sent one
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Underlying transport error
    #[must_use]
    pub fn http_error(&self) -> Option<&HttpError> {
        self.source.as_ref()
    }

    /// Backend business code carried in the error body (`code` or `error_code`)
    #[must_use]
    pub fn business_code(&self) -> Option<BusinessCode> {
        let data = self.data.as_ref()?;
        data.get("code")
            .or_else(|| data.get("error_code"))
            .and_then(Value::as_str)
            .map(BusinessCode::from)
    }
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        Self::from_http(err)
    }
}

fn server_message(data: &Value) -> Option<String> {
    data.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::non_ascii_literal)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::error::Error as _;
    use std::time::Duration;

    fn status_error(status: u16, body: &str) -> HttpError {
        HttpError::HttpStatus {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_owned(),
            content_type: Some("application/json".to_owned()),
        }
    }

    #[test]
    fn test_mapped_statuses() {
        let cases = [
            (400, ErrorCode::BadRequest, "BAD_REQUEST"),
            (401, ErrorCode::Unauthorized, "UNAUTHORIZED"),
            (403, ErrorCode::Forbidden, "FORBIDDEN"),
            (404, ErrorCode::NotFound, "NOT_FOUND"),
            (422, ErrorCode::ValidationError, "VALIDATION_ERROR"),
            (500, ErrorCode::ServerError, "SERVER_ERROR"),
            (502, ErrorCode::BadGateway, "BAD_GATEWAY"),
            (503, ErrorCode::ServiceUnavailable, "SERVICE_UNAVAILABLE"),
        ];
        for (status, code, wire) in cases {
            let err = ApiError::from_http(status_error(status, ""));
            assert_eq!(err.code(), &code, "status {status}");
            assert_eq!(err.code().to_string(), wire);
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn test_unmapped_status_uses_http_code() {
        for status in [402, 409, 418, 429, 504] {
            let err = ApiError::from_http(status_error(status, ""));
            assert_eq!(err.code(), &ErrorCode::HttpStatus(status));
            assert_eq!(err.code().to_string(), format!("HTTP_{status}"));
            assert_eq!(err.message(), format!("请求失败 ({status})"));
        }
    }

    #[test]
    fn test_not_found_without_body() {
        let err = ApiError::from_http(status_error(404, ""));
        assert_eq!(err.message(), "请求的资源不存在");
        assert!(err.data().is_none());
    }

    #[test]
    fn test_validation_error_uses_server_message() {
        let err = ApiError::from_http(status_error(422, r#"{"message":"字段X必填"}"#));
        assert_eq!(err.code(), &ErrorCode::ValidationError);
        assert_eq!(err.message(), "字段X必填");
        assert_eq!(err.data().unwrap()["message"], "字段X必填");
    }

    #[test]
    fn test_bad_request_falls_back_to_generic_message() {
        let err = ApiError::from_http(status_error(400, r#"{"message":"  "}"#));
        assert_eq!(err.message(), messages::BAD_REQUEST);

        let err = ApiError::from_http(status_error(400, "<html>oops</html>"));
        assert_eq!(err.message(), messages::BAD_REQUEST);
        assert!(err.data().is_none());
    }

    #[test]
    fn test_fixed_message_statuses_ignore_server_message() {
        let err = ApiError::from_http(status_error(401, r#"{"message":"token expired"}"#));
        assert_eq!(err.message(), messages::UNAUTHORIZED);
        assert_eq!(err.data().unwrap()["message"], "token expired");

        let err = ApiError::from_http(status_error(500, r#"{"message":"Traceback"}"#));
        assert_eq!(err.message(), messages::SERVER_ERROR);
    }

    #[test]
    fn test_unmapped_status_uses_server_message() {
        let err = ApiError::from_http(status_error(409, r#"{"message":"企业已存在"}"#));
        assert_eq!(err.message(), "企业已存在");
    }

    #[test]
    fn test_business_code_passthrough() {
        let err = ApiError::from_http(status_error(
            409,
            r#"{"success":false,"code":"COMPANY_ALREADY_EXISTS","message":"dup"}"#,
        ));
        assert_eq!(err.business_code(), Some(BusinessCode::CompanyAlreadyExists));

        let err = ApiError::from_http(status_error(400, r#"{"error_code":"QUOTA_FULL"}"#));
        assert_eq!(
            err.business_code(),
            Some(BusinessCode::Other("QUOTA_FULL".to_owned()))
        );
    }

    #[test]
    fn test_transport_failures_are_no_response() {
        let errors = [
            HttpError::Timeout(Duration::from_secs(10)),
            HttpError::Transport("connection refused".into()),
            HttpError::Tls("handshake failed".into()),
            HttpError::BodyTooLarge {
                limit: 10,
                actual: 20,
            },
        ];
        for err in errors {
            let api = ApiError::from_http(err);
            assert_eq!(api.code(), &ErrorCode::NoResponse);
            assert_eq!(api.message(), messages::NO_RESPONSE);
            assert!(api.status().is_none());
            assert!(api.source().is_some());
        }
    }

    #[test]
    fn test_validation_message_survives_long_error_body() {
        let body = format!(
            r#"{{"message":"字段X必填","errors":"{}"}}"#,
            "x".repeat(9000)
        );
        let err = ApiError::from_http(status_error(422, &body));
        assert_eq!(err.code(), &ErrorCode::ValidationError);
        assert_eq!(err.message(), "字段X必填");
        assert_eq!(err.data().unwrap()["errors"].as_str().unwrap().len(), 9000);
    }

    #[test]
    fn test_unreadable_body_keeps_status() {
        let json = serde_json::from_str::<Value>("<html>").unwrap_err();
        let err = ApiError::unreadable_body(200, HttpError::Json(json));
        assert_eq!(err.code(), &ErrorCode::NoResponse);
        assert_eq!(err.message(), messages::NO_RESPONSE);
        assert_eq!(err.status(), Some(200));
        assert!(err.data().is_none());
    }

    #[test]
    fn test_unsent_requests_are_request_error() {
        let errors = [
            HttpError::InvalidUri {
                url: "/relative".to_owned(),
                kind: glassdoc_http::InvalidUriKind::MissingAuthority,
                reason: "missing host/authority".to_owned(),
            },
            HttpError::InvalidScheme {
                scheme: "ftp".to_owned(),
                reason: "unsupported".to_owned(),
            },
            HttpError::Overloaded,
            HttpError::ServiceClosed,
        ];
        for err in errors {
            let expected = err.to_string();
            let api = ApiError::from_http(err);
            assert_eq!(api.code(), &ErrorCode::RequestError);
            assert_eq!(api.message(), expected);
        }
    }

    #[test]
    fn test_error_code_parse() {
        assert_eq!("NOT_FOUND".parse::<ErrorCode>().unwrap(), ErrorCode::NotFound);
        assert_eq!(
            "HTTP_418".parse::<ErrorCode>().unwrap(),
            ErrorCode::HttpStatus(418)
        );
        assert_eq!(
            "SESSION_EXPIRED".parse::<ErrorCode>().unwrap(),
            ErrorCode::Business(BusinessCode::SessionExpired)
        );
        assert_eq!(
            "HTTP_TEAPOT".parse::<ErrorCode>().unwrap(),
            ErrorCode::Business(BusinessCode::Other("HTTP_TEAPOT".to_owned()))
        );
    }

    #[test]
    fn test_error_code_serde() {
        let json = serde_json::to_string(&ErrorCode::HttpStatus(429)).unwrap();
        assert_eq!(json, "\"HTTP_429\"");

        let code: ErrorCode = serde_json::from_str("\"TEMPLATE_NOT_FOUND\"").unwrap();
        assert_eq!(code, ErrorCode::Business(BusinessCode::TemplateNotFound));
    }

    #[test]
    fn test_display_includes_code_and_message() {
        let err = ApiError::new(ErrorCode::NetworkError, messages::NETWORK_ERROR);
        assert_eq!(err.to_string(), "NETWORK_ERROR: 网络错误，请稍后重试");
        assert!(err.http_error().is_none());
    }
}
