use std::time::Duration;

/// User-Agent sent when the caller does not set one
pub const DEFAULT_USER_AGENT: &str = concat!("glassdoc-http/", env!("CARGO_PKG_VERSION"));

/// `Accept` sent with every request; the backend answers JSON, exports are binary
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// Whether plain `http://` URLs may be used
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Only `https://` URLs are accepted
    #[default]
    TlsOnly,
    /// `http://` is accepted as well
    ///
    /// The development backend listens on `http://localhost:5000`, and mock
    /// servers in tests never speak TLS.
    AllowInsecureHttp,
}

/// Connection pool tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Idle connections are closed after this long; `None` keeps hyper-util's default
    pub idle_timeout: Option<Duration>,
    /// Idle connections kept per host
    pub max_idle_per_host: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(90)),
            max_idle_per_host: 16,
        }
    }
}

/// Settings for one [`HttpClient`](crate::HttpClient)
///
/// The gateway keeps two clients: one built from [`HttpClientConfig::default`]
/// for JSON calls and one from [`HttpClientConfig::upload`] for multipart
/// uploads and document downloads.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout, response headers included (default: 10 s)
    pub timeout: Duration,
    /// Largest accepted response body after decompression (default: 10 MB)
    pub max_body_size: usize,
    pub user_agent: String,
    pub accept: String,
    /// Requests allowed in flight at once; `None` (the default) means no limit
    ///
    /// Requests over the limit are shed with `HttpError::Overloaded`, so a
    /// limit suits callers that can retry later, not batch uploads.
    pub max_in_flight: Option<usize>,
    /// Requests that may wait for the worker before callers are refused
    pub queue_depth: usize,
    pub transport: TransportSecurity,
    /// Redirect hops followed before the 3xx is returned as-is; `0` disables
    pub redirect_limit: usize,
    pub pool: PoolConfig,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_body_size: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            accept: DEFAULT_ACCEPT.to_owned(),
            max_in_flight: None,
            queue_depth: 512,
            transport: TransportSecurity::TlsOnly,
            redirect_limit: 5,
            pool: PoolConfig::default(),
        }
    }
}

impl HttpClientConfig {
    /// One-off calls such as a health check: small bodies, short-lived pool
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            max_body_size: 1024 * 1024,
            queue_depth: 32,
            pool: PoolConfig {
                idle_timeout: Some(Duration::from_secs(15)),
                max_idle_per_host: 2,
            },
            ..Self::default()
        }
    }

    /// Multipart uploads, document generation and binary downloads
    #[must_use]
    pub fn upload() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            max_body_size: 100 * 1024 * 1024,
            queue_depth: 64,
            pool: PoolConfig {
                idle_timeout: Some(Duration::from_secs(90)),
                max_idle_per_host: 4,
            },
            ..Self::default()
        }
    }

    /// Mock servers in tests: plain HTTP allowed
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            transport: TransportSecurity::AllowInsecureHttp,
            ..Self::minimal()
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_gateway_json_calls() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_body_size, 10 * 1024 * 1024);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.accept, DEFAULT_ACCEPT);
        assert_eq!(config.max_in_flight, None);
        assert_eq!(config.transport, TransportSecurity::TlsOnly);
        assert_eq!(config.redirect_limit, 5);
    }

    #[test]
    fn test_upload_allows_slow_large_transfers() {
        let config = HttpClientConfig::upload();
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert_eq!(config.max_body_size, 100 * 1024 * 1024);
        assert_eq!(config.transport, TransportSecurity::TlsOnly);
        assert_eq!(config.pool.max_idle_per_host, 4);
        assert!(config.max_in_flight.is_none());
    }

    #[test]
    fn test_minimal_has_no_limit() {
        let config = HttpClientConfig::minimal();
        assert!(config.max_in_flight.is_none());
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert_eq!(config.timeout, HttpClientConfig::default().timeout);
    }

    #[test]
    fn test_for_testing_allows_plain_http() {
        let config = HttpClientConfig::for_testing();
        assert_eq!(config.transport, TransportSecurity::AllowInsecureHttp);
        assert!(config.max_in_flight.is_none());
        assert_eq!(config.pool, HttpClientConfig::minimal().pool);
    }
}
