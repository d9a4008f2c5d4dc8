//! Backend endpoint resolution.
//!
//! All inputs are gathered into one [`EndpointSources`] record and resolved
//! by [`EndpointSources::resolve`]; nothing else in the crate reads the
//! environment. Precedence, first match wins:
//!
//! 1. explicit server URL override, with the resolved port added when the
//!    URL has none;
//! 2. the page origin, in production builds only;
//! 3. `http://localhost:{port}`.
//!
//! The port is the backend-port override, then the build-time constant,
//! then [`DEFAULT_BACKEND_PORT`].

use figment::Figment;
use figment::providers::{Env, Serialized};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

/// Port used when neither the environment nor the build provides one
pub const DEFAULT_BACKEND_PORT: u16 = 5000;

/// Prefix of the environment variables read by [`EndpointSources::from_env`]
pub const ENV_PREFIX: &str = "GLASSDOC_";

/// Keys accepted from the environment, after the prefix is stripped
const ENV_KEYS: [&str; 4] = ["server_url", "backend_port", "production", "page_origin"];

/// REST resources live under this prefix of the resolved base
const API_PREFIX: &str = "/api";

/// Endpoint configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment could not be read into [`EndpointSources`]
    #[error("failed to load endpoint configuration: {0}")]
    Load(#[source] Box<figment::Error>),

    /// The server URL override is not a usable base URL
    #[error("invalid server URL '{url}': {reason}")]
    InvalidServerUrl { url: String, reason: String },

    /// The page origin is not a usable base URL
    #[error("invalid page origin '{origin}': {reason}")]
    InvalidPageOrigin { origin: String, reason: String },

    /// The HTTP transport could not be initialized
    #[error("failed to build HTTP client: {0}")]
    Transport(#[from] glassdoc_http::HttpError),
}

/// Inputs to endpoint resolution
///
/// Build with struct literal syntax in tests; use [`EndpointSources::from_env`]
/// in applications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSources {
    /// Explicit backend URL (`GLASSDOC_SERVER_URL`)
    pub server_url: Option<String>,
    /// Explicit backend port (`GLASSDOC_BACKEND_PORT`)
    pub backend_port: Option<u16>,
    /// Port injected at compile time (`GLASSDOC_BUILD_BACKEND_PORT`)
    pub build_port: Option<u16>,
    /// Production build flag (`GLASSDOC_PRODUCTION`, defaults to release profile)
    pub production: bool,
    /// Origin of the page serving the client (`GLASSDOC_PAGE_ORIGIN`)
    pub page_origin: Option<String>,
}

/// `GLASSDOC_BUILD_BACKEND_PORT` as set when the crate was compiled
///
/// A value that is not a port number fails the build.
const BUILD_BACKEND_PORT: Option<u16> = match option_env!("GLASSDOC_BUILD_BACKEND_PORT") {
    Some(port) => Some(parse_build_port(port)),
    None => None,
};

const fn parse_build_port(value: &str) -> u16 {
    match u16::from_str_radix(value.trim_ascii(), 10) {
        Ok(port) => port,
        Err(_) => panic!("GLASSDOC_BUILD_BACKEND_PORT must be a port number (0-65535)"),
    }
}

impl EndpointSources {
    /// Values fixed when the crate was compiled
    #[must_use]
    pub fn build_defaults() -> Self {
        Self {
            build_port: BUILD_BACKEND_PORT,
            production: !cfg!(debug_assertions),
            ..Self::default()
        }
    }

    /// Layered provider: build defaults, then `GLASSDOC_*` environment variables
    ///
    /// Callers may merge further providers (a YAML file, CLI flags) on top
    /// before extracting.
    #[must_use]
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Self::build_defaults()))
            .merge(Env::prefixed(ENV_PREFIX).only(&ENV_KEYS))
    }

    /// Load sources from build defaults and the process environment
    ///
    /// # Errors
    /// Returns `ConfigError::Load` if a variable has the wrong type
    /// (for example a non-numeric `GLASSDOC_BACKEND_PORT`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Extract sources from an arbitrary figment
    ///
    /// # Errors
    /// Returns `ConfigError::Load` if extraction fails.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        figment
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Resolved backend port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.backend_port
            .or(self.build_port)
            .unwrap_or(DEFAULT_BACKEND_PORT)
    }

    /// Resolve the backend endpoint
    ///
    /// Deterministic: identical sources always give the identical endpoint.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidServerUrl` or `ConfigError::InvalidPageOrigin`
    /// when the selected source is not an absolute `http`/`https` URL.
    pub fn resolve(&self) -> Result<Endpoint, ConfigError> {
        if let Some(server_url) = non_empty(self.server_url.as_deref()) {
            let base_url = with_port(server_url, self.port()).map_err(|reason| {
                ConfigError::InvalidServerUrl {
                    url: server_url.to_owned(),
                    reason,
                }
            })?;
            return Ok(Endpoint {
                base_url,
                source: EndpointSource::ServerUrl,
            });
        }

        if self.production
            && let Some(origin) = non_empty(self.page_origin.as_deref())
        {
            check_base(origin).map_err(|reason| ConfigError::InvalidPageOrigin {
                origin: origin.to_owned(),
                reason,
            })?;
            return Ok(Endpoint {
                base_url: origin.trim_end_matches('/').to_owned(),
                source: EndpointSource::PageOrigin,
            });
        }

        Ok(Endpoint {
            base_url: format!("http://localhost:{}", self.port()),
            source: EndpointSource::LocalDefault,
        })
    }
}

/// Which source produced an [`Endpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointSource {
    ServerUrl,
    PageOrigin,
    LocalDefault,
}

impl fmt::Display for EndpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ServerUrl => "server_url",
            Self::PageOrigin => "page_origin",
            Self::LocalDefault => "local_default",
        })
    }
}

/// Resolved backend location, immutable once built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    source: EndpointSource,
}

impl Endpoint {
    /// Base URL without a trailing slash, e.g. `http://localhost:5000`
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Source the base URL was taken from
    #[must_use]
    pub fn source(&self) -> EndpointSource {
        self.source
    }

    /// Root of the REST API, e.g. `http://localhost:5000/api`
    #[must_use]
    pub fn api_base(&self) -> String {
        format!("{}{API_PREFIX}", self.base_url)
    }

    /// Absolute URL of an API path such as `/applications/7`
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{API_PREFIX}{path}", self.base_url)
        } else {
            format!("{}{API_PREFIX}/{path}", self.base_url)
        }
    }

    /// Scheme is plain `http`
    #[must_use]
    pub fn is_insecure(&self) -> bool {
        self.base_url.starts_with("http://")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Parse `raw` as an absolute `http`/`https` URL with a host.
fn check_base(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("missing host".to_owned());
    }
    Ok(url)
}

/// Base URL for an override: kept as written when it names a port, otherwise
/// `port` is added.
fn with_port(raw: &str, port: u16) -> Result<String, String> {
    let mut url = check_base(raw)?;
    if has_explicit_port(raw) {
        return Ok(raw.trim_end_matches('/').to_owned());
    }
    url.set_port(Some(port))
        .map_err(|()| "cannot carry a port".to_owned())?;
    Ok(url.as_str().trim_end_matches('/').to_owned())
}

/// Whether the authority of `raw` spells out a port.
///
/// Checked on the text because `url` hides ports equal to the scheme default.
fn has_explicit_port(raw: &str) -> bool {
    let after_scheme = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    let authority = after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority
        .rsplit_once('@')
        .map_or(authority, |(_, host)| host);

    match host_port.rsplit_once(']') {
        // IPv6 literal: only a `:` after the closing bracket is a port separator
        Some((_, tail)) => tail.starts_with(':'),
        None => host_port.contains(':'),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn sources() -> EndpointSources {
        EndpointSources::default()
    }

    #[test]
    fn test_override_without_port_gets_default_port() {
        let endpoint = EndpointSources {
            server_url: Some("http://example.com".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.base_url(), "http://example.com:5000");
        assert_eq!(endpoint.source(), EndpointSource::ServerUrl);
    }

    #[test]
    fn test_override_with_port_is_verbatim() {
        let endpoint = EndpointSources {
            server_url: Some("https://api.example.com:8443/".to_owned()),
            backend_port: Some(7000),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.base_url(), "https://api.example.com:8443");
    }

    #[test]
    fn test_override_with_default_scheme_port_is_kept() {
        let endpoint = EndpointSources {
            server_url: Some("http://example.com:80".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.base_url(), "http://example.com:80");
    }

    #[test]
    fn test_override_uses_resolved_port_order() {
        let base = EndpointSources {
            server_url: Some("http://example.com".to_owned()),
            build_port: Some(6000),
            ..sources()
        };
        assert_eq!(base.resolve().unwrap().base_url(), "http://example.com:6000");

        let with_env = EndpointSources {
            backend_port: Some(7000),
            ..base
        };
        assert_eq!(
            with_env.resolve().unwrap().base_url(),
            "http://example.com:7000"
        );
    }

    #[test]
    fn test_override_keeps_path() {
        let endpoint = EndpointSources {
            server_url: Some("http://example.com/backend/".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.base_url(), "http://example.com:5000/backend");
    }

    #[test]
    fn test_override_wins_over_page_origin() {
        let endpoint = EndpointSources {
            server_url: Some("http://backend.internal".to_owned()),
            production: true,
            page_origin: Some("https://app.example.com".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.base_url(), "http://backend.internal:5000");
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let endpoint = EndpointSources {
            server_url: Some("   ".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.source(), EndpointSource::LocalDefault);
    }

    #[test]
    fn test_production_uses_page_origin() {
        let endpoint = EndpointSources {
            production: true,
            page_origin: Some("https://app.example.com".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.base_url(), "https://app.example.com");
        assert_eq!(endpoint.source(), EndpointSource::PageOrigin);
        assert!(!endpoint.is_insecure());
    }

    #[test]
    fn test_page_origin_ignored_outside_production() {
        let endpoint = EndpointSources {
            production: false,
            page_origin: Some("https://app.example.com".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.base_url(), "http://localhost:5000");
    }

    #[test]
    fn test_production_without_origin_falls_back_to_localhost() {
        let endpoint = EndpointSources {
            production: true,
            build_port: Some(5050),
            ..sources()
        }
        .resolve()
        .unwrap();

        assert_eq!(endpoint.base_url(), "http://localhost:5050");
        assert!(endpoint.is_insecure());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let input = EndpointSources {
            server_url: Some("http://example.com".to_owned()),
            backend_port: Some(5001),
            ..sources()
        };
        assert_eq!(input.resolve().unwrap(), input.resolve().unwrap());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = EndpointSources {
            server_url: Some("not a url".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServerUrl { .. }));

        let err = EndpointSources {
            server_url: Some("ftp://files.example.com".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServerUrl { .. }));
    }

    #[test]
    fn test_invalid_page_origin_rejected() {
        let err = EndpointSources {
            production: true,
            page_origin: Some("app.example.com".to_owned()),
            ..sources()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPageOrigin { .. }));
    }

    #[test]
    fn test_api_url_joins_prefix() {
        let endpoint = sources().resolve().unwrap();
        assert_eq!(endpoint.api_base(), "http://localhost:5000/api");
        assert_eq!(
            endpoint.api_url("/applications/7"),
            "http://localhost:5000/api/applications/7"
        );
        assert_eq!(endpoint.api_url("health"), "http://localhost:5000/api/health");
    }

    #[test]
    fn test_has_explicit_port() {
        assert!(has_explicit_port("http://example.com:8080"));
        assert!(has_explicit_port("http://user:pw@example.com:8080/x"));
        assert!(has_explicit_port("http://[::1]:8080"));
        assert!(!has_explicit_port("http://[::1]/api"));
        assert!(!has_explicit_port("http://user:pw@example.com/x"));
        assert!(!has_explicit_port("https://example.com/a:b"));
    }

    #[test]
    fn test_from_env_reads_prefixed_variables() {
        temp_env::with_vars(
            [
                ("GLASSDOC_SERVER_URL", Some("http://env.example.com")),
                ("GLASSDOC_BACKEND_PORT", Some("5100")),
                ("GLASSDOC_PRODUCTION", Some("true")),
                ("GLASSDOC_PAGE_ORIGIN", Some("https://app.example.com")),
            ],
            || {
                let sources = EndpointSources::from_env().unwrap();
                assert_eq!(sources.server_url.as_deref(), Some("http://env.example.com"));
                assert_eq!(sources.backend_port, Some(5100));
                assert!(sources.production);
                assert_eq!(
                    sources.resolve().unwrap().base_url(),
                    "http://env.example.com:5100"
                );
            },
        );
    }

    #[test]
    fn test_from_env_without_variables_uses_build_defaults() {
        temp_env::with_vars_unset(
            [
                "GLASSDOC_SERVER_URL",
                "GLASSDOC_BACKEND_PORT",
                "GLASSDOC_PRODUCTION",
                "GLASSDOC_PAGE_ORIGIN",
            ],
            || {
                let sources = EndpointSources::from_env().unwrap();
                assert_eq!(sources, EndpointSources::build_defaults());
            },
        );
    }

    #[test]
    fn test_build_port_parses_at_compile_time() {
        const PORT: u16 = parse_build_port(" 5050\n");
        assert_eq!(PORT, 5050);
        assert_eq!(parse_build_port("65535"), u16::MAX);
    }

    #[test]
    #[should_panic(expected = "GLASSDOC_BUILD_BACKEND_PORT must be a port number")]
    fn test_malformed_build_port_is_rejected() {
        parse_build_port("50x0");
    }

    #[test]
    #[should_panic(expected = "GLASSDOC_BUILD_BACKEND_PORT must be a port number")]
    fn test_out_of_range_build_port_is_rejected() {
        parse_build_port("70000");
    }

    #[test]
    fn test_from_env_rejects_bad_port() {
        temp_env::with_var("GLASSDOC_BACKEND_PORT", Some("not-a-port"), || {
            let err = EndpointSources::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::Load(_)));
        });
    }
}
