//! Layered CLI configuration.
//!
//! Precedence, lowest first: build defaults, YAML file (if given),
//! `GLASSDOC_*` environment variables, command-line flags.

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use glassdoc_sdk::{ENV_PREFIX, EndpointSources, Gateway};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment keys read by the CLI, after the prefix is stripped
const ENV_KEYS: [&str; 6] = [
    "server_url",
    "backend_port",
    "production",
    "page_origin",
    "timeout_secs",
    "upload_timeout_secs",
];

/// Gateway tuning read from the same layers as the endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub timeout_secs: Option<u64>,
    pub upload_timeout_secs: Option<u64>,
}

/// Values given on the command line; unset flags do not override lower layers
#[derive(Debug, Clone, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    pub endpoint: EndpointSources,
    pub timeouts: Timeouts,
}

impl CliConfig {
    pub fn load(path: Option<&Path>, overrides: &CliOverrides) -> Result<Self> {
        let mut figment =
            Figment::new().merge(Serialized::defaults(EndpointSources::build_defaults()));
        if let Some(path) = path {
            if !path.is_file() {
                bail!("config file does not exist: {}", path.display());
            }
            figment = figment.merge(Yaml::file(path));
        }
        let figment = figment
            .merge(Env::prefixed(ENV_PREFIX).only(&ENV_KEYS))
            .merge(Serialized::defaults(overrides));

        let endpoint = EndpointSources::from_figment(&figment)?;
        let timeouts = figment
            .extract()
            .context("invalid timeout configuration")?;
        Ok(Self { endpoint, timeouts })
    }

    pub fn gateway(&self) -> Result<Gateway> {
        let mut builder = Gateway::builder();
        if let Some(secs) = self.timeouts.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.timeouts.upload_timeout_secs {
            builder = builder.upload_timeout(Duration::from_secs(secs));
        }
        Ok(builder.build(&self.endpoint)?)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use glassdoc_sdk::EndpointSource;
    use std::io::Write;

    const VARS: [(&str, Option<&str>); 4] = [
        ("GLASSDOC_SERVER_URL", None),
        ("GLASSDOC_BACKEND_PORT", None),
        ("GLASSDOC_TIMEOUT_SECS", None),
        ("GLASSDOC_PRODUCTION", None),
    ];

    fn yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_resolve_to_localhost() {
        temp_env::with_vars(VARS, || {
            let config = CliConfig::load(None, &CliOverrides::default()).unwrap();
            let endpoint = config.endpoint.resolve().unwrap();
            assert_eq!(endpoint.source(), EndpointSource::LocalDefault);
            assert!(endpoint.base_url().starts_with("http://localhost:"));
            assert_eq!(config.timeouts, Timeouts::default());
        });
    }

    #[test]
    fn test_layers_override_in_order() {
        let file = yaml("server_url: http://yaml.example\nbackend_port: 7000\ntimeout_secs: 3\n");
        temp_env::with_vars(
            [
                ("GLASSDOC_SERVER_URL", None),
                ("GLASSDOC_BACKEND_PORT", Some("7100")),
                ("GLASSDOC_TIMEOUT_SECS", None),
                ("GLASSDOC_PRODUCTION", None),
            ],
            || {
                let config = CliConfig::load(Some(file.path()), &CliOverrides::default()).unwrap();
                assert_eq!(
                    config.endpoint.resolve().unwrap().base_url(),
                    "http://yaml.example:7100"
                );
                assert_eq!(config.timeouts.timeout_secs, Some(3));

                let flags = CliOverrides {
                    server_url: Some("http://flag.example:81".to_owned()),
                    backend_port: None,
                };
                let config = CliConfig::load(Some(file.path()), &flags).unwrap();
                assert_eq!(
                    config.endpoint.resolve().unwrap().base_url(),
                    "http://flag.example:81"
                );
            },
        );
    }

    #[test]
    fn test_missing_config_file_is_rejected() {
        let err = CliConfig::load(
            Some(Path::new("/nonexistent/glassdoc.yaml")),
            &CliOverrides::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_bad_port_in_env_fails_to_load() {
        temp_env::with_vars(
            [
                ("GLASSDOC_SERVER_URL", None),
                ("GLASSDOC_BACKEND_PORT", Some("not-a-port")),
                ("GLASSDOC_TIMEOUT_SECS", None),
                ("GLASSDOC_PRODUCTION", None),
            ],
            || {
                assert!(CliConfig::load(None, &CliOverrides::default()).is_err());
            },
        );
    }
}
