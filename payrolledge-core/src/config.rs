// src/config.rs

use serde::Deserialize;
use std::path::PathBuf;
use url::Url;

use crate::error::PayrollError;
use crate::session::DEFAULT_TOKEN_FILE;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_DOWNLOAD_DIR: &str = "./downloads";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const ENV_PREFIX: &str = "PAYROLLEDGE_";

// Configuration for the PayrollEdge client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_token_file() -> PathBuf {
    PathBuf::from(DEFAULT_TOKEN_FILE)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DOWNLOAD_DIR)
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            token_file: default_token_file(),
            download_dir: default_download_dir(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Reads `PAYROLLEDGE_*` variables, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, PayrollError> {
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, PayrollError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config: ClientConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .map_err(|e| PayrollError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PayrollError> {
        let url = Url::parse(&self.api_base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(PayrollError::ConfigError(format!(
                "API base URL must be http or https, got '{}'",
                self.api_base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(PayrollError::ConfigError(
                "Request timeout must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = ClientConfig::from_vars(vars(&[("PATH", "/usr/bin")])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.token_file, PathBuf::from(DEFAULT_TOKEN_FILE));
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_prefixed_overrides() {
        let config = ClientConfig::from_vars(vars(&[
            ("PAYROLLEDGE_API_BASE_URL", "https://hr.example.com/api"),
            ("PAYROLLEDGE_DOWNLOAD_DIR", "/tmp/payroll"),
            ("PAYROLLEDGE_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://hr.example.com/api");
        assert_eq!(config.download_dir, PathBuf::from("/tmp/payroll"));
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_timeout = ClientConfig::from_vars(vars(&[(
            "PAYROLLEDGE_REQUEST_TIMEOUT_SECS",
            "soon",
        )]));
        assert!(matches!(bad_timeout, Err(PayrollError::ConfigError(_))));

        let bad_scheme =
            ClientConfig::from_vars(vars(&[("PAYROLLEDGE_API_BASE_URL", "ftp://hr.example.com")]));
        assert!(matches!(bad_scheme, Err(PayrollError::ConfigError(_))));

        let zero = ClientConfig::from_vars(vars(&[("PAYROLLEDGE_REQUEST_TIMEOUT_SECS", "0")]));
        assert!(matches!(zero, Err(PayrollError::ConfigError(_))));
    }
}
