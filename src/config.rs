//! Application configuration module
//!
//! Provides configuration for the remote story API and local storage paths.

use crate::error::{CeritaError, Result};
use std::path::PathBuf;

/// Default remote story API base URL
pub const DEFAULT_API_BASE_URL: &str = "https://story-api.dicoding.dev/v1";

/// Core configuration shared by the API client, the store, and the cache layer
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote story API, without a trailing slash
    pub api_base_url: String,
    /// Bearer token for authenticated endpoints; absent routes writes to the
    /// guest endpoint
    pub auth_token: Option<String>,
    /// Directory holding the local database files
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: None,
            data_dir: default_data_dir(),
        }
    }
}

impl Config {
    /// Create a new ConfigBuilder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Build a full API URL from a path such as `/stories`
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            return Err(CeritaError::validation(
                "api_base_url",
                format!("not an http(s) URL: {}", self.api_base_url),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    api_base_url: Option<String>,
    auth_token: Option<String>,
    data_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Set the API base URL
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the bearer token
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the local data directory
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<Config> {
        let config = Config {
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            auth_token: self.auth_token,
            data_dir: self.data_dir.unwrap_or_else(default_data_dir),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Platform-specific data directory, falling back to the temp dir
fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("cerita");
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn test_api_url_join() {
        let config = Config::builder()
            .api_base_url("https://example.test/v1/")
            .build()
            .unwrap();
        assert_eq!(config.api_url("/stories"), "https://example.test/v1/stories");
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = Config::builder().api_base_url("ftp://example.test").build();
        assert!(matches!(result, Err(CeritaError::Validation { .. })));
    }

    #[test]
    fn test_builder_token() {
        let config = Config::builder().auth_token("tok-1").build().unwrap();
        assert_eq!(config.auth_token.as_deref(), Some("tok-1"));
    }
}
