//! Client configuration.
//!
//! ```toml
//! backend_url = "https://api.example.com/api.php"
//! enable_login_to_all_subdomains = true
//! hostname = "www.example.com"
//! ```

use std::path::Path;

use serde::Deserialize;

/// Settings fixed for the lifetime of a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimplestConfig {
    /// Full URL of the single API endpoint. Empty means "not configured".
    #[serde(alias = "backendUrl")]
    pub backend_url: String,

    /// Keep the login in a cookie on the root domain instead of in
    /// origin-scoped storage, so every subdomain shares one session.
    #[serde(alias = "enableLoginToAllSubdomains")]
    pub enable_login_to_all_subdomains: bool,

    /// Host the client is running on. Only used to scope the session cookie.
    pub hostname: String,
}

impl Default for SimplestConfig {
    fn default() -> Self {
        Self {
            backend_url: String::new(),
            enable_login_to_all_subdomains: false,
            hostname: "localhost".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl SimplestConfig {
    pub fn new(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim().to_string(),
            ..Self::default()
        }
    }

    pub fn with_login_to_all_subdomains(mut self, hostname: &str) -> Self {
        self.enable_login_to_all_subdomains = true;
        self.hostname = hostname.to_string();
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Directory the endpoint script lives in, e.g.
    /// `https://api.example.com/` for `https://api.example.com/api.php`.
    pub fn backend_home_url(&self) -> String {
        self.backend_url.replace("api.php", "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_storage_on_localhost() {
        let config = SimplestConfig::default();
        assert!(config.backend_url.is_empty());
        assert!(!config.enable_login_to_all_subdomains);
        assert_eq!(config.hostname, "localhost");
    }

    #[test]
    fn parses_toml_with_missing_fields() {
        let config = SimplestConfig::from_toml_str(r#"backend_url = "https://x.com/api.php""#).unwrap();
        assert_eq!(config.backend_url, "https://x.com/api.php");
        assert_eq!(config.hostname, "localhost");
    }

    #[test]
    fn accepts_camel_case_keys() {
        let config = SimplestConfig::from_toml_str(
            r#"
            backendUrl = "https://x.com/api.php"
            enableLoginToAllSubdomains = true
            hostname = "www.x.com"
            "#,
        )
        .unwrap();
        assert!(config.enable_login_to_all_subdomains);
        assert_eq!(config.hostname, "www.x.com");
    }

    #[test]
    fn rejects_wrong_types() {
        let err = SimplestConfig::from_toml_str("enable_login_to_all_subdomains = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simplest.toml");
        std::fs::write(&path, "backend_url = \"http://localhost/api.php\"\n").unwrap();
        let config = SimplestConfig::load(&path).unwrap();
        assert_eq!(config.backend_url, "http://localhost/api.php");
    }

    #[test]
    fn home_url_drops_script_name() {
        let config = SimplestConfig::new("https://x.com/sp/api.php");
        assert_eq!(config.backend_home_url(), "https://x.com/sp/");
    }

    #[test]
    fn subdomain_builder_sets_hostname() {
        let config = SimplestConfig::new("u").with_login_to_all_subdomains("www.abc.com");
        assert!(config.enable_login_to_all_subdomains);
        assert_eq!(config.hostname, "www.abc.com");
    }
}
