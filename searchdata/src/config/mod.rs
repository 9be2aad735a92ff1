//! Connection configuration for the backing engine
//!
//! Loaded once at startup, either from a TOML file or from the `es.*`
//! properties format, then shared read-only by the transport and the
//! document store.

mod properties;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ElasticSearchConfig {
    /// `http` or `https`
    #[serde(default = "default_scheme")]
    pub uri_scheme: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub http_port: u16,

    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// PEM bundle or PKCS#12 store of extra trust anchors, used in addition to platform roots
    #[serde(default)]
    pub trust_store: Option<PathBuf>,

    #[serde(default)]
    pub trust_store_password: Option<String>,

    /// PEM bundle or PKCS#12 store holding the client certificate chain and private key
    #[serde(default)]
    pub key_store: Option<PathBuf>,

    #[serde(default)]
    pub key_store_password: Option<String>,

    #[serde(default)]
    pub auth_user: Option<String>,

    #[serde(default)]
    pub auth_password: Option<String>,

    #[serde(default = "default_true")]
    pub authorization_enabled: bool,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Path prefix of document URLs handed back to callers
    #[serde(default = "default_document_url_prefix")]
    pub document_url_prefix: String,

    #[serde(default)]
    pub settings_file: Option<PathBuf>,

    #[serde(default)]
    pub analysis_file: Option<PathBuf>,

    #[serde(default)]
    pub filter_file: Option<PathBuf>,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9200
}

fn default_cluster_name() -> String {
    "elasticsearch".to_string()
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    5000
}

fn default_request_timeout() -> u64 {
    30000
}

fn default_document_url_prefix() -> String {
    "services/search-data-service/v1/search".to_string()
}

impl Default for ElasticSearchConfig {
    fn default() -> Self {
        Self {
            uri_scheme: default_scheme(),
            host: default_host(),
            http_port: default_port(),
            cluster_name: default_cluster_name(),
            trust_store: None,
            trust_store_password: None,
            key_store: None,
            key_store_password: None,
            auth_user: None,
            auth_password: None,
            authorization_enabled: default_true(),
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            document_url_prefix: default_document_url_prefix(),
            settings_file: None,
            analysis_file: None,
            filter_file: None,
        }
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Cannot determine home directory".into()))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".into()))
    } else {
        Ok(path.to_path_buf())
    }
}

impl ElasticSearchConfig {
    /// Load from a TOML file, or from a properties file when the extension
    /// is `.properties`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read config {:?}: {}", path, e)))?;
        let mut config = if path.extension().is_some_and(|ext| ext == "properties") {
            Self::from_properties(&content)?
        } else {
            toml::from_str(&content)?
        };
        config.expand_paths()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the `es.*` properties format.
    pub fn from_properties(text: &str) -> Result<Self> {
        properties::parse(text)
    }

    pub fn validate(&self) -> Result<()> {
        match self.uri_scheme.as_str() {
            "http" | "https" => {}
            other => {
                return Err(Error::Config(format!(
                    "unsupported uri scheme '{}', expected http or https",
                    other
                )))
            }
        }
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if self.http_port == 0 {
            return Err(Error::Config("http port must not be zero".into()));
        }
        Ok(())
    }

    fn expand_paths(&mut self) -> Result<()> {
        for path in [
            &mut self.trust_store,
            &mut self.key_store,
            &mut self.settings_file,
            &mut self.analysis_file,
            &mut self.filter_file,
        ] {
            if let Some(p) = path.take() {
                *path = Some(expand_tilde(&p)?);
            }
        }
        Ok(())
    }

    pub fn is_https(&self) -> bool {
        self.uri_scheme.eq_ignore_ascii_case("https")
    }

    /// Engine root, e.g. `https://es.internal:9200`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.uri_scheme, self.host, self.http_port)
    }

    /// Basic-auth credentials when either half is configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let user = self.auth_user.as_deref().unwrap_or_default();
        let password = self.auth_password.as_deref().unwrap_or_default();
        if user.is_empty() && password.is_empty() {
            None
        } else {
            Some((user, password))
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
