//! `es.*` properties format
//!
//! One `key=value` (or `key: value`) pair per line; `#` and `!` start
//! comments. Unknown keys are ignored.

use super::ElasticSearchConfig;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

pub(super) fn parse(text: &str) -> Result<ElasticSearchConfig> {
    let mut config = ElasticSearchConfig::default();

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some(split) = line.find(['=', ':']) else {
            return Err(Error::Config(format!(
                "line {}: expected key=value, got '{}'",
                lineno + 1,
                line
            )));
        };
        let key = line[..split].trim();
        let value = line[split + 1..].trim();

        match key {
            "es.cluster-name" => config.cluster_name = value.to_string(),
            "es.ip-address" => config.host = value.to_string(),
            "es.http-port" => config.http_port = number(key, value)?,
            "es.uri-scheme" => {
                if !value.is_empty() {
                    config.uri_scheme = value.to_ascii_lowercase();
                }
            }
            "es.trust-store" => config.trust_store = path(value),
            "es.trust-store-password" => config.trust_store_password = text_value(value),
            "es.key-store" => config.key_store = path(value),
            "es.key-store-password" => config.key_store_password = text_value(value),
            "es.auth-user" => config.auth_user = text_value(value),
            "es.auth-password" => config.auth_password = text_value(value),
            "es.auth.authorization.enabled" => {
                config.authorization_enabled = !value.eq_ignore_ascii_case("false")
            }
            "es.connect-timeout-ms" => config.connect_timeout_ms = number(key, value)?,
            "es.request-timeout-ms" => config.request_timeout_ms = number(key, value)?,
            "es.document-url-prefix" => config.document_url_prefix = value.to_string(),
            "es.settings-file" => config.settings_file = path(value),
            "es.analysis-file" => config.analysis_file = path(value),
            "es.filter-file" => config.filter_file = path(value),
            other => debug!("ignoring unknown property '{}'", other),
        }
    }

    Ok(config)
}

fn number<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Config(format!("{}: invalid number '{}': {}", key, value, e)))
}

fn text_value(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn path(value: &str) -> Option<PathBuf> {
    text_value(value).map(PathBuf::from)
}
