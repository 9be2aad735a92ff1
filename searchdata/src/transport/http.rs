use super::{tls, EngineRequest, EngineResponse, EngineTransport};
use crate::config::ElasticSearchConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use tracing::{debug, info};

/// `Basic base64(user:password)` header value.
pub fn basic_auth_value(user: &str, password: &str) -> Result<HeaderValue> {
    let encoded = STANDARD.encode(format!("{}:{}", user, password));
    let mut value = HeaderValue::from_str(&format!("Basic {}", encoded))
        .map_err(|e| Error::Config(format!("invalid basic auth credentials: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

/// HTTP(S) transport built once from the connection configuration.
///
/// The TLS setup and the authorization header are computed in
/// [`HttpTransport::new`] and never change afterwards; the underlying client
/// pools connections and is safe to share between concurrent requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth_header: Option<HeaderValue>,
}

impl HttpTransport {
    pub fn new(config: &ElasticSearchConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout());

        if config.is_https() {
            let tls = tls::build_client_config(config)?;
            builder = builder.use_preconfigured_tls(tls);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let auth_header = config
            .credentials()
            .map(|(user, password)| basic_auth_value(user, password))
            .transpose()?;

        info!(
            "Engine transport ready for {} (cluster {}, basic auth {})",
            config.base_url(),
            config.cluster_name,
            if auth_header.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            client,
            base_url: config.base_url(),
            auth_header,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn has_auth_header(&self) -> bool {
        self.auth_header.is_some()
    }
}

#[async_trait]
impl EngineTransport for HttpTransport {
    async fn send(&self, request: EngineRequest) -> Result<EngineResponse> {
        let url = format!("{}/{}", self.base_url, request.path.trim_start_matches('/'));
        debug!("{} {}", request.method, url);

        let mut builder = self.client.request(request.method, &url);
        if let Some(ref auth) = self.auth_header {
            builder = builder.header(AUTHORIZATION, auth.clone());
        }
        if let Some(body) = request.body {
            builder = builder.header(CONTENT_TYPE, request.content_type).body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("request to {} timed out", url))
            } else {
                Error::Transport(e)
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("{} -> {} ({} bytes)", url, status, body.len());

        Ok(EngineResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_value() {
        let value = basic_auth_value("admin", "secret").unwrap();
        assert_eq!(value.to_str().unwrap(), "Basic YWRtaW46c2VjcmV0");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_auth_header_when_either_half_set() {
        let mut config = ElasticSearchConfig {
            auth_password: Some("only-password".into()),
            ..Default::default()
        };
        assert!(HttpTransport::new(&config).unwrap().has_auth_header());

        config.auth_password = None;
        assert!(!HttpTransport::new(&config).unwrap().has_auth_header());

        config.auth_user = Some("user".into());
        assert!(HttpTransport::new(&config).unwrap().has_auth_header());
    }

    #[test]
    fn test_invalid_scheme_rejected() {
        let config = ElasticSearchConfig {
            uri_scheme: "ftp".into(),
            ..Default::default()
        };
        assert!(matches!(HttpTransport::new(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // port 1 on loopback is never listening in test environments
        let config = ElasticSearchConfig {
            http_port: 1,
            connect_timeout_ms: 500,
            request_timeout_ms: 1000,
            ..Default::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        let err = transport.send(EngineRequest::get("_cluster/health")).await.unwrap_err();
        assert!(err.result_code() >= 500);
    }
}
