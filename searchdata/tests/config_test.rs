//! Tests for connection configuration loading

use searchdata::config::expand_tilde;
use searchdata::transport::password::{obfuscate, resolve_password};
use searchdata::{ElasticSearchConfig, Error};
use std::io::Write;
use std::path::PathBuf;
use tempfile::{tempdir, Builder};

#[test]
fn test_default_config() {
    let config = ElasticSearchConfig::default();

    assert_eq!(config.uri_scheme, "http");
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.http_port, 9200);
    assert_eq!(config.cluster_name, "elasticsearch");
    assert!(config.authorization_enabled);
    assert_eq!(config.connect_timeout_ms, 5000);
    assert_eq!(config.request_timeout_ms, 30000);
    assert_eq!(config.document_url_prefix, "services/search-data-service/v1/search");
    assert!(config.credentials().is_none());
    assert_eq!(config.base_url(), "http://127.0.0.1:9200");
}

#[test]
fn test_load_toml_with_partial_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("searchdata.toml");
    std::fs::write(
        &path,
        r#"
uri_scheme = "https"
host = "es.internal"
trust_store = "~/certs/ca.pem"
auth_user = "admin"
"#,
    )
    .unwrap();

    let config = ElasticSearchConfig::load(&path).unwrap();
    assert!(config.is_https());
    assert_eq!(config.host, "es.internal");
    assert_eq!(config.http_port, 9200);
    assert_eq!(config.credentials(), Some(("admin", "")));

    let home = dirs::home_dir().unwrap();
    assert_eq!(config.trust_store, Some(home.join("certs/ca.pem")));
}

#[test]
fn test_load_properties_file() {
    let mut file = Builder::new().suffix(".properties").tempfile().unwrap();
    writeln!(file, "es.cluster-name=ES_AAI").unwrap();
    writeln!(file, "es.ip-address=10.1.2.3").unwrap();
    writeln!(file, "es.http-port=9300").unwrap();
    writeln!(file, "es.auth.authorization.enabled=false").unwrap();

    let config = ElasticSearchConfig::load(file.path()).unwrap();
    assert_eq!(config.cluster_name, "ES_AAI");
    assert_eq!(config.base_url(), "http://10.1.2.3:9300");
    assert!(!config.authorization_enabled);
}

#[test]
fn test_load_rejects_unknown_scheme() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "uri_scheme = \"ftp\"\n").unwrap();

    let err = ElasticSearchConfig::load(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert_eq!(err.result_code(), 500);
}

#[test]
fn test_load_missing_file() {
    let err = ElasticSearchConfig::load(&PathBuf::from("/nonexistent/searchdata.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_expand_tilde() {
    let home = dirs::home_dir().unwrap();
    assert_eq!(expand_tilde(&PathBuf::from("~/x.pem")).unwrap(), home.join("x.pem"));
    assert_eq!(
        expand_tilde(&PathBuf::from("/etc/x.pem")).unwrap(),
        PathBuf::from("/etc/x.pem")
    );
}

#[test]
fn test_password_encodings() {
    assert_eq!(
        resolve_password("OBF:1v2j1uum1xtv1zej1zer1xtn1uvk1v1v").unwrap(),
        "password"
    );
    assert_eq!(resolve_password("plain-secret").unwrap(), "plain-secret");

    std::env::set_var("SEARCHDATA_TEST_STORE_PASSWORD", "from-env");
    assert_eq!(
        resolve_password("ENV:SEARCHDATA_TEST_STORE_PASSWORD").unwrap(),
        "from-env"
    );
    assert!(resolve_password("ENV:SEARCHDATA_TEST_UNSET_VARIABLE").is_err());

    let obfuscated = obfuscate("changeit");
    assert!(obfuscated.starts_with("OBF:"));
    assert_eq!(resolve_password(&obfuscated).unwrap(), "changeit");
}
