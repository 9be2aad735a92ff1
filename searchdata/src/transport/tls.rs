//! rustls client configuration for HTTPS connections to the engine
//!
//! Trust is the union of two anchors sets: the platform roots and, when
//! configured, an operator-supplied trust store. A server certificate is
//! accepted when either set validates its chain. Certificate names are not
//! matched against the host; instead a name mismatch on an otherwise valid
//! chain is accepted when the host we dialled is the configured engine host.
//!
//! Trust and key stores are either PEM bundles or password-protected PKCS#12
//! files. PEM is recognised by its armour; anything else is read as PKCS#12.

use super::password::resolve_password;
use crate::config::ElasticSearchConfig;
use crate::error::{Error, Result};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use p12_keystore::{KeyStore, KeyStoreEntry};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Build the client TLS configuration described by `config`.
pub fn build_client_config(config: &ElasticSearchConfig) -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut verifiers: Vec<Arc<dyn ServerCertVerifier>> = Vec::new();

    if let Some(ref path) = config.trust_store {
        let password = config
            .trust_store_password
            .as_deref()
            .map(resolve_password)
            .transpose()?;
        let roots = load_trust_store(path, password.as_deref())?;
        info!("Loaded {} trust anchors from {:?}", roots.len(), path);
        verifiers.push(webpki_verifier(roots, &provider)?);
    }

    let platform = load_platform_roots();
    if platform.is_empty() {
        warn!("No platform trust anchors available");
    } else {
        verifiers.push(webpki_verifier(platform, &provider)?);
    }

    if verifiers.is_empty() {
        return Err(Error::Tls(
            "no trust anchors: platform store is empty and no trust store is configured".into(),
        ));
    }

    let verifier = PeerHostVerifier::new(
        Arc::new(TrustChainVerifier::new(verifiers)),
        config.host.clone(),
    );

    let builder = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(format!("Failed to select protocol versions: {}", e)))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier));

    let tls = match config.key_store {
        Some(ref path) => {
            let password = config
                .key_store_password
                .as_deref()
                .map(resolve_password)
                .transpose()?;
            let (certs, key) = load_key_store(path, password.as_deref())?;
            info!("Presenting client certificate from {:?}", path);
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| Error::Tls(format!("Failed to use client certificate: {}", e)))?
        }
        None => builder.with_no_client_auth(),
    };

    Ok(tls)
}

fn webpki_verifier(
    roots: RootCertStore,
    provider: &Arc<CryptoProvider>,
) -> Result<Arc<dyn ServerCertVerifier>> {
    let verifier: Arc<dyn ServerCertVerifier> =
        WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider.clone())
            .build()
            .map_err(|e| Error::Tls(format!("Failed to build certificate verifier: {}", e)))?;
    Ok(verifier)
}

/// Load trust anchors from a PEM bundle or a PKCS#12 trust store.
pub fn load_trust_store(path: &Path, password: Option<&str>) -> Result<RootCertStore> {
    let data = fs::read(path)
        .map_err(|e| Error::Tls(format!("Failed to open trust store {:?}: {}", path, e)))?;

    let certs = if is_pem(&data) {
        rustls_pemfile::certs(&mut data.as_slice())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Tls(format!("Failed to parse trust store {:?}: {}", path, e)))?
    } else {
        open_pkcs12(&data, password, path)?
            .entries()
            .filter_map(|(_, entry)| match entry {
                KeyStoreEntry::Certificate(cert) => Some(CertificateDer::from(cert.as_der().to_vec())),
                KeyStoreEntry::PrivateKeyChain(_) => None,
            })
            .collect()
    };

    if certs.is_empty() {
        return Err(Error::Tls(format!("No certificates found in {:?}", path)));
    }

    let mut roots = RootCertStore::empty();
    for cert in certs {
        roots
            .add(cert)
            .map_err(|e| Error::Tls(format!("Failed to add trust anchor: {}", e)))?;
    }
    Ok(roots)
}

/// Load a client certificate chain and private key, from one PEM bundle or
/// the first key entry of a PKCS#12 key store.
pub fn load_key_store(
    path: &Path,
    password: Option<&str>,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let data = fs::read(path)
        .map_err(|e| Error::Tls(format!("Failed to open key store {:?}: {}", path, e)))?;

    if !is_pem(&data) {
        let store = open_pkcs12(&data, password, path)?;
        let (alias, chain) = store
            .private_key_chain()
            .ok_or_else(|| Error::Tls(format!("No private key entry in {:?}", path)))?;
        debug!("Using key entry '{}' from {:?}", alias, path);

        let certs: Vec<CertificateDer<'static>> = chain
            .chain()
            .iter()
            .map(|cert| CertificateDer::from(cert.as_der().to_vec()))
            .collect();
        if certs.is_empty() {
            return Err(Error::Tls(format!("Key entry '{}' has no certificate", alias)));
        }
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(chain.key().to_vec()));
        return Ok((certs, key));
    }

    if data.windows(21).any(|w| w == b"ENCRYPTED PRIVATE KEY") {
        return Err(Error::Tls(format!(
            "Key store {:?} holds an encrypted PEM key; use PKCS#12 for password-protected keys",
            path
        )));
    }

    let certs = rustls_pemfile::certs(&mut data.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("Failed to parse certificates: {}", e)))?;
    if certs.is_empty() {
        return Err(Error::Tls(format!("No certificates found in {:?}", path)));
    }

    let key = rustls_pemfile::private_key(&mut data.as_slice())
        .map_err(|e| Error::Tls(format!("Failed to parse private key: {}", e)))?
        .ok_or_else(|| Error::Tls(format!("No private key found in {:?}", path)))?;

    Ok((certs, key))
}

fn is_pem(data: &[u8]) -> bool {
    data.windows(11).any(|w| w == b"-----BEGIN ")
}

fn open_pkcs12(data: &[u8], password: Option<&str>, path: &Path) -> Result<KeyStore> {
    KeyStore::from_pkcs12(data, password.unwrap_or_default())
        .map_err(|e| Error::Tls(format!("Failed to open PKCS#12 store {:?}: {}", path, e)))
}

fn load_platform_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        warn!("Skipping unreadable platform certificate: {}", err);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!("Platform trust anchors: {} added, {} ignored", added, ignored);
    roots
}

fn is_name_mismatch(err: &rustls::Error) -> bool {
    matches!(
        err,
        rustls::Error::InvalidCertificate(
            CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
        )
    )
}

/// Case-insensitive comparison of the configured host and the name we dialled.
pub fn same_host(expected: &str, server_name: &ServerName<'_>) -> bool {
    match server_name {
        ServerName::DnsName(name) => name.as_ref().eq_ignore_ascii_case(expected),
        ServerName::IpAddress(ip) => expected
            .parse::<IpAddr>()
            .is_ok_and(|parsed| parsed == IpAddr::from(*ip)),
        _ => false,
    }
}

/// Accepts a chain when any of its verifiers does.
///
/// Verifiers are tried in order. When every one rejects, a name-mismatch
/// rejection is reported in preference to others, since it means some
/// anchor set did validate the chain.
#[derive(Debug)]
pub struct TrustChainVerifier {
    verifiers: Vec<Arc<dyn ServerCertVerifier>>,
}

impl TrustChainVerifier {
    pub fn new(verifiers: Vec<Arc<dyn ServerCertVerifier>>) -> Self {
        Self { verifiers }
    }

    fn primary(&self) -> std::result::Result<&Arc<dyn ServerCertVerifier>, rustls::Error> {
        self.verifiers
            .first()
            .ok_or_else(|| rustls::Error::General("no certificate verifiers configured".into()))
    }
}

impl ServerCertVerifier for TrustChainVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let mut mismatch = None;
        let mut last = None;

        for verifier in &self.verifiers {
            match verifier.verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now) {
                Ok(verified) => return Ok(verified),
                Err(e) if is_name_mismatch(&e) => mismatch = Some(e),
                Err(e) => {
                    debug!("certificate rejected by trust set: {}", e);
                    last = Some(e);
                }
            }
        }

        Err(mismatch
            .or(last)
            .unwrap_or_else(|| rustls::Error::General("no certificate verifiers configured".into())))
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.primary()?.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.primary()?.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.primary()
            .map(|v| v.supported_verify_schemes())
            .unwrap_or_default()
    }
}

/// Replaces certificate-name matching with a same-host check.
#[derive(Debug)]
pub struct PeerHostVerifier {
    inner: Arc<dyn ServerCertVerifier>,
    expected_host: String,
}

impl PeerHostVerifier {
    pub fn new(inner: Arc<dyn ServerCertVerifier>, expected_host: String) -> Self {
        Self {
            inner,
            expected_host,
        }
    }
}

impl ServerCertVerifier for PeerHostVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(e) if is_name_mismatch(&e) && same_host(&self.expected_host, server_name) => {
                debug!(
                    "certificate name does not match {}, accepting trusted chain for configured host",
                    self.expected_host
                );
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
