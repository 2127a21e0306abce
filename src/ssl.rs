//! TLS connection options.
//!
//! Only available with the `tls` feature. The handshake runs before the
//! first byte of the protocol Hello.

use rustls::{Certificate, ClientConfig, RootCertStore};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use crate::{Error, Result};

/// TLS configuration: certificate store, verification mode, and an optional
/// server-name override for SNI and certificate matching.
#[derive(Clone, Debug)]
pub struct TlsOptions {
    /// Extra CA certificate files (PEM).
    pub ca_cert_paths: Vec<PathBuf>,
    /// Trust the system certificate store.
    pub use_system_certs: bool,
    /// Skip certificate verification. Only for testing.
    pub skip_verification: bool,
    /// Server name used for SNI and verification when it differs from the
    /// connect host.
    pub server_name: Option<String>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            ca_cert_paths: Vec::new(),
            use_system_certs: true,
            skip_verification: false,
            server_name: None,
        }
    }
}

impl TlsOptions {
    /// New options trusting the system store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a CA certificate file.
    pub fn add_ca_cert(mut self, path: PathBuf) -> Self {
        self.ca_cert_paths.push(path);
        self
    }

    /// Enable or disable the system certificate store.
    pub fn use_system_certs(mut self, enabled: bool) -> Self {
        self.use_system_certs = enabled;
        self
    }

    /// Skip certificate verification. Only for testing.
    pub fn skip_verification(mut self, skip: bool) -> Self {
        self.skip_verification = skip;
        self
    }

    /// Override the server name used for SNI and verification.
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Build a rustls client configuration from these options.
    pub fn build_client_config(&self) -> Result<Arc<ClientConfig>> {
        if self.skip_verification {
            let config = ClientConfig::builder()
                .with_safe_defaults()
                .with_custom_certificate_verifier(Arc::new(NoVerification))
                .with_no_client_auth();
            return Ok(Arc::new(config));
        }

        let mut root_store = RootCertStore::empty();

        if self.use_system_certs {
            let certs = rustls_native_certs::load_native_certs().map_err(|e| {
                Error::Connection(format!("Failed to load system certs: {}", e))
            })?;
            for cert in certs {
                root_store.add(&Certificate(cert.0)).map_err(|e| {
                    Error::Connection(format!("Failed to add system cert: {}", e))
                })?;
            }
        }

        for ca_path in &self.ca_cert_paths {
            let file = File::open(ca_path).map_err(|e| {
                Error::Connection(format!("Failed to open CA cert {:?}: {}", ca_path, e))
            })?;
            let mut reader = BufReader::new(file);
            let certs = rustls_pemfile::certs(&mut reader).map_err(|e| {
                Error::Connection(format!("Failed to parse CA cert {:?}: {}", ca_path, e))
            })?;
            for cert in certs {
                root_store.add(&Certificate(cert)).map_err(|e| {
                    Error::Connection(format!("Failed to add CA cert {:?}: {}", ca_path, e))
                })?;
            }
        }

        let config = ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        Ok(Arc::new(config))
    }
}

/// Accepts any server certificate; used with `skip_verification`.
struct NoVerification;

impl rustls::client::ServerCertVerifier for NoVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &rustls::ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: std::time::SystemTime,
    ) -> std::result::Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = TlsOptions::default();
        assert!(options.use_system_certs);
        assert!(!options.skip_verification);
        assert!(options.server_name.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let options = TlsOptions::new()
            .use_system_certs(false)
            .skip_verification(true)
            .server_name("ch.internal");
        assert!(!options.use_system_certs);
        assert!(options.skip_verification);
        assert_eq!(options.server_name.as_deref(), Some("ch.internal"));
    }

    #[test]
    fn test_skip_verification_config_builds() {
        let options = TlsOptions::new().skip_verification(true);
        assert!(options.build_client_config().is_ok());
    }
}
