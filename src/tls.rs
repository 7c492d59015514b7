//! TLS certificate loading.
//!
//! The relay terminates TLS itself when given a certificate directory laid
//! out the way certbot writes it: `fullchain.pem` next to `privkey.pem`.

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;

pub const CERT_FILE: &str = "fullchain.pem";
pub const KEY_FILE: &str = "privkey.pem";

/// Errors that can occur during TLS setup.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(String),

    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    #[error("rustls config error: {0}")]
    Config(String),
}

/// Certificate and key locations for one listener.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl TlsPaths {
    /// `<dir>/fullchain.pem` and `<dir>/privkey.pem`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self { cert: dir.join(CERT_FILE), key: dir.join(KEY_FILE) }
    }

    /// Reads both files and builds a server config offering TLS 1.2 and 1.3.
    pub fn server_config(&self) -> Result<Arc<rustls::ServerConfig>, TlsError> {
        let certs = load_certs(&self.cert)?;
        let key = load_private_key(&self.key)?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let mut config = rustls::ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| TlsError::Config(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| TlsError::Config(e.to_string()))?;
        config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

        Ok(Arc::new(config))
    }
}

/// Load a PEM certificate chain, in file order.
pub fn load_certs(path: impl AsRef<Path>) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let path = path.as_ref();
    let mut reader = open(path)?;

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| read_error(path, e))?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.display().to_string()));
    }
    Ok(certs)
}

/// Load the first PKCS#8, PKCS#1 or SEC1 private key in a PEM file.
pub fn load_private_key(path: impl AsRef<Path>) -> Result<PrivateKeyDer<'static>, TlsError> {
    let path = path.as_ref();
    let mut reader = open(path)?;

    for item in rustls_pemfile::read_all(&mut reader) {
        match item.map_err(|e| read_error(path, e))? {
            rustls_pemfile::Item::Pkcs1Key(key) => return Ok(PrivateKeyDer::Pkcs1(key)),
            rustls_pemfile::Item::Pkcs8Key(key) => return Ok(PrivateKeyDer::Pkcs8(key)),
            rustls_pemfile::Item::Sec1Key(key) => return Ok(PrivateKeyDer::Sec1(key)),
            _ => {}
        }
    }

    Err(TlsError::NoPrivateKey(path.display().to_string()))
}

fn open(path: &Path) -> Result<BufReader<fs::File>, TlsError> {
    fs::File::open(path)
        .map(BufReader::new)
        .map_err(|e| read_error(path, e))
}

fn read_error(path: &Path, source: std::io::Error) -> TlsError {
    TlsError::FileRead { path: path.display().to_string(), source }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // Not a real certificate: only the PEM framing matters to the loader.
    const CERT_PEM: &str = "-----BEGIN CERTIFICATE-----\nAAECAwQF\n-----END CERTIFICATE-----\n";

    #[test]
    fn paths_follow_certbot_layout() {
        let paths = TlsPaths::from_dir("/etc/letsencrypt/live/posters.example.com");
        assert_eq!(
            paths.cert,
            PathBuf::from("/etc/letsencrypt/live/posters.example.com/fullchain.pem")
        );
        assert_eq!(
            paths.key,
            PathBuf::from("/etc/letsencrypt/live/posters.example.com/privkey.pem")
        );
    }

    #[test]
    fn missing_directory_is_a_read_error() {
        let err = TlsPaths::from_dir("/nonexistent/tls").server_config().unwrap_err();
        assert!(matches!(err, TlsError::FileRead { .. }));
    }

    #[test]
    fn empty_cert_file_has_no_certificates() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_certs(file.path()).unwrap_err();
        assert!(matches!(err, TlsError::NoCertificates(_)));
    }

    #[test]
    fn cert_only_file_has_no_private_key() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CERT_PEM.as_bytes()).unwrap();

        assert_eq!(load_certs(file.path()).unwrap().len(), 1);
        let err = load_private_key(file.path()).unwrap_err();
        assert!(matches!(err, TlsError::NoPrivateKey(_)));
    }
}
