//! TLS client connections backed by rustls + ring.
//!
//! Enabled by the `tls-rustls` feature.

use std::net::TcpStream;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};
use sploit_types::error::{Result, SploitError};

/// Shared, reusable TLS client configuration (one per process).
pub struct RustlsConnector {
    config: Arc<ClientConfig>,
}

impl RustlsConnector {
    /// Build a connector that trusts Mozilla's root CA bundle.
    pub fn new() -> Self {
        let root_store =
            rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        Self {
            config: Arc::new(config),
        }
    }

    /// Wrap a connected TCP stream in a TLS session for `server_name`.
    ///
    /// The handshake runs lazily on the first read or write.
    pub fn connect(
        &self,
        stream: TcpStream,
        server_name: &str,
    ) -> Result<StreamOwned<ClientConnection, TcpStream>> {
        let sni = ServerName::try_from(server_name.to_owned())
            .map_err(|e| SploitError::Connectivity(format!("invalid server name: {e}")))?;

        let conn = ClientConnection::new(Arc::clone(&self.config), sni)
            .map_err(|e| SploitError::Connectivity(format!("TLS init: {e}")))?;

        Ok(StreamOwned::new(conn, stream))
    }
}

impl Default for RustlsConnector {
    fn default() -> Self {
        Self::new()
    }
}
